//! Trace sinks: human-oriented diagnostics for a completion call.
//!
//! A trace is a side channel. The client writes key/value items, fenced
//! blocks and errors into it; nothing it returns is ever consumed by logic.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TraceSink`] | Trait for trace destinations |
//! | [`NoopTrace`] | Default sink (discards everything) |
//! | [`TracingTrace`] | Forwards to `tracing` events |
//! | [`MarkdownTrace`] | Accumulates a markdown document, useful in tests and reports |

use std::fmt::Write as _;
use std::sync::{Arc, RwLock};

pub trait TraceSink: Send + Sync {
    /// A single `name: value` item.
    fn item_value(&self, name: &str, value: &str);
    /// A titled, collapsible fenced block (e.g. the request body).
    fn details_fenced(&self, title: &str, body: &str, lang: &str);
    /// A bare fenced block.
    fn fence(&self, body: &str);
    fn error(&self, message: &str);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTrace;

impl TraceSink for NoopTrace {
    fn item_value(&self, _: &str, _: &str) {}
    fn details_fenced(&self, _: &str, _: &str, _: &str) {}
    fn fence(&self, _: &str) {}
    fn error(&self, _: &str) {}
}

pub fn noop_trace() -> Arc<dyn TraceSink> {
    Arc::new(NoopTrace)
}

/// Sink that emits `tracing` events under the `ai_chat_stream::trace` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTrace;

impl TraceSink for TracingTrace {
    fn item_value(&self, name: &str, value: &str) {
        tracing::info!(target: "ai_chat_stream::trace", item = name, value);
    }
    fn details_fenced(&self, title: &str, body: &str, lang: &str) {
        tracing::debug!(target: "ai_chat_stream::trace", title, lang, body);
    }
    fn fence(&self, body: &str) {
        tracing::debug!(target: "ai_chat_stream::trace", body);
    }
    fn error(&self, message: &str) {
        tracing::error!(target: "ai_chat_stream::trace", message);
    }
}

/// In-memory markdown trace.
#[derive(Debug, Default)]
pub struct MarkdownTrace {
    content: RwLock<String>,
}

impl MarkdownTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> String {
        self.content.read().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut c) = self.content.write() {
            c.clear();
        }
    }

    fn append(&self, f: impl FnOnce(&mut String)) {
        if let Ok(mut c) = self.content.write() {
            f(&mut c);
        }
    }
}

fn fence_for(body: &str) -> &'static str {
    if body.contains("```") {
        "`````"
    } else {
        "```"
    }
}

impl TraceSink for MarkdownTrace {
    fn item_value(&self, name: &str, value: &str) {
        self.append(|c| {
            let _ = writeln!(c, "-  {}: {}", name, value);
        });
    }

    fn details_fenced(&self, title: &str, body: &str, lang: &str) {
        let fence = fence_for(body);
        self.append(|c| {
            let _ = writeln!(
                c,
                "\n<details>\n<summary>{}</summary>\n\n{}{}\n{}\n{}\n\n</details>\n",
                title, fence, lang, body, fence
            );
        });
    }

    fn fence(&self, body: &str) {
        let fence = fence_for(body);
        self.append(|c| {
            let _ = writeln!(c, "\n{}\n{}\n{}\n", fence, body, fence);
        });
    }

    fn error(&self, message: &str) {
        self.append(|c| {
            let _ = writeln!(c, "\n> [!CAUTION]\n> {}\n", message);
        });
    }
}
