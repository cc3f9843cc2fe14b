use crate::pipeline::decode::{SseLineBuffer, Utf8Decoder};
use crate::tokens::TokenEstimator;
use crate::types::events::{ChatCompletionChunk, ChunkChoice};
use crate::types::{ChatProgress, CompletionResult, FinishReason};
use crate::utils::ToolCallAssembler;
use crate::{Error, Result};

const DONE_SIGNAL: &str = "[DONE]";

/// Per-call accumulation state for a chat completions stream.
///
/// Owned by one call for its whole duration. Feed it raw body chunks with
/// [`StreamState::push_chunk`], call [`StreamState::finish`] once the
/// transport reports end of stream, then turn it into a result with
/// [`StreamState::into_result`].
#[derive(Debug)]
pub struct StreamState {
    model: String,
    utf8: Utf8Decoder,
    lines: SseLineBuffer,
    text: String,
    tool_calls: ToolCallAssembler,
    finish_reason: Option<FinishReason>,
    terminated: bool,
    tokens: usize,
}

impl StreamState {
    /// `model` is what the token estimator is asked about.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            utf8: Utf8Decoder::new(),
            lines: SseLineBuffer::new(),
            text: String::new(),
            tool_calls: ToolCallAssembler::new(),
            finish_reason: None,
            terminated: false,
            tokens: 0,
        }
    }

    /// Decode one body chunk. Returns a progress report when text was appended.
    pub fn push_chunk(
        &mut self,
        chunk: &[u8],
        estimator: &dyn TokenEstimator,
    ) -> Option<ChatProgress<'_>> {
        let before = self.text.len();
        let decoded = self.utf8.decode(chunk);
        for payload in self.lines.push(&decoded) {
            self.apply_payload(&payload, estimator);
        }
        self.progress_since(before)
    }

    /// Flush whatever is still buffered at end of stream.
    pub fn finish(&mut self, estimator: &dyn TokenEstimator) -> Option<ChatProgress<'_>> {
        let before = self.text.len();
        let tail = self.utf8.finish();
        for payload in self.lines.push(&tail) {
            self.apply_payload(&payload, estimator);
        }
        // An unusable final line stays buffered for the error report.
        if let Some(last) = self.lines.finish() {
            if self.apply(&last, estimator) {
                self.lines.clear();
            }
        }
        self.progress_since(before)
    }

    fn progress_since(&self, before: usize) -> Option<ChatProgress<'_>> {
        if self.text.len() == before {
            return None;
        }
        Some(ChatProgress {
            response_so_far: &self.text,
            tokens_so_far: self.tokens,
            response_chunk: &self.text[before..],
        })
    }

    /// Apply one `data:` payload.
    ///
    /// Malformed or unexpected payloads are logged and discarded; they never
    /// fail the stream.
    pub fn apply_payload(&mut self, payload: &str, estimator: &dyn TokenEstimator) {
        self.apply(payload, estimator);
    }

    /// Returns false when the payload was discarded.
    fn apply(&mut self, payload: &str, estimator: &dyn TokenEstimator) -> bool {
        if payload == DONE_SIGNAL {
            self.terminated = true;
            return true;
        }
        if self.terminated {
            tracing::warn!(payload, "tokens after done");
            return false;
        }

        let chunk: ChatCompletionChunk = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(error = %e, payload, "invalid json in chat response");
                return false;
            }
        };
        match chunk.choices.len() {
            0 => true,
            1 => {
                self.apply_choice(&chunk.choices[0], estimator);
                true
            }
            n => {
                tracing::warn!(choices = n, payload, "expected a single choice, discarding payload");
                false
            }
        }
    }

    fn apply_choice(&mut self, choice: &ChunkChoice, estimator: &dyn TokenEstimator) {
        if let Some(delta) = &choice.delta {
            if let Some(content) = &delta.content {
                self.tokens += estimator.estimate(&self.model, content);
                self.text.push_str(content);
            } else if let Some(calls) = &delta.tool_calls {
                for call in calls {
                    self.tool_calls.on_delta(call);
                }
            }
        }

        let Some(raw) = choice.finish_reason.as_deref() else {
            return;
        };
        match raw.parse::<FinishReason>() {
            Ok(FinishReason::ToolCalls) => {
                self.finish_reason = Some(FinishReason::ToolCalls);
                self.terminated = true;
            }
            Ok(FinishReason::Length) => {
                self.finish_reason = Some(FinishReason::Length);
                tracing::warn!(model = %self.model, "response too long, output may be truncated");
            }
            Ok(FinishReason::Stop) => {
                self.finish_reason = Some(FinishReason::Stop);
                self.terminated = true;
            }
            Err(other) => {
                let dump = serde_yaml::to_string(choice).unwrap_or_default();
                tracing::debug!(finish_reason = %other, choice = %dump, "unrecognized finish reason");
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn token_estimate(&self) -> usize {
        self.tokens
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Buffered text that has not formed a complete line yet.
    pub fn pending(&self) -> &str {
        self.lines.pending()
    }

    /// Terminal mapping.
    ///
    /// - `stop`, `tool_calls` or `[DONE]` seen: a result
    /// - `length` seen: a (truncated) result, even without `[DONE]`
    /// - otherwise: [`Error::InvalidResponse`] carrying the buffered text that
    ///   never made it into the result
    pub fn into_result(self) -> Result<CompletionResult> {
        if !self.terminated && self.finish_reason != Some(FinishReason::Length) {
            return Err(Error::InvalidResponse {
                partial: self.lines.pending().to_string(),
            });
        }
        Ok(CompletionResult {
            text: self.text,
            finish_reason: self.finish_reason,
            tool_calls: self.tool_calls.finalize(),
            cached: false,
        })
    }
}
