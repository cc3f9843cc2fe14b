//! # ai-chat-stream
//!
//! Streaming chat-completion client for OpenAI-compatible and Azure OpenAI
//! endpoints, with a content-addressed response cache.
//!
//! ## Overview
//!
//! A single call goes through one sequential pipeline:
//!
//! ```text
//! cache check ──► request builder ──► transport (retry) ──► SSE decoder ──► cache update
//!      │                                                        │
//!      └──── hit: cached text, no network ──────────────────────┴──► CompletionResult
//! ```
//!
//! - **Streaming-first**: the response body is decoded incrementally; chunk
//!   boundaries (even inside a multi-byte character) never change the result.
//! - **Tool calls**: fragments streamed per index are merged into complete
//!   [`ToolCall`]s.
//! - **Caching**: deterministic requests (no seed, no tools, low temperature
//!   and `top_p`) are served from and written to a [`cache::ResponseCache`].
//! - **Cancellation**: a [`tokio_util::sync::CancellationToken`] aborts the call
//!   between chunks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_chat_stream::{ChatClient, ChatRequest, CompletionOptions, Message, ProviderConfig};
//!
//! #[tokio::main]
//! async fn main() -> ai_chat_stream::Result<()> {
//!     let client = ChatClient::builder().build()?;
//!     let provider = ProviderConfig::from_env()?;
//!     let request = ChatRequest::new("gpt-4o", vec![Message::user("hi")]).temperature(0.2);
//!
//!     let options = CompletionOptions::new().on_progress(|p| print!("{}", p.response_chunk));
//!     let result = client.complete(&request, &provider, options).await?;
//!     println!("\n{:?} cached={}", result.finish_reason, result.cached);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`ChatClient`], its builder and per-call options |
//! | [`types`] | Requests, messages, tools, results, progress |
//! | [`protocol`] | Provider configuration and per-flavor request shaping |
//! | [`cache`] | Eligibility, key derivation, cache backends |
//! | [`pipeline`] | Incremental UTF-8 / SSE decoding and stream accumulation |
//! | [`transport`] | HTTP transport with retry and backoff |
//! | [`tokens`] | Token estimation for progress reports |
//! | [`telemetry`] | Trace sinks for human-oriented diagnostics |

pub mod cache;
pub mod client;
pub mod pipeline;
pub mod protocol;
pub mod telemetry;
pub mod tokens;
pub mod transport;
pub mod types;
pub mod utils;

pub use client::{ChatClient, ChatClientBuilder, CompletionOptions};
pub use protocol::{ApiFlavor, ProviderConfig};
pub use types::{
    ChatProgress, ChatRequest, CompletionOutcome, CompletionResult, FinishReason, Message,
    MessageRole, ToolCall, ToolDefinition,
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A pinned, boxed stream of fallible items.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, RequestError};
