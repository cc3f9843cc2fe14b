//! # Types Module
//!
//! Strongly-typed representations of what goes into and comes out of a chat
//! completion call.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`message`] | Chat messages with text or multi-part content |
//! | [`tool`] | Tool definitions and assembled tool calls |
//! | [`request`] | The caller's [`ChatRequest`] |
//! | [`model`] | Model identifier parsing |
//! | [`events`] | Streamed chunk payloads, progress reports and the final result |
//!
//! ## Example
//!
//! ```rust
//! use ai_chat_stream::types::{ChatRequest, Message};
//!
//! let req = ChatRequest::new(
//!     "gpt-4o",
//!     vec![Message::system("You are terse."), Message::user("hi")],
//! )
//! .temperature(0.2);
//! assert!(!req.has_tools());
//! ```

pub mod events;
pub mod message;
pub mod model;
pub mod request;
pub mod tool;

pub use events::{ChatProgress, CompletionOutcome, CompletionResult, FinishReason};
pub use message::{ContentPart, Message, MessageContent, MessageRole};
pub use model::ModelId;
pub use request::{ChatRequest, ResponseFormat};
pub use tool::{FunctionDefinition, ToolCall, ToolDefinition};
