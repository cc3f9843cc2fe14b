//! # Stream Decoding Pipeline
//!
//! Turns the raw response body of a streaming chat completion into text,
//! tool calls and a finish reason:
//!
//! ```text
//! bytes ──► Utf8Decoder ──► SseLineBuffer ──► data: payloads ──► StreamState
//! ```
//!
//! [`StreamState`] is a plain owned struct. The client drives it chunk by
//! chunk, and tests can feed it chunks directly.

pub mod accumulate;
pub mod decode;


pub use accumulate::StreamState;
pub use decode::{data_payload, SseLineBuffer, Utf8Decoder};
