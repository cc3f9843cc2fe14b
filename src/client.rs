//! The completion client.
//!
//! [`ChatClient::complete`] ties the pieces together: cache check, request
//! building, transport, stream decoding, cache update.

pub mod builder;
pub mod core;
pub mod types;

pub use builder::ChatClientBuilder;
pub use self::core::ChatClient;
pub use types::{CompletionOptions, ProgressCallback};
