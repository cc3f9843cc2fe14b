//! # Token Estimation Module
//!
//! Running token estimates for streamed output. Estimates are approximate;
//! they feed progress reports, never billing.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TokenEstimator`] | `estimate(model, text)`; what the client consumes |
//! | [`TokenCounter`] | Per-model counter stored in the registry |
//! | [`CharacterEstimator`] | Fast character-based approximation (4 chars ≈ 1 token) |
//! | [`RegistryEstimator`] | Looks up the counter registered for the model |
//!
//! ```rust
//! use ai_chat_stream::tokens::{estimate_tokens, TokenEstimator, CharacterEstimator};
//!
//! assert_eq!(CharacterEstimator::new().estimate("gpt-4o", "Hello!"), 2);
//! assert!(estimate_tokens("gpt-4o", "Hello, how are you?") > 0);
//! ```

mod counter;

pub use counter::{
    estimate_tokens, get_token_counter, register_token_counter, CharacterEstimator,
    RegistryEstimator, TokenCounter, TokenEstimator,
};
