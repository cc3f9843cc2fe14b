//! # Response Cache
//!
//! Content-addressed cache of final response text, consulted before a
//! completion call and updated after a successful one.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CachePolicy`] | Decides cache eligibility from sampling parameters, seed and tools |
//! | [`CacheKeyGenerator`] | Canonical, secret-free key material hashed with SHA-256 |
//! | [`ResponseCache`] | `get` / `set` / `fingerprint`, what the client consumes |
//! | [`CacheManager`] | `ResponseCache` over a pluggable backend, with stats |
//! | [`MemoryCache`] | In-memory LRU backend |
//! | [`FileCache`] | JSONL file backend, last write wins |
//! | [`NullCache`] | Stores nothing |
//!
//! ```rust
//! use ai_chat_stream::cache::{CacheKeyGenerator, CachePolicy};
//! use ai_chat_stream::protocol::ProviderConfig;
//! use ai_chat_stream::types::{ChatRequest, Message};
//!
//! let request = ChatRequest::new("gpt-4o", vec![Message::user("hi")]).temperature(0.2);
//! assert!(CachePolicy::default().is_eligible(&request, None));
//! assert!(!CachePolicy::default().is_eligible(&request.clone().seed(42), None));
//!
//! let provider = ProviderConfig::openai("https://api.openai.com/v1").with_token("sk-...");
//! let key = CacheKeyGenerator::new().generate(&request, &provider).unwrap();
//! assert_eq!(key.hash.len(), 64);
//! ```

mod backend;
mod key;
mod manager;

pub use backend::{CacheBackend, FileCache, MemoryCache, NullCache};
pub use key::{CacheKey, CacheKeyGenerator, CachePolicy};
pub use manager::{CacheConfig, CacheManager, CacheStats, ResponseCache};
