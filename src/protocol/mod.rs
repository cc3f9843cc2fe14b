//! # Protocol Module
//!
//! Provider configuration and the mapping from a [`crate::types::ChatRequest`]
//! to the HTTP request each API flavor expects.
//!
//! | Flavor | URL | Auth header | `model` in body |
//! |--------|-----|-------------|-----------------|
//! | `openai` / `localai` | `{base}/chat/completions` | `authorization: Bearer …` | yes |
//! | `azure` | `{base}/{deployment}/chat/completions?api-version=…` | `api-key: …` | no |

pub mod config;
pub mod request;

pub use config::{ApiFlavor, ProviderConfig};
pub use request::{
    build_http_request, chat_completions_url, HttpRequest, ProviderRequest,
    AZURE_OPENAI_API_VERSION, TOOL_USER_AGENT,
};
