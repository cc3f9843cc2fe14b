//! HTTP transport with retry.
//!
//! The client only talks to the [`Transport`] trait; [`HttpTransport`] is the
//! reqwest-backed implementation. Tests substitute an in-process transport
//! that replays scripted chunks.

mod http;
mod retry;

pub use http::HttpTransport;
pub use retry::{parse_retry_after, RetryConfig, RETRY_ON_STATUS};

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::header::HeaderMap;

use crate::protocol::HttpRequest;
use crate::{BoxStream, Result};

/// Sends one request, retrying transient failures, and hands back the
/// response with its body still streaming.
///
/// Non-2xx statuses that are not retried (or still fail after the last retry)
/// are returned as a normal [`HttpResponse`]; classifying them is the
/// caller's job.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest, retry: &RetryConfig) -> Result<HttpResponse>;
}

pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: BoxStream<'static, Bytes>,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the body into a string (lossy UTF-8).
    pub async fn text(self) -> Result<String> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        let bytes: Vec<u8> = chunks.concat();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
