use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;

use crate::cache::CachePolicy;
use crate::transport::RetryConfig;
use crate::types::ChatProgress;

/// Called with every decoded text delta, in stream order.
pub type ProgressCallback = Box<dyn FnMut(ChatProgress<'_>) + Send>;

/// Per-call options for [`crate::client::ChatClient::complete`].
#[derive(Default)]
pub struct CompletionOptions {
    /// `Some(true)` always caches, `Some(false)` bypasses the cache entirely,
    /// `None` decides from the request.
    pub cache: Option<bool>,
    /// Selects a named cache. Keys are salted with the name, so namespaces
    /// never share entries even when they share a backend.
    pub cache_namespace: Option<String>,
    /// Overrides the client's eligibility ceilings for this call.
    pub cache_policy: Option<CachePolicy>,
    pub progress: Option<ProgressCallback>,
    pub retry: RetryConfig,
    /// Cancelling it aborts the call with [`crate::Error::Cancelled`].
    pub signal: Option<CancellationToken>,
    /// Merged over the default headers; these win on conflict.
    pub headers: HeaderMap,
}

impl CompletionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(mut self, force: bool) -> Self {
        self.cache = Some(force);
        self
    }

    pub fn cache_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.cache_namespace = Some(namespace.into());
        self
    }

    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = Some(policy);
        self
    }

    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: FnMut(ChatProgress<'_>) + Send + 'static,
    {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn signal(mut self, token: CancellationToken) -> Self {
        self.signal = Some(token);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

impl std::fmt::Debug for CompletionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionOptions")
            .field("cache", &self.cache)
            .field("cache_namespace", &self.cache_namespace)
            .field("cache_policy", &self.cache_policy)
            .field("progress", &self.progress.is_some())
            .field("retry", &self.retry)
            .field("signal", &self.signal)
            .field("headers", &self.headers)
            .finish()
    }
}
