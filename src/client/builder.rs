use crate::cache::{CacheManager, CachePolicy, ResponseCache};
use crate::client::core::ChatClient;
use crate::telemetry::{noop_trace, TraceSink};
use crate::tokens::{RegistryEstimator, TokenEstimator};
use crate::transport::{HttpTransport, Transport};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for [`ChatClient`].
///
/// Defaults: reqwest transport, in-memory LRU cache of 1000 entries, default
/// eligibility ceilings, registry token estimator, no-op trace.
pub struct ChatClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    cache: Option<Option<Arc<dyn ResponseCache>>>,
    namespaces: HashMap<String, Arc<dyn ResponseCache>>,
    cache_policy: CachePolicy,
    estimator: Arc<dyn TokenEstimator>,
    trace: Arc<dyn TraceSink>,
}

impl Default for ChatClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatClientBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            cache: None,
            namespaces: HashMap::new(),
            cache_policy: CachePolicy::default(),
            estimator: Arc::new(RegistryEstimator),
            trace: noop_trace(),
        }
    }

    /// Replace the HTTP transport (tests inject a scripted one here).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Default response cache.
    pub fn cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(Some(cache));
        self
    }

    /// No default cache; only registered namespaces are cached.
    pub fn without_cache(mut self) -> Self {
        self.cache = Some(None);
        self
    }

    /// Dedicated cache for calls that set this `cache_namespace`.
    pub fn namespace_cache(
        mut self,
        namespace: impl Into<String>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        self.namespaces.insert(namespace.into(), cache);
        self
    }

    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    pub fn token_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn trace(mut self, trace: Arc<dyn TraceSink>) -> Self {
        self.trace = trace;
        self
    }

    pub fn build(self) -> Result<ChatClient> {
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new()?),
        };
        let cache = match self.cache {
            Some(c) => c,
            None => Some(Arc::new(CacheManager::memory(1000)) as Arc<dyn ResponseCache>),
        };
        Ok(ChatClient {
            transport,
            cache,
            namespaces: self.namespaces,
            cache_policy: self.cache_policy,
            estimator: self.estimator,
            trace: self.trace,
        })
    }
}
