//! Cache eligibility and cache key generation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::protocol::ProviderConfig;
use crate::types::ChatRequest;
use crate::Result;

/// Sampling ceilings under which a request is considered deterministic
/// enough to cache. `None` removes that ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CachePolicy {
    pub max_cached_temperature: Option<f64>,
    pub max_cached_top_p: Option<f64>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_cached_temperature: Some(0.5),
            max_cached_top_p: Some(0.5),
        }
    }
}

impl CachePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// No sampling ceilings; only seed and tools still disable caching.
    pub fn unbounded() -> Self {
        Self {
            max_cached_temperature: None,
            max_cached_top_p: None,
        }
    }

    pub fn with_max_temperature(mut self, ceiling: Option<f64>) -> Self {
        self.max_cached_temperature = ceiling;
        self
    }

    pub fn with_max_top_p(mut self, ceiling: Option<f64>) -> Self {
        self.max_cached_top_p = ceiling;
        self
    }

    /// Whether `request` may be served from and written to the cache.
    ///
    /// `force` is the caller's override: `Some(true)` always caches,
    /// `Some(false)` never does, `None` applies the automatic rule.
    pub fn is_eligible(&self, request: &ChatRequest, force: Option<bool>) -> bool {
        match force {
            Some(true) => true,
            Some(false) => false,
            None => {
                request.seed.is_none()
                    && !request.has_tools()
                    && below(request.temperature, self.max_cached_temperature)
                    && below(request.top_p, self.max_cached_top_p)
            }
        }
    }
}

fn below(value: Option<f64>, ceiling: Option<f64>) -> bool {
    match (value, ceiling) {
        (None, _) | (_, None) => true,
        (Some(v), Some(max)) => v < max,
    }
}

/// A content-addressed cache key.
///
/// `hash` is the hex SHA-256 of the canonical request; the other fields are
/// carried for diagnostics only and do not take part in equality of entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub hash: String,
    pub model: Option<String>,
    pub namespace: Option<String>,
}

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            model: None,
            namespace: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The semantic part of a chat request: what answer it should produce.
///
/// Auth token and config source are not part of it.
#[derive(Debug, Serialize)]
struct ChatCacheKey<'a> {
    model: &'a str,
    messages: &'a Vec<crate::types::Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: &'a Vec<crate::types::ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'a crate::types::ResponseFormat>,
    api_type: &'a str,
    base: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
}

/// Derives [`CacheKey`]s for chat requests.
#[derive(Debug, Clone, Default)]
pub struct CacheKeyGenerator {
    salt: Option<String>,
}

impl CacheKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries generated with different salts never collide.
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    pub fn generate(&self, request: &ChatRequest, provider: &ProviderConfig) -> Result<CacheKey> {
        let canonical = self.canonical(request, provider)?;
        let hash = sha256_hex(canonical.as_bytes());
        let mut key = CacheKey::new(hash).with_model(&request.model);
        if let Some(salt) = &self.salt {
            key = key.with_namespace(salt);
        }
        Ok(key)
    }

    /// Canonical JSON (sorted object keys at every level) of the key material.
    pub fn canonical(&self, request: &ChatRequest, provider: &ProviderConfig) -> Result<String> {
        let material = ChatCacheKey {
            model: &request.model,
            messages: &request.messages,
            tools: &request.tools,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            seed: request.seed,
            response_format: request.response_format.as_ref(),
            api_type: &provider.api_type,
            base: provider.trimmed_base(),
            version: provider.version.as_deref(),
        };
        let mut parts: BTreeMap<&str, Value> = BTreeMap::new();
        // serde_json::Value objects are BTreeMap-backed, so keys come out sorted.
        parts.insert("request", serde_json::to_value(&material)?);
        if let Some(salt) = &self.salt {
            parts.insert("salt", Value::String(salt.clone()));
        }
        Ok(serde_json::to_string(&parts)?)
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
