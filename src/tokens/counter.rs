//! Token estimator implementations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Estimates how many tokens `text` costs for a given model.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, model: &str, text: &str) -> usize;
}

/// Per-model token counter.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

#[derive(Debug, Clone)]
pub struct CharacterEstimator {
    chars_per_token: f64,
}

impl CharacterEstimator {
    pub fn new() -> Self {
        Self::with_ratio(4.0)
    }
    pub fn with_ratio(r: f64) -> Self {
        Self { chars_per_token: r }
    }
}

impl Default for CharacterEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounter for CharacterEstimator {
    fn count(&self, text: &str) -> usize {
        (text.chars().count() as f64 / self.chars_per_token).ceil() as usize
    }
}

impl TokenEstimator for CharacterEstimator {
    fn estimate(&self, _model: &str, text: &str) -> usize {
        self.count(text)
    }
}

static COUNTERS: once_cell::sync::Lazy<RwLock<HashMap<String, Arc<dyn TokenCounter>>>> =
    once_cell::sync::Lazy::new(|| RwLock::new(HashMap::new()));

static FALLBACK: once_cell::sync::Lazy<Arc<dyn TokenCounter>> =
    once_cell::sync::Lazy::new(|| Arc::new(CharacterEstimator::new()));

/// Counter registered for `model`, falling back to [`CharacterEstimator`].
///
/// Lookups never add entries; only [`register_token_counter`] does.
pub fn get_token_counter(model: &str) -> Arc<dyn TokenCounter> {
    COUNTERS
        .read()
        .ok()
        .and_then(|c| c.get(&model.to_lowercase()).cloned())
        .unwrap_or_else(|| FALLBACK.clone())
}

/// Register a counter for `model` (case-insensitive), replacing any previous one.
pub fn register_token_counter(model: &str, counter: Arc<dyn TokenCounter>) {
    if let Ok(mut c) = COUNTERS.write() {
        c.insert(model.to_lowercase(), counter);
    }
}

/// Estimator backed by the per-model registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryEstimator;

impl TokenEstimator for RegistryEstimator {
    fn estimate(&self, model: &str, text: &str) -> usize {
        get_token_counter(model).count(text)
    }
}

/// `estimateTokens(model, text)` using the registry.
pub fn estimate_tokens(model: &str, text: &str) -> usize {
    RegistryEstimator.estimate(model, text)
}
