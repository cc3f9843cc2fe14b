use std::fmt;

/// A parsed model identifier.
///
/// Identifiers are either a bare model name (`gpt-4o`) or prefixed with the
/// provider that serves it (`openai:gpt-4o`, `ollama:llama3:8b`). Only the
/// first `:` separates the provider; the rest belongs to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelId {
    pub provider: Option<String>,
    pub model: String,
}

impl ModelId {
    pub fn parse(id: &str) -> Self {
        match id.split_once(':') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => Self {
                provider: Some(provider.to_string()),
                model: model.to_string(),
            },
            _ => Self {
                provider: None,
                model: id.to_string(),
            },
        }
    }

    /// Azure deployment names cannot contain dots (`gpt-3.5-turbo` is deployed as `gpt-35-turbo`).
    pub fn azure_deployment(&self) -> String {
        self.model.replace('.', "")
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.provider {
            Some(p) => write!(f, "{}:{}", p, self.model),
            None => write!(f, "{}", self.model),
        }
    }
}
