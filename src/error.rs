use std::time::Duration;
use thiserror::Error;

/// Structured error context for configuration failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "provider.api_type")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected values, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "request_builder", "provider_config")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A non-2xx answer from the chat completions endpoint.
///
/// Everything the caller needs to decide between retrying and giving up:
/// the status line, the provider's `error` object when the body was JSON,
/// the raw body, and the server's `Retry-After` hint.
#[derive(Debug, Clone, Error)]
#[error("request failed: HTTP {status} {status_text}{}", format_provider_error(.provider_error))]
pub struct RequestError {
    pub status: u16,
    pub status_text: String,
    pub provider_error: Option<serde_json::Value>,
    pub body: Option<String>,
    pub retry_after: Option<Duration>,
}

impl RequestError {
    /// Statuses a caller can reasonably retry later.
    pub fn is_transient(&self) -> bool {
        matches!(self.status, 408 | 429 | 500 | 502 | 503 | 504)
    }
}

fn format_provider_error(err: &Option<serde_json::Value>) -> String {
    match err {
        Some(serde_json::Value::Object(map)) => match map.get("message").and_then(|m| m.as_str()) {
            Some(message) => format!(": {}", message),
            None => format!(": {}", serde_json::Value::Object(map.clone())),
        },
        Some(other) => format!(": {}", other),
        None => String::new(),
    }
}

/// Unified error type for the chat completion client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("invalid response: {partial}")]
    InvalidResponse { partial: String },

    #[error("request cancelled")]
    Cancelled,

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn cache(msg: impl Into<String>) -> Self {
        Error::Cache {
            message: msg.into(),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// The structured request failure, when this error is one.
    pub fn as_request_error(&self) -> Option<&RequestError> {
        match self {
            Error::Request(e) => Some(e),
            _ => None,
        }
    }
}
