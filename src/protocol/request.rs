//! Request builder: shapes the outgoing HTTP request per API flavor.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::Serialize;

use super::config::{ApiFlavor, ProviderConfig};
use crate::types::{ChatRequest, Message, ModelId, ResponseFormat, ToolDefinition};
use crate::{Error, ErrorContext, Result};

/// Azure OpenAI REST API version used when the provider config does not set one.
pub const AZURE_OPENAI_API_VERSION: &str = "2023-09-01-preview";

/// User agent sent with every request.
pub const TOOL_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

fn is_empty_slice<T>(s: &&[T]) -> bool {
    s.is_empty()
}

/// Body fields shared by every flavor.
#[derive(Debug, Serialize)]
pub struct ChatBody<'a> {
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "is_empty_slice")]
    pub tools: &'a [ToolDefinition],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<&'a ResponseFormat>,
    pub stream: bool,
}

impl<'a> ChatBody<'a> {
    fn from_request(req: &'a ChatRequest) -> Self {
        Self {
            messages: &req.messages,
            tools: &req.tools,
            temperature: req.temperature,
            top_p: req.top_p,
            seed: req.seed,
            max_tokens: req.max_tokens,
            response_format: req.response_format.as_ref(),
            stream: true,
        }
    }
}

/// OpenAI and LocalAI: the model travels in the body.
#[derive(Debug, Serialize)]
pub struct OpenAiCompatibleRequest<'a> {
    pub model: &'a str,
    #[serde(flatten)]
    pub body: ChatBody<'a>,
}

/// Azure: the deployment is part of the URL path, so the body has no model.
#[derive(Debug, Serialize)]
pub struct AzureRequest<'a> {
    #[serde(flatten)]
    pub body: ChatBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ProviderRequest<'a> {
    OpenAiCompatible(OpenAiCompatibleRequest<'a>),
    Azure(AzureRequest<'a>),
}

/// A fully shaped HTTP request, ready for a [`crate::transport::Transport`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpRequest {
    /// Body as text, for tracing.
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

fn config_error(message: impl Into<String>, field: &str) -> Error {
    Error::configuration_with_context(
        message,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("request_builder"),
    )
}

/// Endpoint URL for `model` under `cfg`.
pub fn chat_completions_url(cfg: &ProviderConfig, model: &ModelId) -> Result<String> {
    let base = cfg.trimmed_base();
    let url = match cfg.flavor()? {
        ApiFlavor::OpenAi | ApiFlavor::LocalAi => format!("{}/chat/completions", base),
        ApiFlavor::Azure => format!(
            "{}/{}/chat/completions?api-version={}",
            base,
            model.azure_deployment(),
            cfg.version.as_deref().unwrap_or(AZURE_OPENAI_API_VERSION)
        ),
    };
    url::Url::parse(&url)
        .map_err(|e| config_error(format!("invalid base url {}: {}", cfg.base, e), "provider.base"))?;
    Ok(url)
}

/// Serialize the flavor-specific body for `req`.
pub fn provider_request<'a>(
    req: &'a ChatRequest,
    model: &'a ModelId,
    flavor: ApiFlavor,
) -> ProviderRequest<'a> {
    let body = ChatBody::from_request(req);
    match flavor {
        ApiFlavor::OpenAi | ApiFlavor::LocalAi => {
            ProviderRequest::OpenAiCompatible(OpenAiCompatibleRequest {
                model: &model.model,
                body,
            })
        }
        ApiFlavor::Azure => ProviderRequest::Azure(AzureRequest { body }),
    }
}

fn default_headers(cfg: &ProviderConfig, flavor: ApiFlavor) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(token) = cfg.token.as_deref().filter(|t| !t.is_empty()) {
        let (name, raw) = match flavor {
            ApiFlavor::OpenAi | ApiFlavor::LocalAi => (AUTHORIZATION, format!("Bearer {}", token)),
            ApiFlavor::Azure => (HeaderName::from_static("api-key"), token.to_string()),
        };
        let mut value = HeaderValue::from_str(&raw)
            .map_err(|_| config_error("token contains invalid header characters", "provider.token"))?;
        value.set_sensitive(true);
        headers.insert(name, value);
    }
    headers.insert(USER_AGENT, HeaderValue::from_static(TOOL_USER_AGENT));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Shape the streaming POST for `req`. Headers in `extra` are merged last and win on conflict.
pub fn build_http_request(
    req: &ChatRequest,
    cfg: &ProviderConfig,
    extra: &HeaderMap,
) -> Result<HttpRequest> {
    let flavor = cfg.flavor()?;
    let model = ModelId::parse(&req.model);
    let url = chat_completions_url(cfg, &model)?;

    let mut headers = default_headers(cfg, flavor)?;
    for name in extra.keys() {
        headers.remove(name);
    }
    for (name, value) in extra.iter() {
        headers.append(name.clone(), value.clone());
    }

    let body = serde_json::to_vec(&provider_request(req, &model, flavor))?;

    Ok(HttpRequest {
        method: Method::POST,
        url,
        headers,
        body: Bytes::from(body),
    })
}
