use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{CacheKey, CacheKeyGenerator, CachePolicy, ResponseCache};
use crate::client::types::CompletionOptions;
use crate::error::RequestError;
use crate::pipeline::StreamState;
use crate::protocol::{build_http_request, ProviderConfig};
use crate::telemetry::TraceSink;
use crate::tokens::TokenEstimator;
use crate::transport::{parse_retry_after, HttpResponse, Transport};
use crate::types::{ChatProgress, ChatRequest, CompletionResult, FinishReason};
use crate::{Error, Result};

/// Streaming chat-completion client.
///
/// One client is shared by any number of concurrent calls; each call owns its
/// own stream state. The only thing calls share is the response cache.
pub struct ChatClient {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) cache: Option<Arc<dyn ResponseCache>>,
    pub(crate) namespaces: HashMap<String, Arc<dyn ResponseCache>>,
    pub(crate) cache_policy: CachePolicy,
    pub(crate) estimator: Arc<dyn TokenEstimator>,
    pub(crate) trace: Arc<dyn TraceSink>,
}

impl ChatClient {
    pub fn builder() -> crate::client::ChatClientBuilder {
        crate::client::ChatClientBuilder::new()
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    fn cache_for(&self, namespace: Option<&str>) -> Option<&Arc<dyn ResponseCache>> {
        namespace
            .and_then(|ns| self.namespaces.get(ns))
            .or(self.cache.as_ref())
    }

    /// Run one chat completion.
    ///
    /// Checks the response cache first; on a miss, sends the request, decodes
    /// the event stream while reporting progress, and writes a stopped
    /// response back to the cache when the request is eligible.
    pub async fn complete(
        &self,
        request: &ChatRequest,
        provider: &ProviderConfig,
        mut options: CompletionOptions,
    ) -> Result<CompletionResult> {
        // Unsupported flavors fail before the cache or the network is touched.
        provider.flavor()?;

        let call_id = Uuid::new_v4();
        let signal = options.signal.clone().unwrap_or_default();

        let policy = options.cache_policy.unwrap_or(self.cache_policy);
        let eligible = policy.is_eligible(request, options.cache);
        let cache = if eligible {
            self.cache_for(options.cache_namespace.as_deref())
        } else {
            None
        };
        self.trace.item_value("caching", if cache.is_some() { "true" } else { "false" });

        let key = match cache {
            Some(_) => {
                let mut gen = CacheKeyGenerator::new();
                if let Some(ns) = &options.cache_namespace {
                    gen = gen.with_salt(ns);
                }
                Some(gen.generate(request, provider)?)
            }
            None => None,
        };

        if let (Some(cache), Some(key)) = (cache, key.as_ref()) {
            if let Some(hit) = self.lookup(&**cache, key, request, &mut options).await {
                return Ok(hit);
            }
        }

        let http = build_http_request(request, provider, &options.headers)?;
        self.trace.item_value("url", &format!("[{}]({})", http.url, http.url));
        if let Some(format) = &request.response_format {
            self.trace
                .item_value("response_format", &serde_json::to_string(format)?);
        }
        if request.has_tools() {
            let names: Vec<&str> = request
                .tools
                .iter()
                .map(|t| t.function.name.as_str())
                .collect();
            self.trace.item_value("tools", &names.join(", "));
            self.trace.details_fenced(
                "schema",
                &serde_json::to_string_pretty(&request.tools)?,
                "json",
            );
        }
        // The whole outgoing body; headers stay out since they carry the token.
        let body = serde_json::from_slice::<serde_json::Value>(&http.body)
            .and_then(|v| serde_json::to_string_pretty(&v))
            .unwrap_or_else(|_| http.body_text().into_owned());
        self.trace.details_fenced("messages", &body, "json");

        info!(%call_id, model = %request.model, url = %http.url, "sending chat completion");
        if signal.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let response = tokio::select! {
            biased;
            _ = signal.cancelled() => {
                debug!(%call_id, "cancelled while sending");
                return Err(Error::Cancelled);
            }
            r = self.transport.send(http, &options.retry) => r?,
        };
        self.trace.item_value(
            "response",
            &format!("{} {}", response.status, response.status_text),
        );

        if !response.is_success() {
            let err = request_error(response).await;
            info!(%call_id, http_status = err.status, "chat completion request failed");
            self.trace.error(&format!("request error: {}", err));
            return Err(Error::Request(err));
        }

        let result = self
            .consume(response, request, &signal, &mut options, call_id)
            .await?;

        if result.finish_reason == Some(FinishReason::Stop) {
            if let (Some(cache), Some(key)) = (cache, key.as_ref()) {
                match cache.set(key, &result.text).await {
                    Ok(()) => debug!(%call_id, key = %key, "cached response"),
                    Err(e) => warn!(%call_id, error = %e, "failed to write response cache"),
                }
            }
        }
        Ok(result)
    }

    async fn lookup(
        &self,
        cache: &dyn ResponseCache,
        key: &CacheKey,
        request: &ChatRequest,
        options: &mut CompletionOptions,
    ) -> Option<CompletionResult> {
        let text = match cache.get(key).await {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "response cache read failed, treating as miss");
                return None;
            }
        };
        self.trace.item_value("cache hit", &cache.fingerprint(key));
        debug!(key = %key, "serving chat completion from cache");
        if let Some(progress) = options.progress.as_mut() {
            progress(ChatProgress {
                response_so_far: &text,
                tokens_so_far: self.estimator.estimate(&request.model, &text),
                response_chunk: &text,
            });
        }
        Some(CompletionResult {
            text,
            finish_reason: Some(FinishReason::Stop),
            tool_calls: Vec::new(),
            cached: true,
        })
    }

    async fn consume(
        &self,
        response: HttpResponse,
        request: &ChatRequest,
        signal: &CancellationToken,
        options: &mut CompletionOptions,
        call_id: Uuid,
    ) -> Result<CompletionResult> {
        let estimator = self.estimator.as_ref();
        let mut state = StreamState::new(request.model.clone());
        let mut body = response.body;

        loop {
            let next = tokio::select! {
                biased;
                _ = signal.cancelled() => {
                    debug!(%call_id, received = state.text().len(), "cancelled while streaming");
                    return Err(Error::Cancelled);
                }
                next = body.next() => next,
            };
            match next {
                None => break,
                Some(Err(e)) => return Err(e),
                Some(Ok(chunk)) => {
                    if let Some(p) = state.push_chunk(&chunk, estimator) {
                        if let Some(progress) = options.progress.as_mut() {
                            progress(p);
                        }
                    }
                }
            }
        }
        if let Some(p) = state.finish(estimator) {
            if let Some(progress) = options.progress.as_mut() {
                progress(p);
            }
        }

        if state.finish_reason() == Some(FinishReason::Length) {
            self.trace.error("response too long, increase max_tokens");
        }
        let tokens = state.token_estimate();
        match state.into_result() {
            Ok(result) => {
                info!(
                    %call_id,
                    finish_reason = ?result.finish_reason,
                    tokens,
                    tool_calls = result.tool_calls.len(),
                    "chat completion finished"
                );
                Ok(result)
            }
            Err(Error::InvalidResponse { partial }) => {
                self.trace.error("invalid response");
                self.trace.fence(&partial);
                warn!(%call_id, "stream ended without a finish reason");
                Err(Error::InvalidResponse { partial })
            }
            Err(e) => Err(e),
        }
    }
}

async fn request_error(response: HttpResponse) -> RequestError {
    let status = response.status;
    let status_text = response.status_text.clone();
    let retry_after = parse_retry_after(&response.headers);
    let body = response.text().await.ok().filter(|b| !b.is_empty());
    let provider_error = body
        .as_deref()
        .and_then(|b| serde_json::from_str::<serde_json::Value>(b).ok())
        .and_then(|v| v.get("error").cloned());
    RequestError {
        status,
        status_text,
        provider_error,
        body,
        retry_after,
    }
}
