use super::retry::{parse_retry_after, RetryConfig};
use super::{HttpResponse, Transport, TransportError};
use crate::protocol::HttpRequest;
use crate::{Error, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Proxy;
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

/// reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client with production defaults, overridable through
    /// `AI_HTTP_TIMEOUT_SECS`, `AI_HTTP_POOL_MAX_IDLE_PER_HOST`,
    /// `AI_HTTP_POOL_IDLE_TIMEOUT_SECS` and `AI_PROXY_URL`.
    pub fn new() -> Result<Self> {
        // Streams can run long; the timeout covers the whole response.
        let timeout_secs = env_parse::<u64>("AI_HTTP_TIMEOUT_SECS")
            .or_else(|| env_parse::<u64>("AI_TIMEOUT_SECS"))
            .unwrap_or(300);

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(env_parse::<usize>("AI_HTTP_POOL_MAX_IDLE_PER_HOST").unwrap_or(32))
            .pool_idle_timeout(Some(Duration::from_secs(
                env_parse::<u64>("AI_HTTP_POOL_IDLE_TIMEOUT_SECS").unwrap_or(90),
            )))
            .http2_adaptive_window(true)
            .http2_keep_alive_interval(Some(Duration::from_secs(30)))
            .http2_keep_alive_timeout(Duration::from_secs(10));

        if let Ok(proxy_url) = env::var("AI_PROXY_URL") {
            match Proxy::all(&proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => warn!(proxy = %proxy_url, error = %e, "ignoring invalid AI_PROXY_URL"),
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;
        Ok(Self { client })
    }

    /// Use a preconfigured reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send_once(&self, request: &HttpRequest) -> std::result::Result<reqwest::Response, reqwest::Error> {
        self.client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone())
            .body(request.body.clone())
            .send()
            .await
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse::<T>().ok())
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest, retry: &RetryConfig) -> Result<HttpResponse> {
        let mut attempt: u32 = 0;
        loop {
            match self.send_once(&request).await {
                Err(e) if is_transient(&e) && attempt < retry.retries => {
                    let delay = retry.delay_for(attempt, None);
                    warn!(
                        url = %request.url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(Error::Transport(TransportError::Http(e))),
                Ok(resp) => {
                    let status = resp.status();
                    if retry.should_retry_status(status.as_u16()) && attempt < retry.retries {
                        let delay = retry.delay_for(attempt, parse_retry_after(resp.headers()));
                        warn!(
                            url = %request.url,
                            http_status = status.as_u16(),
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            "retryable status, retrying"
                        );
                        drop(resp);
                        tokio::time::sleep(delay).await;
                    } else {
                        debug!(url = %request.url, http_status = status.as_u16(), attempt, "response");
                        let headers = resp.headers().clone();
                        let body = resp
                            .bytes_stream()
                            .map_err(|e| Error::Transport(TransportError::Http(e)));
                        return Ok(HttpResponse {
                            status: status.as_u16(),
                            status_text: status.canonical_reason().unwrap_or("").to_string(),
                            headers,
                            body: Box::pin(body),
                        });
                    }
                }
            }
            attempt += 1;
        }
    }
}
