//! In-process transport that replays scripted responses.

use ai_chat_stream::protocol::HttpRequest;
use ai_chat_stream::telemetry::MarkdownTrace;
use ai_chat_stream::transport::{HttpResponse, RetryConfig, Transport, TransportError};
use ai_chat_stream::{ChatClient, Error, ProviderConfig, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub struct Scripted {
    status: u16,
    headers: HeaderMap,
    chunks: Vec<Bytes>,
    hang: bool,
}

impl Scripted {
    /// 200 with `chunks` as the event stream body.
    pub fn stream(chunks: &[&str]) -> Self {
        Self {
            status: 200,
            headers: HeaderMap::new(),
            chunks: chunks.iter().map(|c| Bytes::from(c.to_string())).collect(),
            hang: false,
        }
    }

    /// 200 with raw byte chunks.
    pub fn bytes(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: HeaderMap::new(),
            chunks: chunks.into_iter().map(Bytes::from).collect(),
            hang: false,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            chunks: vec![Bytes::from(body.to_string())],
            hang: false,
        }
    }

    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    /// Never finish the body after the scripted chunks.
    pub fn then_hang(mut self) -> Self {
        self.hang = true;
        self
    }
}

#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest, _retry: &RetryConfig) -> Result<HttpResponse> {
        self.sent.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        let Some(s) = next else {
            return Err(Error::Transport(TransportError::Other(
                "no scripted response left".into(),
            )));
        };
        let chunks = futures::stream::iter(s.chunks.into_iter().map(Ok::<Bytes, Error>));
        let body = if s.hang {
            chunks.chain(futures::stream::pending()).boxed()
        } else {
            chunks.boxed()
        };
        let status_text = reqwest::StatusCode::from_u16(s.status)
            .ok()
            .and_then(|c| c.canonical_reason())
            .unwrap_or("")
            .to_string();
        Ok(HttpResponse {
            status: s.status,
            status_text,
            headers: s.headers,
            body,
        })
    }
}

pub const TOKEN: &str = "sk-test-secret-token";

pub fn openai() -> ProviderConfig {
    ProviderConfig::openai("https://api.openai.com/v1").with_token(TOKEN)
}

/// Client over `transport` with an in-memory cache and a markdown trace.
pub fn client(transport: Arc<ScriptedTransport>) -> (ChatClient, Arc<MarkdownTrace>) {
    crate::init_tracing();
    let trace = Arc::new(MarkdownTrace::new());
    let client = ChatClient::builder()
        .transport(transport)
        .trace(trace.clone())
        .build()
        .unwrap();
    (client, trace)
}

pub const HELLO_CHUNKS: [&str; 2] = [
    "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}\ndata: [DONE]\n",
];

pub fn hello() -> Scripted {
    Scripted::stream(&HELLO_CHUNKS)
}
