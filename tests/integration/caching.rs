//! Response cache behavior of `ChatClient::complete`.

use crate::scripted::{client, hello, openai, Scripted, ScriptedTransport, TOKEN};
use ai_chat_stream::cache::{
    CacheConfig, CacheKey, CacheKeyGenerator, CacheManager, CachePolicy, FileCache, ResponseCache,
};
use ai_chat_stream::types::{ChatRequest, CompletionOutcome, FinishReason, Message, ToolDefinition};
use ai_chat_stream::{ChatClient, CompletionOptions, Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

fn hi() -> ChatRequest {
    ChatRequest::new("gpt-4o", vec![Message::user("hi")]).temperature(0.2)
}

#[tokio::test]
async fn test_end_to_end_cache_round_trip() {
    let transport = ScriptedTransport::new(vec![hello()]);
    let (client, trace) = client(transport.clone());

    let first = client
        .complete(&hi(), &openai(), CompletionOptions::new())
        .await
        .unwrap();
    assert_eq!(first.text, "Hello");
    assert_eq!(first.finish_reason, Some(FinishReason::Stop));
    assert!(!first.cached);

    let progress = Arc::new(Mutex::new(Vec::new()));
    let sink = progress.clone();
    let options = CompletionOptions::new().on_progress(move |p| {
        sink.lock()
            .unwrap()
            .push((p.response_chunk.to_string(), p.response_so_far.to_string()));
    });
    let second = client.complete(&hi(), &openai(), options).await.unwrap();
    assert_eq!(second.text, "Hello");
    assert!(second.cached);
    assert_eq!(second.outcome(), CompletionOutcome::CacheHit);
    assert_eq!(transport.send_count(), 1);
    assert_eq!(
        *progress.lock().unwrap(),
        vec![("Hello".to_string(), "Hello".to_string())]
    );

    let key = CacheKeyGenerator::new().generate(&hi(), &openai()).unwrap();
    assert!(trace.content().contains(&format!("cache hit: {}", key.hash)));
}

#[tokio::test]
async fn test_ineligible_requests_are_never_cached() {
    let tool = ToolDefinition::function("lookup", None, None);
    let cases = vec![
        hi().seed(42),
        hi().tools(vec![tool]),
        hi().temperature(0.9),
        hi().top_p(0.95),
    ];
    for req in cases {
        let transport = ScriptedTransport::new(vec![hello(), hello()]);
        let (client, trace) = client(transport.clone());
        for _ in 0..2 {
            let result = client
                .complete(&req, &openai(), CompletionOptions::new())
                .await
                .unwrap();
            assert!(!result.cached);
        }
        assert_eq!(transport.send_count(), 2, "request {:?}", req);
        assert!(trace.content().contains("caching: false"));
    }
}

#[tokio::test]
async fn test_override_true_caches_seeded_request() {
    let transport = ScriptedTransport::new(vec![hello()]);
    let (client, _) = client(transport.clone());
    let req = hi().seed(7).temperature(1.0);
    for _ in 0..2 {
        client
            .complete(&req, &openai(), CompletionOptions::new().cache(true))
            .await
            .unwrap();
    }
    assert_eq!(transport.send_count(), 1);
}

#[tokio::test]
async fn test_override_true_caches_tool_bearing_request() {
    let transport = ScriptedTransport::new(vec![hello()]);
    let (client, _) = client(transport.clone());
    let tool = ToolDefinition::function("lookup", None, None);
    let req = hi().tools(vec![tool]);

    let first = client
        .complete(&req, &openai(), CompletionOptions::new().cache(true))
        .await
        .unwrap();
    assert_eq!(first.finish_reason, Some(FinishReason::Stop));
    assert!(!first.cached);

    let second = client
        .complete(&req, &openai(), CompletionOptions::new().cache(true))
        .await
        .unwrap();
    assert!(second.cached);
    assert_eq!(second.text, "Hello");
    assert_eq!(transport.send_count(), 1);
}

#[tokio::test]
async fn test_override_false_never_reads_or_writes() {
    let cache = Arc::new(CacheManager::memory(16));
    let transport = ScriptedTransport::new(vec![hello(), hello(), hello()]);
    let client = ChatClient::builder()
        .transport(transport.clone())
        .cache(cache.clone())
        .build()
        .unwrap();

    client
        .complete(&hi(), &openai(), CompletionOptions::new().cache(false))
        .await
        .unwrap();
    assert_eq!(cache.stats().sets, 0);

    client
        .complete(&hi(), &openai(), CompletionOptions::new())
        .await
        .unwrap();
    assert_eq!(cache.stats().sets, 1);

    let bypass = client
        .complete(&hi(), &openai(), CompletionOptions::new().cache(false))
        .await
        .unwrap();
    assert!(!bypass.cached);
    assert_eq!(transport.send_count(), 3);
    assert_eq!(cache.stats().hits, 0);
}

#[tokio::test]
async fn test_tool_call_results_are_not_cached_even_when_forced() {
    let tool_stream = [
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"c\",\"function\":{\"name\":\"f\",\"arguments\":\"{}\"}}]},\"finish_reason\":\"tool_calls\"}]}\n",
    ];
    let transport = ScriptedTransport::new(vec![
        Scripted::stream(&tool_stream),
        Scripted::stream(&tool_stream),
    ]);
    let (client, _) = client(transport.clone());
    for _ in 0..2 {
        let r = client
            .complete(&hi(), &openai(), CompletionOptions::new().cache(true))
            .await
            .unwrap();
        assert_eq!(r.outcome(), CompletionOutcome::ToolCallPending);
    }
    assert_eq!(transport.send_count(), 2);
}

#[tokio::test]
async fn test_truncated_and_failed_calls_are_not_cached() {
    let transport = ScriptedTransport::new(vec![
        Scripted::stream(&["data: {\"choices\":[{\"delta\":{\"content\":\"a\"},\"finish_reason\":\"length\"}]}\n"]),
        Scripted::stream(&["data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n"]),
        hello(),
    ]);
    let (client, _) = client(transport.clone());
    let r = client
        .complete(&hi(), &openai(), CompletionOptions::new())
        .await
        .unwrap();
    assert!(r.is_truncated());
    let err = client
        .complete(&hi(), &openai(), CompletionOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResponse { .. }));
    let ok = client
        .complete(&hi(), &openai(), CompletionOptions::new())
        .await
        .unwrap();
    assert!(!ok.cached);
    assert_eq!(ok.text, "Hello");
    assert_eq!(transport.send_count(), 3);
}

#[tokio::test]
async fn test_namespaces_do_not_share_entries() {
    let transport = ScriptedTransport::new(vec![hello(), hello()]);
    let (client, _) = client(transport.clone());
    let ns = |name: &str| CompletionOptions::new().cache_namespace(name);

    assert!(!client.complete(&hi(), &openai(), ns("a")).await.unwrap().cached);
    assert!(!client.complete(&hi(), &openai(), ns("b")).await.unwrap().cached);
    assert!(client.complete(&hi(), &openai(), ns("a")).await.unwrap().cached);
    assert_eq!(transport.send_count(), 2);
}

#[tokio::test]
async fn test_named_cache_is_used_for_its_namespace() {
    let default_cache = Arc::new(CacheManager::memory(16));
    let summaries = Arc::new(CacheManager::memory(16));
    let transport = ScriptedTransport::new(vec![hello()]);
    let client = ChatClient::builder()
        .transport(transport)
        .cache(default_cache.clone())
        .namespace_cache("summaries", summaries.clone())
        .build()
        .unwrap();
    client
        .complete(
            &hi(),
            &openai(),
            CompletionOptions::new().cache_namespace("summaries"),
        )
        .await
        .unwrap();
    assert_eq!(summaries.stats().sets, 1);
    assert_eq!(default_cache.stats().sets, 0);
}

#[tokio::test]
async fn test_policy_override_per_call() {
    let transport = ScriptedTransport::new(vec![hello(), hello()]);
    let (client, _) = client(transport.clone());
    let strict = CachePolicy::default().with_max_temperature(Some(0.01));
    for _ in 0..2 {
        client
            .complete(&hi(), &openai(), CompletionOptions::new().cache_policy(strict))
            .await
            .unwrap();
    }
    assert_eq!(transport.send_count(), 2);
}

#[tokio::test]
async fn test_cache_key_ignores_token() {
    let transport = ScriptedTransport::new(vec![hello()]);
    let (client, _) = client(transport.clone());
    client
        .complete(&hi(), &openai(), CompletionOptions::new())
        .await
        .unwrap();
    let rotated = openai().with_token("sk-another-token");
    let r = client
        .complete(&hi(), &rotated, CompletionOptions::new())
        .await
        .unwrap();
    assert!(r.cached);
    let canonical = CacheKeyGenerator::new().canonical(&hi(), &openai()).unwrap();
    assert!(!canonical.contains(TOKEN));
}

struct BrokenCache;

#[async_trait]
impl ResponseCache for BrokenCache {
    async fn get(&self, _: &CacheKey) -> Result<Option<String>> {
        Err(Error::cache("disk on fire"))
    }
    async fn set(&self, _: &CacheKey, _: &str) -> Result<()> {
        Err(Error::cache("disk on fire"))
    }
}

#[tokio::test]
async fn test_cache_failures_do_not_fail_the_call() {
    let transport = ScriptedTransport::new(vec![hello()]);
    let client = ChatClient::builder()
        .transport(transport.clone())
        .cache(Arc::new(BrokenCache))
        .build()
        .unwrap();
    let r = client
        .complete(&hi(), &openai(), CompletionOptions::new())
        .await
        .unwrap();
    assert_eq!(r.text, "Hello");
    assert_eq!(transport.send_count(), 1);
}

#[tokio::test]
async fn test_file_cache_survives_client_restart() {
    let dir = std::env::temp_dir().join(format!("ai-chat-stream-it-{}", uuid::Uuid::new_v4()));
    let path = dir.join("chat.jsonl");

    let transport = ScriptedTransport::new(vec![hello()]);
    let client = ChatClient::builder()
        .transport(transport.clone())
        .cache(Arc::new(CacheManager::new(
            CacheConfig::default(),
            Box::new(FileCache::new(&path)),
        )))
        .build()
        .unwrap();
    client
        .complete(&hi(), &openai(), CompletionOptions::new())
        .await
        .unwrap();

    let fresh = ChatClient::builder()
        .transport(ScriptedTransport::new(vec![]))
        .cache(Arc::new(CacheManager::new(
            CacheConfig::default(),
            Box::new(FileCache::new(&path)),
        )))
        .build()
        .unwrap();
    let r = fresh
        .complete(&hi(), &openai(), CompletionOptions::new())
        .await
        .unwrap();
    assert!(r.cached);
    assert_eq!(r.text, "Hello");
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_concurrent_calls_share_the_cache() {
    let transport = ScriptedTransport::new(vec![hello(), hello(), hello(), hello()]);
    let (client, _) = client(transport.clone());
    let client = Arc::new(client);
    let mut handles = Vec::new();
    for i in 0..4 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let req = ChatRequest::new("gpt-4o", vec![Message::user(format!("q{}", i))]);
            client
                .complete(&req, &openai(), CompletionOptions::new())
                .await
        }));
    }
    for h in handles {
        assert_eq!(h.await.unwrap().unwrap().text, "Hello");
    }
    let again = client
        .complete(
            &ChatRequest::new("gpt-4o", vec![Message::user("q2")]),
            &openai(),
            CompletionOptions::new(),
        )
        .await
        .unwrap();
    assert!(again.cached);
    assert_eq!(transport.send_count(), 4);
}
