//! Streaming behavior of `ChatClient::complete` over a scripted transport.

use crate::scripted::{client, hello, openai, Scripted, ScriptedTransport, TOKEN};
use ai_chat_stream::types::{ChatRequest, CompletionOutcome, FinishReason, Message, ToolDefinition};
use ai_chat_stream::{CompletionOptions, Error, ProviderConfig};
use reqwest::header::AUTHORIZATION;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

fn hi() -> ChatRequest {
    ChatRequest::new("gpt-4o", vec![Message::user("hi")]).temperature(0.2)
}

fn recorder() -> (Arc<Mutex<Vec<(String, String, usize)>>>, CompletionOptions) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let options = CompletionOptions::new().on_progress(move |p| {
        sink.lock().unwrap().push((
            p.response_chunk.to_string(),
            p.response_so_far.to_string(),
            p.tokens_so_far,
        ));
    });
    (seen, options)
}

#[tokio::test]
async fn test_streamed_text_and_progress() {
    let transport = ScriptedTransport::new(vec![hello()]);
    let (client, _) = client(transport.clone());
    let (seen, options) = recorder();

    let result = client.complete(&hi(), &openai(), options).await.unwrap();
    assert_eq!(result.text, "Hello");
    assert_eq!(result.finish_reason, Some(FinishReason::Stop));
    assert!(!result.cached);
    assert_eq!(result.outcome(), CompletionOutcome::Done);

    let seen = seen.lock().unwrap();
    let deltas: Vec<&str> = seen.iter().map(|(d, _, _)| d.as_str()).collect();
    assert_eq!(deltas, vec!["Hel", "lo"]);
    assert_eq!(seen[1].1, "Hello");
    assert!(seen[1].2 >= seen[0].2);
}

#[tokio::test]
async fn test_request_shape_on_the_wire() {
    let transport = ScriptedTransport::new(vec![hello()]);
    let (client, _) = client(transport.clone());
    client
        .complete(&hi(), &openai(), CompletionOptions::new())
        .await
        .unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].url, "https://api.openai.com/v1/chat/completions");
    assert_eq!(sent[0].headers[AUTHORIZATION], format!("Bearer {}", TOKEN));
    let body: serde_json::Value = serde_json::from_slice(&sent[0].body).unwrap();
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["stream"], true);
    assert_eq!(body["messages"][0]["role"], "user");
}

#[tokio::test]
async fn test_azure_request_shape() {
    let transport = ScriptedTransport::new(vec![hello()]);
    let (client, _) = client(transport.clone());
    let azure = ProviderConfig::azure("https://contoso.openai.azure.com/openai/deployments")
        .with_token("azure-key");
    let req = ChatRequest::new("gpt-3.5-turbo", vec![Message::user("hi")]);
    client
        .complete(&req, &azure, CompletionOptions::new())
        .await
        .unwrap();

    let sent = &transport.sent()[0];
    assert_eq!(
        sent.url,
        "https://contoso.openai.azure.com/openai/deployments/gpt-35-turbo/chat/completions?api-version=2023-09-01-preview"
    );
    assert_eq!(sent.headers["api-key"], "azure-key");
    assert!(sent.headers.get(AUTHORIZATION).is_none());
    let body: serde_json::Value = serde_json::from_slice(&sent.body).unwrap();
    assert!(body.get("model").is_none());
}

#[tokio::test]
async fn test_bytes_split_inside_characters() {
    let stream = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"日本語\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" ok\"},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    let chunks: Vec<Vec<u8>> = stream.as_bytes().chunks(5).map(|c| c.to_vec()).collect();
    let transport = ScriptedTransport::new(vec![Scripted::bytes(chunks)]);
    let (client, _) = client(transport);
    let (seen, options) = recorder();

    let result = client.complete(&hi(), &openai(), options).await.unwrap();
    assert_eq!(result.text, "日本語 ok");
    let joined: String = seen.lock().unwrap().iter().map(|(d, _, _)| d.clone()).collect();
    assert_eq!(joined, "日本語 ok");
}

#[tokio::test]
async fn test_tool_calls_are_assembled() {
    let transport = ScriptedTransport::new(vec![Scripted::stream(&[
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"type\":\"function\",\"function\":{\"name\":\"get_weather\",\"arguments\":\"\"}}]}}]}\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"city\\\":\"}}]}}]}\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"\\\"Paris\\\"}\"}}]}}]}\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n",
        "data: [DONE]\n",
    ])]);
    let (client, _) = client(transport.clone());
    let tool = ToolDefinition::function(
        "get_weather",
        Some("Current weather".into()),
        Some(serde_json::json!({"type":"object","properties":{"city":{"type":"string"}}})),
    );
    let req = hi().tools(vec![tool]);

    let result = client
        .complete(&req, &openai(), CompletionOptions::new())
        .await
        .unwrap();
    assert_eq!(result.outcome(), CompletionOutcome::ToolCallPending);
    assert_eq!(result.tool_calls.len(), 1);
    let call = &result.tool_calls[0];
    assert_eq!(call.id, "call_1");
    assert_eq!(call.name, "get_weather");
    assert_eq!(
        call.parsed_arguments(),
        Some(serde_json::json!({"city": "Paris"}))
    );

    // Follow-up messages the caller sends on the next turn.
    let follow_up = vec![
        Message::assistant_tool_calls(&result.tool_calls),
        Message::tool(&call.id, "18C and sunny"),
    ];
    let wire = serde_json::to_value(&follow_up).unwrap();
    assert_eq!(wire[0]["tool_calls"][0]["id"], "call_1");
    assert_eq!(wire[1]["tool_call_id"], "call_1");
}

#[tokio::test]
async fn test_truncated_response() {
    let transport = ScriptedTransport::new(vec![Scripted::stream(&[
        "data: {\"choices\":[{\"delta\":{\"content\":\"Once upon\"},\"finish_reason\":\"length\"}]}\n",
    ])]);
    let (client, trace) = client(transport);
    let result = client
        .complete(&hi(), &openai(), CompletionOptions::new())
        .await
        .unwrap();
    assert_eq!(result.text, "Once upon");
    assert!(result.is_truncated());
    assert!(trace.content().contains("response too long, increase max_tokens"));
}

#[tokio::test]
async fn test_stream_without_finish_is_invalid() {
    let transport = ScriptedTransport::new(vec![Scripted::stream(&[
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
        "data: {\"choices\":[{\"del",
    ])]);
    let (client, trace) = client(transport);
    let err = client
        .complete(&hi(), &openai(), CompletionOptions::new())
        .await
        .unwrap_err();
    match err {
        Error::InvalidResponse { partial } => assert_eq!(partial, "data: {\"choices\":[{\"del"),
        other => panic!("expected invalid response, got {:?}", other),
    }
    let md = trace.content();
    assert!(md.contains("invalid response"));
    assert!(md.contains("data: {\"choices\":[{\"del"));
}

#[tokio::test]
async fn test_cancellation_mid_stream() {
    let transport = ScriptedTransport::new(vec![Scripted::stream(&[
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
    ])
    .then_hang()]);
    let (client, _) = client(transport);
    let token = CancellationToken::new();
    let trigger = token.clone();
    let options = CompletionOptions::new()
        .signal(token)
        .on_progress(move |_| trigger.cancel());

    let err = client.complete(&hi(), &openai(), options).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn test_cancellation_from_another_task() {
    let transport = ScriptedTransport::new(vec![hello().then_hang()]);
    let (client, _) = client(transport);
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        canceller.cancel();
    });
    // The hanging body keeps the stream open after [DONE]; only the signal ends it.
    let err = client
        .complete(&hi(), &openai(), CompletionOptions::new().signal(token))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn test_cancelled_before_send() {
    let transport = ScriptedTransport::new(vec![hello()]);
    let (client, _) = client(transport.clone());
    let token = CancellationToken::new();
    token.cancel();
    let err = client
        .complete(&hi(), &openai(), CompletionOptions::new().cache(false).signal(token))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(transport.send_count(), 0);
}

#[tokio::test]
async fn test_trace_never_contains_token() {
    let transport = ScriptedTransport::new(vec![hello()]);
    let (client, trace) = client(transport);
    client
        .complete(&hi(), &openai(), CompletionOptions::new())
        .await
        .unwrap();
    let md = trace.content();
    assert!(md.contains("caching: true"));
    assert!(md.contains("https://api.openai.com/v1/chat/completions"));
    assert!(md.contains("\"hi\""));
    assert!(!md.contains(TOKEN));
}

#[tokio::test]
async fn test_trace_fences_request_body_and_tool_schema() {
    let transport = ScriptedTransport::new(vec![hello()]);
    let (client, trace) = client(transport);
    let tool = ToolDefinition::function(
        "get_weather",
        Some("Current weather".into()),
        Some(serde_json::json!({
            "type": "object",
            "properties": {"location": {"type": "string"}}
        })),
    );
    let req = hi().tools(vec![tool]);
    client
        .complete(&req, &openai(), CompletionOptions::new())
        .await
        .unwrap();

    let md = trace.content();
    assert!(md.contains("tools: get_weather"));
    assert!(md.contains("<summary>schema</summary>"));
    assert!(md.contains("\"location\""));
    assert!(md.contains("<summary>messages</summary>"));
    assert!(md.contains("\"stream\": true"));
    assert!(md.contains("\"temperature\": 0.2"));
    assert!(md.contains("\"model\": \"gpt-4o\""));
    assert!(!md.contains(TOKEN));
}
