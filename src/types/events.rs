//! Streamed chunk payloads and the completion outcome.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::tool::ToolCall;

/// One `data:` payload of a chat completions stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<ChunkDelta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// Server-reported cause for the end of generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolCalls => "tool_calls",
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FinishReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop" => Ok(FinishReason::Stop),
            "length" => Ok(FinishReason::Length),
            "tool_calls" => Ok(FinishReason::ToolCalls),
            other => Err(other.to_string()),
        }
    }
}

/// Incremental progress reported while a response streams in.
///
/// `response_chunk` is only the text appended since the previous report;
/// concatenating every chunk in order reproduces `response_so_far`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatProgress<'a> {
    pub response_so_far: &'a str,
    pub tokens_so_far: usize,
    pub response_chunk: &'a str,
}

/// How a completion call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Served from the response cache; no request was sent.
    CacheHit,
    /// The model finished normally.
    Done,
    /// The model asked for tools to run; the caller issues a follow-up call.
    ToolCallPending,
    /// Output hit the token limit and may be cut short.
    Truncated,
}

/// Final result of one completion call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletionResult {
    pub text: String,
    pub finish_reason: Option<FinishReason>,
    pub tool_calls: Vec<ToolCall>,
    pub cached: bool,
}

impl CompletionResult {
    pub fn outcome(&self) -> CompletionOutcome {
        if self.cached {
            return CompletionOutcome::CacheHit;
        }
        match self.finish_reason {
            Some(FinishReason::ToolCalls) => CompletionOutcome::ToolCallPending,
            Some(FinishReason::Length) => CompletionOutcome::Truncated,
            Some(FinishReason::Stop) | None => CompletionOutcome::Done,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.outcome() == CompletionOutcome::Truncated
    }
}
