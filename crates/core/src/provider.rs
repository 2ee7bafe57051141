//! Provider trait — the abstraction over completion transports.
//!
//! A Provider sends the conversation (in wire form) to a language model and
//! returns the response as a stream of incremental chunks. Text deltas and
//! tool-call fragments arrive unassembled; putting tool calls back together is
//! the agent's job, not the transport's.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::message::WireMessage;
use crate::tool::ToolSchema;

/// A streaming completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "gpt-4o-mini")
    pub model: String,

    /// The conversation messages, in wire form
    pub messages: Vec<WireMessage>,

    /// Function-calling schema for the connected tools, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSchema>>,

    /// Whether to stream the response as incremental deltas
    #[serde(default)]
    pub stream: bool,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Provider-specific parameters forwarded verbatim into the request body
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One fragment of a tool call as it arrives on the stream.
///
/// Transports commonly send the id and name only on the first fragment of a
/// call and the argument document as successive substrings after it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Call type tag, when the transport sends one
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl ToolCallDelta {
    /// A fragment that opens a new call.
    pub fn start(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// A continuation fragment carrying only an argument piece.
    pub fn arguments(piece: impl Into<String>) -> Self {
        Self {
            arguments: Some(piece.into()),
            ..Self::default()
        }
    }
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Tool call fragments carried by this chunk
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallDelta>,

    /// Why the model stopped, on the final chunk of a choice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn tool_call(delta: ToolCallDelta) -> Self {
        Self {
            tool_calls: vec![delta],
            ..Self::default()
        }
    }
}

/// Receiving end of a completion stream.
pub type ChunkReceiver = mpsc::Receiver<Result<StreamChunk, ProviderError>>;

/// The core Provider trait.
///
/// Every completion backend implements this trait. The turn processor calls
/// `stream()` without knowing which backend is in use.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Send a request and get a stream of response chunks.
    ///
    /// An `Err` here means the request could not be started; an `Err` item on
    /// the receiver means the stream broke after it started.
    async fn stream(&self, request: CompletionRequest) -> Result<ChunkReceiver, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_constructors() {
        let start = ToolCallDelta::start("c1", "get_weather");
        assert_eq!(start.id.as_deref(), Some("c1"));
        assert_eq!(start.name.as_deref(), Some("get_weather"));
        assert!(start.arguments.is_none());

        let piece = ToolCallDelta::arguments("{\"city\": ");
        assert!(piece.id.is_none());
        assert_eq!(piece.arguments.as_deref(), Some("{\"city\": "));
    }

    #[test]
    fn request_omits_empty_optionals() {
        let request = CompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![],
            tools: None,
            stream: true,
            temperature: None,
            max_tokens: None,
            extra: serde_json::Map::new(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("temperature").is_none());
        assert!(json.get("extra").is_none());
        assert_eq!(json["stream"], true);
    }
}
