//! OpenAI-compatible completion transport.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM, LiteLLM proxies and any other
//! endpoint that speaks the `/chat/completions` streaming protocol.
//!
//! Tool-call fragments are forwarded exactly as they arrive. Assembling them
//! into complete calls happens in the agent's accumulator.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tinyagent_core::error::ProviderError;
use tinyagent_core::provider::*;
use tracing::{debug, trace, warn};

/// An OpenAI-compatible streaming provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", OPENAI_BASE_URL, api_key)
    }

    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", OPENROUTER_BASE_URL, api_key)
    }

    /// Ollama needs no real key.
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new("ollama", base_url.unwrap_or(OLLAMA_BASE_URL), "ollama")
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the JSON request body.
    ///
    /// Extra provider parameters are merged at the top level; typed fields win
    /// on a key collision.
    fn request_body(request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "stream": request.stream,
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if let Some(tools) = request.tools.as_ref().filter(|t| !t.is_empty()) {
            body["tools"] = serde_json::json!(tools);
        }

        if let Some(object) = body.as_object_mut() {
            for (key, value) in &request.extra {
                object.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        body
    }
}

pub(crate) const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub(crate) const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub(crate) const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, request: CompletionRequest) -> Result<ChunkReceiver, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider streaming error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        // Read the SSE byte stream and forward parsed chunks
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut lines = SseLineBuffer::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for line in lines.push(&bytes) {
                    match parse_sse_line(&line) {
                        SseEvent::Skip => {}
                        SseEvent::Done => return,
                        SseEvent::Chunk(chunk) => {
                            if tx.send(Ok(chunk)).await.is_err() {
                                return; // receiver dropped
                            }
                        }
                        SseEvent::Error(err) => {
                            let _ = tx.send(Err(err)).await;
                            return;
                        }
                        SseEvent::Unparseable(data, e) => {
                            trace!(
                                provider = %provider_name,
                                data = %data,
                                error = %e,
                                "Ignoring unparseable SSE chunk"
                            );
                        }
                    }
                }
            }

            trace!(provider = %provider_name, "Stream ended without [DONE]");
        });

        Ok(rx)
    }
}

/// Splits an SSE byte stream into complete lines.
///
/// Bytes are held until a newline arrives, so a multi-byte character split
/// across network chunks is decoded whole.
#[derive(Default)]
struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw[..line_end]);
            lines.push(line.trim_end_matches('\r').to_string());
        }
        lines
    }
}

#[derive(Debug)]
enum SseEvent {
    Skip,
    Done,
    Chunk(StreamChunk),
    Error(ProviderError),
    Unparseable(String, String),
}

/// Interpret one SSE line.
fn parse_sse_line(line: &str) -> SseEvent {
    // Empty lines and comments
    if line.is_empty() || line.starts_with(':') {
        return SseEvent::Skip;
    }

    let Some(data) = line.strip_prefix("data:") else {
        return SseEvent::Skip;
    };
    let data = data.trim();

    if data == "[DONE]" {
        return SseEvent::Done;
    }

    let response = match serde_json::from_str::<StreamResponse>(data) {
        Ok(r) => r,
        Err(e) => return SseEvent::Unparseable(data.to_string(), e.to_string()),
    };

    if let Some(error) = response.error {
        return SseEvent::Error(ProviderError::ApiError {
            status_code: 200,
            message: error.message,
        });
    }

    let Some(choice) = response.choices.into_iter().next() else {
        return SseEvent::Skip;
    };

    let tool_calls: Vec<ToolCallDelta> = choice
        .delta
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            let (name, arguments) = match tc.function {
                Some(f) => (f.name, f.arguments),
                None => (None, None),
            };
            ToolCallDelta {
                id: tc.id,
                kind: tc.kind,
                name,
                arguments,
            }
        })
        .collect();

    let content = choice.delta.content.filter(|c| !c.is_empty());

    if content.is_none() && tool_calls.is_empty() && choice.finish_reason.is_none() {
        return SseEvent::Skip;
    }

    SseEvent::Chunk(StreamChunk {
        content,
        tool_calls,
        finish_reason: choice.finish_reason,
    })
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A tool call fragment as the endpoint sends it.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}
