//! One exchange with the completion transport.
//!
//! A turn streams the model's reply, relaying text as it arrives and
//! collecting tool-call fragments. Once the stream ends it records exactly one
//! assistant message and runs any tool calls that message carries.
//!
//! If the request or the stream fails, one error event is emitted, nothing is
//! appended, and the stream ends with `AgentError::Completion`.

use std::pin::pin;

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use tinyagent_config::CompletionSettings;
use tinyagent_core::message::{Conversation, Message};
use tinyagent_core::provider::{CompletionRequest, Provider};
use tinyagent_core::tool::{ToolSchema, ToolTransport};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::accumulator::ToolCallAccumulator;
use crate::error::AgentError;
use crate::executor::ToolExecutor;
use crate::stream_event::AgentEvent;

#[derive(Clone, Copy)]
pub struct TurnProcessor<'a> {
    provider: &'a dyn Provider,
    settings: &'a CompletionSettings,
    tools: Option<&'a dyn ToolTransport>,
    schema: &'a [ToolSchema],
}

impl<'a> TurnProcessor<'a> {
    pub fn new(
        provider: &'a dyn Provider,
        settings: &'a CompletionSettings,
        tools: Option<&'a dyn ToolTransport>,
        schema: &'a [ToolSchema],
    ) -> Self {
        Self {
            provider,
            settings,
            tools,
            schema,
        }
    }

    fn request(&self, conversation: &Conversation) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            messages: conversation.to_wire(),
            tools: (!self.schema.is_empty()).then(|| self.schema.to_vec()),
            stream: true,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            extra: self.settings.extra.clone(),
        }
    }

    /// Run one turn against `conversation`.
    pub fn process<'c>(
        self,
        conversation: &'c mut Conversation,
    ) -> impl Stream<Item = Result<AgentEvent, AgentError>> + 'c
    where
        'a: 'c,
    {
        try_stream! {
            let request = self.request(conversation);
            debug!(
                provider = %self.provider.name(),
                model = %request.model,
                messages = request.messages.len(),
                tools = self.schema.len(),
                "Starting turn"
            );

            let opened = self.provider.stream(request).await;
            if let Err(e) = &opened {
                warn!(error = %e, "Completion request failed");
                yield AgentEvent::Error { message: e.to_string() };
            }
            let mut chunks = ReceiverStream::new(opened.map_err(AgentError::Completion)?);

            let mut content = String::new();
            let mut accumulator = ToolCallAccumulator::new();

            while let Some(item) = chunks.next().await {
                if let Err(e) = &item {
                    warn!(error = %e, "Completion stream failed");
                    yield AgentEvent::Error { message: e.to_string() };
                }
                let chunk = item.map_err(AgentError::Completion)?;

                if let Some(text) = chunk.content.filter(|t| !t.is_empty()) {
                    content.push_str(&text);
                    yield AgentEvent::Content { content: text };
                }

                for fragment in &chunk.tool_calls {
                    accumulator.ingest(fragment);
                }
            }

            let calls = accumulator.finalize();
            debug!(content_len = content.len(), tool_calls = calls.len(), "Turn stream complete");
            conversation.push(Message::assistant_with_tool_calls(content, calls.clone()));

            if !calls.is_empty() {
                let executor = ToolExecutor::new(self.tools);
                let mut events = pin!(executor.execute(calls, &mut *conversation));
                while let Some(event) = events.next().await {
                    yield event;
                }
            }
        }
    }
}
