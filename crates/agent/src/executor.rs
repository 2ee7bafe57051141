//! Runs the tool calls of one assistant message.
//!
//! Calls are executed one at a time, in order. A failing call is recorded in
//! the conversation so the model can react to it, and never stops the calls
//! after it.

use async_stream::stream;
use futures::Stream;
use serde_json::Value;
use tinyagent_core::message::{Conversation, Message, ToolCall};
use tinyagent_core::tool::ToolTransport;
use tracing::{debug, warn};

use crate::stream_event::AgentEvent;

/// Error text reported when no tool transport is connected.
pub const TRANSPORT_UNAVAILABLE: &str = "tool transport unavailable";

#[derive(Clone, Copy)]
pub struct ToolExecutor<'a> {
    transport: Option<&'a dyn ToolTransport>,
}

impl<'a> ToolExecutor<'a> {
    pub fn new(transport: Option<&'a dyn ToolTransport>) -> Self {
        Self { transport }
    }

    /// Execute `calls` in order, appending one tool message per call to
    /// `conversation` (none when no transport is connected).
    pub fn execute<'c>(
        self,
        calls: Vec<ToolCall>,
        conversation: &'c mut Conversation,
    ) -> impl Stream<Item = AgentEvent> + 'c
    where
        'a: 'c,
    {
        stream! {
            for call in calls {
                let name = call.function.name.clone();
                let arguments = parse_arguments(&name, &call.function.arguments);

                yield AgentEvent::ToolInput {
                    name: name.clone(),
                    arguments: arguments.clone(),
                };

                let transport = match self.transport {
                    Some(transport) => transport,
                    None => {
                        warn!(tool = %name, "No tool transport connected");
                        yield AgentEvent::ToolError {
                            name,
                            error: TRANSPORT_UNAVAILABLE.to_string(),
                        };
                        continue;
                    }
                };

                debug!(tool = %name, id = %call.id, "Executing tool");

                match transport.call_tool(&name, arguments).await {
                    Ok(result) => {
                        conversation.push(Message::tool_result(call.id.clone(), result_text(&result)));
                        yield AgentEvent::ToolResult { name, result };
                    }
                    Err(e) => {
                        let error = format!("Tool execution error ({name}): {e}");
                        warn!(tool = %name, error = %e, "Tool execution failed");
                        conversation.push(Message::tool_result(call.id.clone(), error.clone()));
                        yield AgentEvent::ToolError { name, error };
                    }
                }
            }
        }
    }
}

/// Parse a call's argument document; empty or malformed input becomes `{}`.
fn parse_arguments(name: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }

    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(tool = %name, error = %e, arguments = %raw, "Malformed tool arguments, using {{}}");
            Value::Object(Default::default())
        }
    }
}

/// String form of a tool result for the conversation.
///
/// A JSON string is used verbatim. An MCP content array made only of text
/// items becomes their newline-joined text. Anything else is compact JSON.
pub fn result_text(result: &Value) -> String {
    match result {
        Value::String(s) => s.clone(),
        Value::Array(items)
            if !items.is_empty()
                && items
                    .iter()
                    .all(|item| item["type"] == "text" && item["text"].is_string()) =>
        {
            items
                .iter()
                .filter_map(|item| item["text"].as_str())
                .collect::<Vec<_>>()
                .join("\n")
        }
        other => other.to_string(),
    }
}
