//! Agent-level streaming events.
//!
//! `AgentEvent` is what `Agent::run` yields to the caller. The set is closed:
//! - `content`     — partial text from the model
//! - `tool_input`  — a tool is about to run
//! - `tool_result` — a tool call succeeded
//! - `tool_error`  — a tool call failed (not fatal)
//! - `error`       — the turn failed (fatal)
//! - `status`      — informational notice, e.g. an abort

use serde::{Deserialize, Serialize};

/// Lower-cased tokens that mark the model's answer as final.
pub const COMPLETION_MARKERS: &[&str] = &["完了", "終了", "解決", "できました", "finished", "done"];

/// Events emitted by the agent during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Partial text from the model.
    Content { content: String },

    /// A tool is about to be invoked with these parsed arguments.
    ToolInput {
        name: String,
        arguments: serde_json::Value,
    },

    /// Tool execution succeeded; `result` is the raw transport value.
    ToolResult {
        name: String,
        result: serde_json::Value,
    },

    /// Tool execution failed or no transport was available.
    ToolError { name: String, error: String },

    /// The turn failed.
    Error { message: String },

    /// Informational notice.
    Status { message: String },
}

impl AgentEvent {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content {
            content: text.into(),
        }
    }

    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }

    /// Wire name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Content { .. } => "content",
            Self::ToolInput { .. } => "tool_input",
            Self::ToolResult { .. } => "tool_result",
            Self::ToolError { .. } => "tool_error",
            Self::Error { .. } => "error",
            Self::Status { .. } => "status",
        }
    }

    /// Whether this is a content event whose text contains a completion marker.
    ///
    /// Always false for non-content events.
    pub fn signals_completion(&self) -> bool {
        match self {
            Self::Content { content } if !content.is_empty() => {
                let lowered = content.to_lowercase();
                COMPLETION_MARKERS.iter().any(|m| lowered.contains(m))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_serialization_content() {
        let json = serde_json::to_string(&AgentEvent::content("Hello")).unwrap();
        assert!(json.contains(r#""type":"content""#));
        assert!(json.contains(r#""content":"Hello""#));
    }

    #[test]
    fn event_serialization_tool_input() {
        let event = AgentEvent::ToolInput {
            name: "get_weather".into(),
            arguments: json!({"city": "Tokyo"}),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "tool_input");
        assert_eq!(value["arguments"]["city"], "Tokyo");
    }

    #[test]
    fn event_deserialization() {
        let event: AgentEvent =
            serde_json::from_str(r#"{"type":"tool_error","name":"x","error":"boom"}"#).unwrap();
        assert_eq!(
            event,
            AgentEvent::ToolError {
                name: "x".into(),
                error: "boom".into()
            }
        );
    }

    #[test]
    fn event_type_names() {
        assert_eq!(AgentEvent::content("x").event_type(), "content");
        assert_eq!(AgentEvent::status("x").event_type(), "status");
        assert_eq!(
            AgentEvent::Error { message: "x".into() }.event_type(),
            "error"
        );
        assert_eq!(
            AgentEvent::ToolResult {
                name: "a".into(),
                result: json!(null)
            }
            .event_type(),
            "tool_result"
        );
    }

    #[test]
    fn markers_detected_case_insensitively() {
        assert!(AgentEvent::content("All DONE here").signals_completion());
        assert!(AgentEvent::content("Task Finished.").signals_completion());
        assert!(AgentEvent::content("処理が完了しました").signals_completion());
        assert!(AgentEvent::content("問題を解決").signals_completion());
        assert!(!AgentEvent::content("still working").signals_completion());
        assert!(!AgentEvent::content("").signals_completion());
    }

    #[test]
    fn non_content_events_never_signal_completion() {
        let events = [
            AgentEvent::ToolInput {
                name: "done".into(),
                arguments: json!({"status": "done"}),
            },
            AgentEvent::ToolResult {
                name: "finished".into(),
                result: json!("done"),
            },
            AgentEvent::ToolError {
                name: "x".into(),
                error: "done".into(),
            },
            AgentEvent::status("done"),
            AgentEvent::Error {
                message: "finished".into(),
            },
        ];
        assert!(events.iter().all(|e| !e.signals_completion()));
    }
}
