//! Message and Conversation domain types.
//!
//! These are the value objects that flow through the turn loop:
//! the caller's input becomes a user message, the streamed completion becomes
//! an assistant message, and every executed tool call becomes a tool message.

use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user
    User,
    /// The language model
    Assistant,
    /// Tool execution result
    Tool,
}

/// The function half of a completed tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the tool to invoke
    pub name: String,

    /// Raw JSON argument document, parsed only at execution time
    pub arguments: String,
}

/// A complete tool invocation requested by the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier assigned by the model
    pub id: String,

    /// Call type tag, always "function" for function calling
    #[serde(rename = "type", default = "default_call_type")]
    pub kind: String,

    pub function: FunctionCall,
}

fn default_call_type() -> String {
    "function".into()
}

impl ToolCall {
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: default_call_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content (possibly empty)
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Optional participant name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// Create a new assistant message without tool calls.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    /// Create an assistant message carrying the tool calls the model requested.
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::with_role(Role::Assistant, content.into())
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// Create a tool result message.
    ///
    /// `tool_call_id` must be the id of the assistant tool call being answered.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(Role::Tool, content.into())
        }
    }

    /// Set the optional participant name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Convert to the wire form sent to the completion transport.
    ///
    /// System, user and assistant messages always carry `content`, even when
    /// empty. Tool messages drop `content` when it is empty. Empty tool call
    /// lists, ids and names are omitted.
    pub fn to_wire(&self) -> WireMessage {
        let content = match self.role {
            Role::System | Role::User | Role::Assistant => Some(self.content.clone()),
            Role::Tool if self.content.is_empty() => None,
            Role::Tool => Some(self.content.clone()),
        };

        WireMessage {
            role: self.role,
            content,
            tool_calls: self.tool_calls.clone(),
            tool_call_id: self.tool_call_id.clone().filter(|id| !id.is_empty()),
            name: self.name.clone().filter(|name| !name.is_empty()),
        }
    }
}

/// The provider-facing shape of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// An ordered, append-only sequence of messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the conversation.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The most recently appended assistant message.
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// The whole conversation in wire form, oldest first.
    pub fn to_wire(&self) -> Vec<WireMessage> {
        self.messages.iter().map(Message::to_wire).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello, agent!");
        assert!(msg.tool_calls.is_empty());
        assert!(msg.tool_call_id.is_none());
    }

    #[test]
    fn tool_message_with_empty_content_omits_content_key() {
        let msg = Message::tool_result("call_1", "");
        let wire = serde_json::to_value(msg.to_wire()).unwrap();
        assert_eq!(wire, json!({"role": "tool", "tool_call_id": "call_1"}));
    }

    #[test]
    fn tool_message_with_content_keeps_it() {
        let msg = Message::tool_result("call_1", "Sunny, 25°C");
        let wire = serde_json::to_value(msg.to_wire()).unwrap();
        assert_eq!(
            wire,
            json!({"role": "tool", "content": "Sunny, 25°C", "tool_call_id": "call_1"})
        );
    }

    #[test]
    fn empty_assistant_content_is_still_sent() {
        let wire = serde_json::to_value(Message::assistant("").to_wire()).unwrap();
        assert_eq!(wire, json!({"role": "assistant", "content": ""}));

        let wire = serde_json::to_value(Message::system("").to_wire()).unwrap();
        assert_eq!(wire, json!({"role": "system", "content": ""}));
    }

    #[test]
    fn assistant_tool_calls_serialize_in_function_shape() {
        let msg = Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::function("c1", "get_weather", r#"{"city":"Tokyo"}"#)],
        );
        let wire = serde_json::to_value(msg.to_wire()).unwrap();
        assert_eq!(
            wire,
            json!({
                "role": "assistant",
                "content": "",
                "tool_calls": [{
                    "id": "c1",
                    "type": "function",
                    "function": {"name": "get_weather", "arguments": "{\"city\":\"Tokyo\"}"}
                }]
            })
        );
    }

    #[test]
    fn name_is_sent_only_when_set() {
        let wire = serde_json::to_value(Message::user("hi").with_name("alice").to_wire()).unwrap();
        assert_eq!(wire["name"], "alice");

        let wire = serde_json::to_value(Message::user("hi").to_wire()).unwrap();
        assert!(wire.get("name").is_none());
    }

    #[test]
    fn conversation_keeps_append_order() {
        let mut conv = Conversation::new();
        assert!(conv.is_empty());

        conv.push(Message::system("be brief"));
        conv.push(Message::user("First message"));
        assert_eq!(conv.len(), 2);

        let roles: Vec<_> = conv.to_wire().into_iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User]);
    }

    #[test]
    fn last_assistant_skips_tool_messages() {
        let mut conv = Conversation::new();
        conv.push(Message::user("weather?"));
        conv.push(Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::function("c1", "get_weather", "{}")],
        ));
        conv.push(Message::tool_result("c1", "sunny"));

        let last = conv.last_assistant().unwrap();
        assert_eq!(last.tool_calls.len(), 1);
        assert_eq!(conv.last().unwrap().role, Role::Tool);
    }

    #[test]
    fn tool_call_type_defaults_to_function() {
        let call: ToolCall = serde_json::from_value(json!({
            "id": "c1",
            "function": {"name": "echo", "arguments": ""}
        }))
        .unwrap();
        assert_eq!(call.kind, "function");
    }
}
