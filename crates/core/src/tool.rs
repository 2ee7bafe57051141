//! Tool transport trait — the abstraction over externally-hosted tools.
//!
//! Tools live outside the agent process (MCP servers, test doubles). The agent
//! only needs to list what is available and invoke a tool by name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

/// A tool as advertised by the tool transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// The tool name
    pub name: String,

    /// What the tool does, when the server says so
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema of the tool's arguments, when the server provides one
    #[serde(default, rename = "inputSchema", alias = "input_schema", skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl ToolInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

/// The function part of a function-calling tool schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSchema,
}

/// The core tool transport trait.
///
/// The transport is a scoped resource: it is connected before the first turn
/// and released with `close()` when the agent session ends. Implementations
/// must also release their resources on drop.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// List the tools currently offered by the connected servers.
    async fn list_tools(&self) -> std::result::Result<Vec<ToolInfo>, ToolError>;

    /// Invoke a tool and return its raw result.
    async fn call_tool(&self, name: &str, arguments: Value) -> std::result::Result<Value, ToolError>;

    /// Release the connection. Calling it more than once is harmless.
    async fn close(&self) -> std::result::Result<(), ToolError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A transport with a single echo tool.
    struct EchoTransport;

    #[async_trait]
    impl ToolTransport for EchoTransport {
        async fn list_tools(&self) -> std::result::Result<Vec<ToolInfo>, ToolError> {
            Ok(vec![ToolInfo::new("echo").with_description("Echoes back the input")])
        }

        async fn call_tool(&self, name: &str, arguments: Value) -> std::result::Result<Value, ToolError> {
            if name != "echo" {
                return Err(ToolError::NotFound(name.to_string()));
            }
            Ok(arguments["text"].clone())
        }
    }

    #[tokio::test]
    async fn transport_lists_and_calls() {
        let transport = EchoTransport;
        let tools = transport.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo");

        let result = transport
            .call_tool("echo", json!({"text": "hello world"}))
            .await
            .unwrap();
        assert_eq!(result, json!("hello world"));
        assert!(transport.close().await.is_ok());
    }

    #[tokio::test]
    async fn transport_unknown_tool() {
        let err = EchoTransport.call_tool("missing", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn tool_info_reads_mcp_field_names() {
        let info: ToolInfo = serde_json::from_value(json!({
            "name": "get_weather",
            "inputSchema": {"type": "object"}
        }))
        .unwrap();
        assert_eq!(info.input_schema, Some(json!({"type": "object"})));
        assert!(info.description.is_none());
    }

    #[test]
    fn tool_schema_serializes_type_tag() {
        let schema = ToolSchema {
            kind: "function".into(),
            function: FunctionSchema {
                name: "echo".into(),
                description: "Echo".into(),
                parameters: json!({"type": "object"}),
            },
        };
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "echo");
    }
}
