//! MCP client errors.

use thiserror::Error;
use tinyagent_core::error::ToolError;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("Failed to start tool server '{server}': {reason}")]
    Spawn { server: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Server closed the connection")]
    Closed,

    #[error("No response to '{method}' within {secs}s")]
    Timeout { method: String, secs: u64 },
}

impl McpError {
    /// Convert into a tool error for a call to `tool_name` on `server`.
    ///
    /// Errors reported by the server itself are execution failures; anything
    /// else means the server could not be reached.
    pub fn into_tool_error(self, server: &str, tool_name: &str) -> ToolError {
        match self {
            McpError::Rpc { message, .. } => ToolError::ExecutionFailed {
                tool_name: tool_name.to_string(),
                reason: message,
            },
            other => ToolError::Transport {
                server: server.to_string(),
                reason: other.to_string(),
            },
        }
    }
}
