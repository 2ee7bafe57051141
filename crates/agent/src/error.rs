//! Errors that end a run.

use thiserror::Error;
use tinyagent_core::error::{ProviderError, ToolError};
use tinyagent_mcp::McpError;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The completion request failed or its stream broke.
    #[error("Completion failed: {0}")]
    Completion(#[from] ProviderError),

    /// Tool servers could not be started.
    #[error("Failed to connect tool servers: {0}")]
    Connection(#[from] McpError),

    /// The completion transport could not be built from the settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Tool transport error: {0}")]
    Tool(#[from] ToolError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
