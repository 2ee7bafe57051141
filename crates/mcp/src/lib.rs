//! Tool transport over the Model Context Protocol.
//!
//! Each configured server is spawned as a child process and spoken to over
//! stdio. [`McpClient`] implements `tinyagent_core::ToolTransport` across all
//! of them.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::McpClient;
pub use error::McpError;
pub use server::{McpServer, McpSession};
