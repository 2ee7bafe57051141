//! # tinyagent Core
//!
//! Domain types, traits, and error definitions for the tinyagent streaming
//! agent loop. This crate has no transport dependencies; it defines the
//! domain model the other crates implement against.
//!
//! The two external collaborators of the agent loop are traits here:
//! - [`Provider`]: the completion transport that streams model output
//! - [`ToolTransport`]: the externally-hosted tools the model may call
//!
//! Implementations live in their own crates so they can be swapped and mocked.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, ToolError};
pub use message::{Conversation, FunctionCall, Message, Role, ToolCall, WireMessage};
pub use provider::{ChunkReceiver, CompletionRequest, Provider, StreamChunk, ToolCallDelta};
pub use tool::{FunctionSchema, ToolInfo, ToolSchema, ToolTransport};
