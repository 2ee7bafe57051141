//! The streaming agent loop.
//!
//! An [`Agent`] drives turns between a completion transport and a tool
//! transport:
//!
//! 1. **Stream** the model's reply, relaying text as it arrives
//! 2. **Accumulate** tool-call fragments into complete calls
//! 3. **Execute** the calls and record their results in the conversation
//! 4. **Repeat** until the model is done, asks for no tools, or is aborted
//!
//! Every step is surfaced to the caller as an [`AgentEvent`] on a lazy stream.

pub mod accumulator;
pub mod error;
pub mod executor;
pub mod loop_runner;
pub mod schema;
pub mod stream_event;
pub mod turn;

pub use accumulator::ToolCallAccumulator;
pub use error::AgentError;
pub use executor::ToolExecutor;
pub use loop_runner::{ABORTED_MESSAGE, AbortSignal, Agent, TurnCounter};
pub use schema::project_tools;
pub use stream_event::{AgentEvent, COMPLETION_MARKERS};
pub use turn::TurnProcessor;
