//! The agent loop.
//!
//! `run` appends the user's input and repeats turns until one of these holds,
//! checked in order after every complete turn:
//!
//! 1. a content event contained a completion marker
//! 2. the last assistant message requested no tools
//! 3. the abort signal is set (a status event is emitted first)
//!
//! There is no iteration cap here; callers that want one set the abort signal.

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use tinyagent_config::{AgentConfig, CompletionSettings};
use tinyagent_core::message::{Conversation, Message};
use tinyagent_core::provider::Provider;
use tinyagent_core::tool::{ToolInfo, ToolTransport};
use tinyagent_mcp::McpClient;
use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::schema::project_tools;
use crate::stream_event::AgentEvent;
use crate::turn::TurnProcessor;

/// Status message emitted when a run stops on the abort signal.
pub const ABORTED_MESSAGE: &str = "processing was aborted";

/// Cooperative cancellation flag, checked once per completed turn.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Number of turns an agent has completed, readable while a run is streaming.
#[derive(Debug, Clone, Default)]
pub struct TurnCounter(Arc<AtomicUsize>);

impl TurnCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A conversation with one model and, optionally, a set of tools.
pub struct Agent {
    /// Completion transport
    provider: Arc<dyn Provider>,

    /// Request parameters; `model` is the name the endpoint expects
    settings: CompletionSettings,

    conversation: Conversation,

    /// Tool transport, if any servers are connected
    tools: Option<Arc<dyn ToolTransport>>,

    /// Tool listing cached from the transport
    tool_cache: Option<Vec<ToolInfo>>,

    turns: TurnCounter,
}

impl Agent {
    pub fn new(provider: Arc<dyn Provider>, settings: CompletionSettings) -> Self {
        Self {
            provider,
            settings,
            conversation: Conversation::new(),
            tools: None,
            tool_cache: None,
            turns: TurnCounter::default(),
        }
    }

    /// Seed the conversation with a system message. Call before the first run.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.conversation.push(Message::system(prompt));
        self
    }

    pub fn with_tool_transport(mut self, transport: Arc<dyn ToolTransport>) -> Self {
        self.tools = Some(transport);
        self.tool_cache = None;
        self
    }

    /// Build an agent from configuration: completion transport, system
    /// prompt, and tool servers.
    ///
    /// Tool servers are started and their tools listed here.
    pub async fn connect(config: &AgentConfig) -> Result<Self, AgentError> {
        let (provider, model) = tinyagent_providers::build_from_settings(&config.completion)
            .map_err(|e| AgentError::Configuration(e.to_string()))?;

        let settings = CompletionSettings {
            model,
            ..config.completion.clone()
        };

        let mut agent = Self::new(provider, settings);
        if let Some(prompt) = config.resolved_system_prompt() {
            agent = agent.with_system_prompt(prompt);
        }

        if !config.mcp_servers.is_empty() {
            let client = McpClient::connect(&config.mcp_servers).await?;
            agent = agent.with_tool_transport(Arc::new(client));
            let count = agent.refresh_tools().await.len();
            info!(servers = config.mcp_servers.len(), tools = count, "Tool servers ready");
        }

        Ok(agent)
    }

    /// Re-list tools from the transport.
    ///
    /// A listing failure leaves an empty tool list rather than failing.
    pub async fn refresh_tools(&mut self) -> &[ToolInfo] {
        let tools = match &self.tools {
            Some(transport) => match transport.list_tools().await {
                Ok(tools) => tools,
                Err(e) => {
                    warn!(error = %e, "Failed to list tools; continuing without tools");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        self.tool_cache.insert(tools)
    }

    /// Tools from the most recent listing.
    pub fn available_tools(&self) -> &[ToolInfo] {
        self.tool_cache.as_deref().unwrap_or_default()
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    /// A handle on the completed-turn count, shared with this agent.
    pub fn turn_counter(&self) -> TurnCounter {
        self.turns.clone()
    }

    /// Release the tool transport. Safe to call more than once.
    pub async fn close(&mut self) -> Result<(), AgentError> {
        self.tool_cache = None;
        if let Some(transport) = self.tools.take() {
            transport.close().await?;
            debug!("Tool transport closed");
        }
        Ok(())
    }

    /// Send `input` and stream every event until the run terminates.
    ///
    /// A completion failure is yielded as an `Error` event followed by
    /// `Err(AgentError::Completion)`, after which the stream ends.
    pub fn run(
        &mut self,
        input: impl Into<String>,
        abort: Option<AbortSignal>,
    ) -> impl Stream<Item = Result<AgentEvent, AgentError>> + '_ {
        let input = input.into();

        try_stream! {
            self.conversation.push(Message::user(input));
            let mut iteration = 0usize;

            loop {
                iteration += 1;

                if self.tools.is_some() && self.tool_cache.is_none() {
                    self.refresh_tools().await;
                }
                let schema = project_tools(self.available_tools());

                debug!(iteration, "Running turn");
                let mut solved = false;
                {
                    let processor = TurnProcessor::new(
                        self.provider.as_ref(),
                        &self.settings,
                        self.tools.as_deref(),
                        &schema,
                    );
                    let mut events = pin!(processor.process(&mut self.conversation));
                    while let Some(event) = events.next().await {
                        let event = event?;
                        solved |= event.signals_completion();
                        yield event;
                    }
                }
                self.turns.increment();

                if solved {
                    debug!(iteration, "Completion marker seen; stopping");
                    break;
                }

                let wants_tools = self
                    .conversation
                    .last_assistant()
                    .is_some_and(|m| !m.tool_calls.is_empty());
                if !wants_tools {
                    debug!(iteration, "Answer without tool calls; stopping");
                    break;
                }

                if abort.as_ref().is_some_and(AbortSignal::is_aborted) {
                    info!(iteration, "Run aborted");
                    yield AgentEvent::status(ABORTED_MESSAGE);
                    break;
                }
            }
        }
    }
}
