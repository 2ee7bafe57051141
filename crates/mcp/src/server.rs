//! One MCP server over stdio.
//!
//! Messages are newline-delimited JSON-RPC 2.0. Requests are issued one at a
//! time: the session writes a request, then reads lines until the matching
//! response arrives, skipping notifications and server-initiated requests.

use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tinyagent_config::McpServerConfig;
use tinyagent_core::tool::ToolInfo;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use crate::error::McpError;
use crate::protocol::{
    CallToolResult, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, ListToolsResult,
    initialize_params,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A JSON-RPC session over any line-oriented byte pipe.
pub struct McpSession<W, R> {
    writer: W,
    reader: R,
    next_id: u64,
    timeout: Duration,
}

impl<W, R> McpSession<W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    pub fn new(writer: W, reader: R) -> Self {
        Self {
            writer,
            reader,
            next_id: 1,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn write_line(&mut self, message: &impl Serialize) -> Result<(), McpError> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Send a request and wait for its result.
    pub async fn request(&mut self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_id;
        self.next_id += 1;

        trace!(id, method, "Sending request");
        self.write_line(&JsonRpcRequest::new(id, method, params)).await?;

        let timeout = self.timeout;
        tokio::time::timeout(timeout, self.read_response(id))
            .await
            .map_err(|_| McpError::Timeout {
                method: method.to_string(),
                secs: timeout.as_secs(),
            })?
    }

    async fn read_response(&mut self, id: u64) -> Result<Value, McpError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(McpError::Closed);
            }

            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            let message: JsonRpcMessage = match serde_json::from_str(text) {
                Ok(m) => m,
                Err(e) => {
                    trace!(error = %e, line = %text, "Skipping non-JSON-RPC output");
                    continue;
                }
            };

            if !message.answers(id) {
                trace!(method = ?message.method, "Skipping unrelated message");
                continue;
            }

            if let Some(error) = message.error {
                return Err(McpError::Rpc {
                    code: error.code,
                    message: error.message,
                });
            }
            return Ok(message.result.unwrap_or(Value::Null));
        }
    }

    pub async fn notify(&mut self, method: &str) -> Result<(), McpError> {
        self.write_line(&JsonRpcNotification::new(method)).await
    }

    /// `initialize` handshake followed by `notifications/initialized`.
    pub async fn initialize(&mut self) -> Result<Value, McpError> {
        let result = self.request("initialize", Some(initialize_params())).await?;
        self.notify("notifications/initialized").await?;
        Ok(result)
    }

    /// Every tool the server offers, following pagination cursors.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.take().map(|c| serde_json::json!({ "cursor": c }));
            let page: ListToolsResult = serde_json::from_value(self.request("tools/list", params).await?)?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }
    }

    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        let params = serde_json::json!({ "name": name, "arguments": arguments });
        let result = self.request("tools/call", Some(params)).await?;
        Ok(serde_json::from_value(result)?)
    }
}

type StdioSession = McpSession<ChildStdin, BufReader<ChildStdout>>;

/// A spawned MCP server process.
///
/// The child is spawned with `kill_on_drop`, so dropping the server always
/// terminates the process.
pub struct McpServer {
    name: String,
    session: Mutex<StdioSession>,
    child: Mutex<Option<Child>>,
}

impl McpServer {
    /// Spawn the server process and complete the handshake.
    pub async fn spawn(name: &str, config: &McpServerConfig) -> Result<Self, McpError> {
        let spawn_error = |reason: String| McpError::Spawn {
            server: name.to_string(),
            reason,
        };

        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &config.cwd {
            command.current_dir(cwd);
        }

        let mut child = command
            .spawn()
            .map_err(|e| spawn_error(format!("{}: {e}", config.command)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_error("stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error("stdout not captured".into()))?;

        // Server logs go to tracing instead of the terminal.
        if let Some(stderr) = child.stderr.take() {
            let server = name.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(server = %server, "{line}");
                }
            });
        }

        let mut session = McpSession::new(stdin, BufReader::new(stdout));
        session
            .initialize()
            .await
            .map_err(|e| spawn_error(format!("initialize failed: {e}")))?;

        info!(server = %name, command = %config.command, "Tool server connected");

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
            child: Mutex::new(Some(child)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolInfo>, McpError> {
        self.session.lock().await.list_tools().await
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        self.session.lock().await.call_tool(name, arguments).await
    }

    /// Kill the server process. Later calls are no-ops.
    pub async fn shutdown(&self) {
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                warn!(server = %self.name, error = %e, "Failed to kill tool server");
            } else {
                debug!(server = %self.name, "Tool server stopped");
            }
        }
    }
}
