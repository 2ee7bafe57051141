//! Multi-server MCP client.
//!
//! With a single server, tool names are used as-is. With several, each tool
//! is exposed as `<server>_<tool>` and calls are routed back to the owning
//! server by that name.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tinyagent_config::McpServerConfig;
use tinyagent_core::error::ToolError;
use tinyagent_core::tool::{ToolInfo, ToolTransport};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::McpError;
use crate::protocol::CallToolResult;
use crate::server::McpServer;

/// Where an advertised tool name is served.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Route {
    server: usize,
    tool: String,
}

/// Exposed tool name to owning server.
#[derive(Debug, Default)]
struct RouteTable {
    routes: HashMap<String, Route>,
}

impl RouteTable {
    /// Build the table from one listing per server, in server order.
    ///
    /// Returns the tools renamed to their exposed names.
    fn from_listings(listings: Vec<(&str, Vec<ToolInfo>)>) -> (Self, Vec<ToolInfo>) {
        let prefixed = listings.len() > 1;
        let mut routes = HashMap::new();
        let mut tools = Vec::new();

        for (index, (server, listed)) in listings.into_iter().enumerate() {
            for mut tool in listed {
                let exposed = if prefixed {
                    format!("{}_{}", server, tool.name)
                } else {
                    tool.name.clone()
                };
                routes.insert(
                    exposed.clone(),
                    Route {
                        server: index,
                        tool: std::mem::replace(&mut tool.name, exposed),
                    },
                );
                tools.push(tool);
            }
        }

        (Self { routes }, tools)
    }

    fn get(&self, name: &str) -> Option<&Route> {
        self.routes.get(name)
    }
}

/// Look `name` up, refreshing the table once on a miss.
async fn lookup_or_refresh<F, Fut>(
    table: &RwLock<RouteTable>,
    name: &str,
    refresh: F,
) -> Result<Route, ToolError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), ToolError>>,
{
    if let Some(route) = table.read().await.get(name) {
        return Ok(route.clone());
    }

    refresh().await?;
    table
        .read()
        .await
        .get(name)
        .cloned()
        .ok_or_else(|| ToolError::NotFound(name.to_string()))
}

pub struct McpClient {
    servers: Vec<McpServer>,
    routes: RwLock<RouteTable>,
}

impl McpClient {
    /// Spawn and initialize every configured server.
    ///
    /// If any server fails to start, the ones already started are shut down
    /// and the error is returned.
    pub async fn connect(configs: &BTreeMap<String, McpServerConfig>) -> Result<Self, McpError> {
        let mut servers = Vec::with_capacity(configs.len());

        for (name, config) in configs {
            match McpServer::spawn(name, config).await {
                Ok(server) => servers.push(server),
                Err(e) => {
                    for server in &servers {
                        server.shutdown().await;
                    }
                    return Err(e);
                }
            }
        }

        Ok(Self {
            servers,
            routes: RwLock::new(RouteTable::default()),
        })
    }

    pub fn server_names(&self) -> Vec<&str> {
        self.servers.iter().map(McpServer::name).collect()
    }

    async fn route(&self, name: &str) -> Result<Route, ToolError> {
        lookup_or_refresh(&self.routes, name, || async {
            self.list_tools().await.map(|_| ())
        })
        .await
    }
}

/// The value handed back to the agent for a successful call.
fn call_result_value(result: CallToolResult) -> Value {
    Value::Array(result.content)
}

#[async_trait]
impl ToolTransport for McpClient {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, ToolError> {
        let mut listings = Vec::with_capacity(self.servers.len());

        for server in &self.servers {
            let listed = server
                .list_tools()
                .await
                .map_err(|e| e.into_tool_error(server.name(), "tools/list"))?;

            debug!(server = %server.name(), count = listed.len(), "Listed tools");
            listings.push((server.name(), listed));
        }

        let (table, tools) = RouteTable::from_listings(listings);
        *self.routes.write().await = table;
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let route = self.route(name).await?;
        let server = self
            .servers
            .get(route.server)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        debug!(server = %server.name(), tool = %route.tool, "Calling tool");

        let result = server
            .call_tool(&route.tool, arguments)
            .await
            .map_err(|e| e.into_tool_error(server.name(), name))?;

        if result.is_error {
            let reason = result.text();
            warn!(tool = %name, reason = %reason, "Tool reported an error");
            return Err(ToolError::ExecutionFailed {
                tool_name: name.to_string(),
                reason,
            });
        }

        Ok(call_result_value(result))
    }

    async fn close(&self) -> Result<(), ToolError> {
        for server in &self.servers {
            server.shutdown().await;
        }
        Ok(())
    }
}
