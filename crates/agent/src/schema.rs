//! Projection of advertised tools into the function-calling schema.

use serde_json::json;
use tinyagent_core::tool::{FunctionSchema, ToolInfo, ToolSchema};

/// Convert tool listings into the schema sent with each completion request.
pub fn project_tools(tools: &[ToolInfo]) -> Vec<ToolSchema> {
    tools.iter().map(project_tool).collect()
}

fn project_tool(tool: &ToolInfo) -> ToolSchema {
    ToolSchema {
        kind: "function".to_string(),
        function: FunctionSchema {
            name: tool.name.clone(),
            description: tool
                .description
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| format!("Execute {} tool", tool.name)),
            parameters: tool
                .input_schema
                .clone()
                .unwrap_or_else(|| json!({"type": "object", "properties": {}, "required": []})),
        },
    }
}
