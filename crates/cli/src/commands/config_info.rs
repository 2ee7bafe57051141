//! `tinyagent config-info` — Summarize a configuration.

use std::fmt::Write;

use tinyagent_config::AgentConfig;

pub fn show(config: &AgentConfig) {
    print!("{}", summarize(config));
}

fn summarize(config: &AgentConfig) -> String {
    let mut out = String::new();
    let model = match config.completion.model.as_str() {
        "" => "Not specified",
        model => model,
    };
    let prompt = if config.system_prompt.is_some() {
        "Configured"
    } else {
        "Default"
    };

    // Writing into a String cannot fail.
    let _ = writeln!(out, "Configuration");
    let _ = writeln!(out, "=============");
    let _ = writeln!(out, "  Model:          {model}");
    let _ = writeln!(out, "  MCP servers:    {}", config.mcp_servers.len());
    let _ = writeln!(out, "  System prompt:  {prompt}");

    if !config.mcp_servers.is_empty() {
        let _ = writeln!(out, "\nMCP servers:");
        for (name, server) in &config.mcp_servers {
            let mut command = server.command.clone();
            for arg in &server.args {
                command.push(' ');
                command.push_str(arg);
            }
            let _ = writeln!(out, "  - {name}: {command}");
        }
    }

    if let Some(system_prompt) = &config.system_prompt {
        let _ = writeln!(out, "\nSystem prompt:");
        let _ = writeln!(out, "  - Type: {}", system_prompt.prompt_type);
        if system_prompt.custom_prompt.is_some() {
            let _ = writeln!(out, "  - Custom prompt configured");
        }
        if !system_prompt.variables.is_empty() {
            let keys: Vec<_> = system_prompt.variables.keys().map(String::as_str).collect();
            let _ = writeln!(out, "  - Variables: {}", keys.join(", "));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_summary() {
        let summary = summarize(&AgentConfig::default());
        assert!(summary.contains("Model:          Not specified"));
        assert!(summary.contains("MCP servers:    0"));
        assert!(summary.contains("System prompt:  Default"));
        assert!(!summary.contains("- Type"));
    }

    #[test]
    fn lists_servers_and_prompt() {
        let config = AgentConfig::from_yaml_str(
            r#"
litellm:
  model: openai/gpt-4o-mini
mcpServers:
  weather:
    command: python
    args: ["weather_server.py"]
system_prompt:
  type: default
  variables:
    tone: friendly
"#,
        )
        .unwrap();

        let summary = summarize(&config);
        assert!(summary.contains("Model:          openai/gpt-4o-mini"));
        assert!(summary.contains("MCP servers:    1"));
        assert!(summary.contains("  - weather: python weather_server.py"));
        assert!(summary.contains("  - Type: default"));
        assert!(summary.contains("  - Variables: tone"));
        assert!(!summary.contains("Custom prompt configured"));
    }
}
