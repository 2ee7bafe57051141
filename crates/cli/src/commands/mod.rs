//! CLI subcommands.

pub mod config_info;
pub mod run;

use std::path::Path;

use tinyagent_config::AgentConfig;

/// Load the configuration file, or the built-in defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<AgentConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AgentConfig::load_from(path)?,
        None => AgentConfig::default_for_cli()?,
    };
    Ok(config)
}
