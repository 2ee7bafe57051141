//! tinyagent CLI — the main entry point.
//!
//! Commands:
//! - `run`          — Answer one query, or chat interactively without `-q`
//! - `interactive`  — Chat interactively
//! - `config-info`  — Summarize a configuration file

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "tinyagent",
    about = "tinyagent — a streaming LLM agent with MCP tool support",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a query to the agent (interactive mode when no query is given)
    Run {
        /// The query to send
        #[arg(short, long)]
        query: Option<String>,

        /// Path to a YAML or TOML configuration file
        #[arg(short, long, env = "TINYAGENT_CONFIG")]
        config: Option<PathBuf>,

        /// Stop after this many turns per query
        #[arg(long)]
        max_turns: Option<NonZeroUsize>,
    },

    /// Start interactive mode
    Interactive {
        /// Path to a YAML or TOML configuration file
        #[arg(short, long, env = "TINYAGENT_CONFIG")]
        config: Option<PathBuf>,

        /// Stop after this many turns per query
        #[arg(long)]
        max_turns: Option<NonZeroUsize>,
    },

    /// Show configuration information
    ConfigInfo {
        /// Path to a YAML or TOML configuration file
        #[arg(short, long, env = "TINYAGENT_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with streamed answers.
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            query,
            config,
            max_turns,
        } => {
            let config = commands::load_config(config.as_deref())?;
            let max_turns = max_turns.map(NonZeroUsize::get);
            match query {
                Some(query) => commands::run::single(&config, &query, max_turns).await?,
                None => commands::run::interactive(&config, max_turns).await?,
            }
        }
        Commands::Interactive { config, max_turns } => {
            let config = commands::load_config(config.as_deref())?;
            commands::run::interactive(&config, max_turns.map(NonZeroUsize::get)).await?
        }
        Commands::ConfigInfo { config } => {
            let config = commands::load_config(config.as_deref())?;
            commands::config_info::show(&config)
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_query_and_config() {
        let cli = Cli::try_parse_from([
            "tinyagent", "run", "-q", "What's the weather?", "-c", "agent.yaml", "--max-turns", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                query,
                config,
                max_turns,
            } => {
                assert_eq!(query.as_deref(), Some("What's the weather?"));
                assert_eq!(config, Some(PathBuf::from("agent.yaml")));
                assert_eq!(max_turns.map(NonZeroUsize::get), Some(3));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn config_info_subcommand_name() {
        let cli = Cli::try_parse_from(["tinyagent", "config-info"]).unwrap();
        assert!(matches!(cli.command, Commands::ConfigInfo { .. }));
    }

    #[test]
    fn max_turns_must_be_positive() {
        assert!(Cli::try_parse_from(["tinyagent", "run", "-q", "hi", "--max-turns", "0"]).is_err());
        assert!(Cli::try_parse_from(["tinyagent", "interactive", "--max-turns", "0"]).is_err());
        assert!(Cli::try_parse_from(["tinyagent", "interactive", "--max-turns", "1"]).is_ok());
    }
}
