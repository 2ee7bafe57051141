//! `tinyagent run` / `tinyagent interactive` — stream answers to the terminal.

use std::io::Write;

use futures::StreamExt;
use tinyagent_agent::{AbortSignal, Agent, AgentEvent};
use tinyagent_config::AgentConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Answer a single query, then exit.
pub async fn single(
    config: &AgentConfig,
    query: &str,
    max_turns: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut agent = Agent::connect(config).await?;
    let abort = AbortSignal::new();
    watch_ctrl_c(abort.clone());

    let outcome = ask(&mut agent, query, &abort, max_turns).await;
    agent.close().await?;
    outcome
}

/// Read queries from stdin until `exit`, `quit`, `q` or end of input.
pub async fn interactive(
    config: &AgentConfig,
    max_turns: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut agent = Agent::connect(config).await?;
    let abort = AbortSignal::new();
    watch_ctrl_c(abort.clone());

    eprintln!();
    eprintln!("  tinyagent interactive mode");
    eprintln!("  Model: {}", config.completion.model);
    if !agent.available_tools().is_empty() {
        let names: Vec<_> = agent.available_tools().iter().map(|t| t.name.as_str()).collect();
        eprintln!("  Tools: {}", names.join(", "));
    }
    eprintln!("  Type 'exit' or 'quit' to leave.");
    eprintln!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("> ");
        std::io::stderr().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();

        if is_exit_command(query) {
            break;
        }
        if query.is_empty() {
            continue;
        }

        abort.reset();
        if let Err(e) = ask(&mut agent, query, &abort, max_turns).await {
            eprintln!("error: {e}");
        }
        println!();
    }

    eprintln!("Goodbye!");
    agent.close().await?;
    Ok(())
}

fn is_exit_command(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q")
}

/// First Ctrl-C stops the run after the current turn; a second one exits.
fn watch_ctrl_c(abort: AbortSignal) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if abort.is_aborted() {
                std::process::exit(130);
            }
            abort.abort();
            eprintln!("\n[stopping after the current turn; Ctrl-C again to quit]");
        }
    });
}

async fn ask(
    agent: &mut Agent,
    query: &str,
    abort: &AbortSignal,
    max_turns: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut renderer = Renderer::default();
    let turns = agent.turn_counter();
    let first_turn = turns.get();

    let mut events = std::pin::pin!(agent.run(query, Some(abort.clone())));
    while let Some(event) = events.next().await {
        let event = event?;

        // The loop checks the signal when the current turn ends, so setting
        // it during the last allowed turn stops the run right after it.
        let current_turn = turns.get() - first_turn + 1;
        if within_last_turn(current_turn, max_turns) && !abort.is_aborted() {
            debug!(turn = current_turn, "Turn limit reached");
            abort.abort();
        }

        renderer.render(&event)?;
    }

    renderer.finish()?;
    Ok(())
}

fn within_last_turn(current_turn: usize, max_turns: Option<usize>) -> bool {
    max_turns.is_some_and(|max| current_turn >= max)
}

/// Writes content to stdout as it streams and everything else to stderr.
#[derive(Debug)]
struct Renderer {
    at_line_start: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            at_line_start: true,
        }
    }
}

impl Renderer {
    fn render(&mut self, event: &AgentEvent) -> std::io::Result<()> {
        match event {
            AgentEvent::Content { content } => {
                let mut stdout = std::io::stdout();
                stdout.write_all(content.as_bytes())?;
                stdout.flush()?;
                if !content.is_empty() {
                    self.at_line_start = content.ends_with('\n');
                }
            }
            other => {
                self.finish()?;
                if let Some(line) = format_event(other) {
                    eprintln!("{line}");
                }
            }
        }
        Ok(())
    }

    /// End a partially written content line.
    fn finish(&mut self) -> std::io::Result<()> {
        if !self.at_line_start {
            let mut stdout = std::io::stdout();
            stdout.write_all(b"\n")?;
            stdout.flush()?;
            self.at_line_start = true;
        }
        Ok(())
    }
}

/// The stderr line for a non-content event.
fn format_event(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::Content { .. } => None,
        AgentEvent::ToolInput { name, arguments } => Some(format!("[tool] {name} {arguments}")),
        AgentEvent::ToolResult { name, .. } => Some(format!("[tool] {name} finished")),
        AgentEvent::ToolError { name, error } => Some(format!("[tool] {name} failed: {error}")),
        AgentEvent::Error { message } => Some(format!("[error] {message}")),
        AgentEvent::Status { message } => Some(format!("[status] {message}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_input(name: &str) -> AgentEvent {
        AgentEvent::ToolInput {
            name: name.into(),
            arguments: json!({"city": "Tokyo"}),
        }
    }

    #[test]
    fn exit_commands() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("QUIT"));
        assert!(is_exit_command("q"));
        assert!(!is_exit_command("question"));
        assert!(!is_exit_command(""));
    }

    #[test]
    fn tool_line_format() {
        assert_eq!(
            format_event(&tool_input("get_weather")).unwrap(),
            r#"[tool] get_weather {"city":"Tokyo"}"#
        );
        assert_eq!(
            format_event(&AgentEvent::status("processing was aborted")).unwrap(),
            "[status] processing was aborted"
        );
        assert!(format_event(&AgentEvent::content("hi")).is_none());
    }

    #[test]
    fn turn_limit() {
        assert!(!within_last_turn(1, None));
        assert!(!within_last_turn(1, Some(2)));
        assert!(within_last_turn(2, Some(2)));
        assert!(within_last_turn(3, Some(2)));
    }
}
