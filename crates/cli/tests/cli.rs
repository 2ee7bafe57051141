//! Tests that drive the `tinyagent` binary.

use std::path::Path;
use std::process::{Command, Output};

fn tinyagent(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tinyagent"))
        .args(args)
        .env_remove("TINYAGENT_CONFIG")
        .env_remove("TINYAGENT_MODEL")
        .env_remove("OPENAI_API_KEY")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to spawn tinyagent")
}

fn write_config(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.display().to_string()
}

#[test]
fn config_info_summarizes_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "agent.yaml",
        r#"
litellm:
  model: openai/gpt-4o-mini
mcpServers:
  weather:
    command: python
    args: ["weather_server.py"]
"#,
    );

    let output = tinyagent(&["config-info", "-c", &path]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("openai/gpt-4o-mini"));
    assert!(stdout.contains("weather: python weather_server.py"));
    assert!(stdout.contains("System prompt:  Default"));
}

#[test]
fn config_info_reads_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "agent.toml",
        r#"
[completion]
model = "ollama/llama3"
"#,
    );

    let output = tinyagent(&["config-info", "-c", &path]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("ollama/llama3"));
}

#[test]
fn missing_config_file_fails() {
    let output = tinyagent(&["config-info", "-c", "/nonexistent/agent.yaml"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("file not found"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "agent.yaml",
        "litellm:\n  model: openai/gpt-4o-mini\n  temperature: 5.0\n",
    );

    let output = tinyagent(&["config-info", "-c", &path]);
    assert!(!output.status.success());
}

#[test]
fn run_without_api_key_fails_before_streaming() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "agent.yaml", "litellm:\n  model: openai/gpt-4o-mini\n");

    let output = tinyagent(&["run", "-q", "hello", "-c", &path]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
