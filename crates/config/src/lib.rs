//! Configuration loading, validation, and system prompt resolution for tinyagent.
//!
//! A config file is YAML (`.yaml`/`.yml`) or TOML (`.toml`) with three
//! sections: `completion` (alias `litellm`), `mcpServers`, and `system_prompt`.
//! API keys can come from the environment. Everything is validated at load
//! time so a bad config fails before the first turn.

pub mod templates;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Completion transport parameters
    #[serde(default, alias = "litellm")]
    pub completion: CompletionSettings,

    /// Tool servers, keyed by server name
    #[serde(default, rename = "mcpServers", alias = "mcp_servers")]
    pub mcp_servers: BTreeMap<String, McpServerConfig>,

    /// System prompt selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<SystemPromptConfig>,

    #[serde(skip)]
    resolved_system_prompt: Option<String>,
}

/// Parameters for the completion transport.
///
/// Known keys are typed. Any other key is kept in `extra` and forwarded
/// verbatim into the completion request body, so provider-specific options
/// (`top_p`, `seed`, `response_format`, ...) need no code change.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CompletionSettings {
    /// Model identifier, optionally prefixed with a routing hint ("openai/gpt-4o-mini")
    #[serde(default)]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[serde(default, alias = "base_url", skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Unrecognized provider parameters
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// How to start one tool server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Executable to spawn
    pub command: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Extra environment variables for the server process
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Working directory for the server process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

/// Which system prompt to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemPromptConfig {
    /// Name of a built-in template
    #[serde(rename = "type", default = "default_prompt_type")]
    pub prompt_type: String,

    /// Literal prompt text; takes precedence over the template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,

    /// Values for `{name}` placeholders
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
}

fn default_prompt_type() -> String {
    "default".into()
}

impl Default for SystemPromptConfig {
    fn default() -> Self {
        Self {
            prompt_type: default_prompt_type(),
            custom_prompt: None,
            variables: BTreeMap::new(),
        }
    }
}

/// Model used when no config file is given.
pub const FALLBACK_MODEL: &str = "openai/gpt-3.5-turbo";

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for CompletionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionSettings")
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("api_base", &self.api_base)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("extra", &self.extra)
            .finish()
    }
}

impl CompletionSettings {
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }
}

impl AgentConfig {
    /// A configuration with only completion settings and no tool servers.
    pub fn for_completion(completion: CompletionSettings) -> Self {
        Self {
            completion,
            ..Self::default()
        }
    }

    /// Load configuration from a YAML or TOML file.
    ///
    /// Environment overrides are applied, then the result is validated and
    /// the system prompt resolved.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                reason: "file not found".into(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;

        let config = Self::parse(&content, format).map_err(|reason| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason,
        })?;

        tracing::debug!(path = %path.display(), "Loaded configuration file");
        config.prepare_with_env(|key| std::env::var(key).ok())
    }

    /// Parse and prepare a YAML document, using the process environment.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, ConfigFormat::Yaml)
            .map_err(|reason| ConfigError::ParseError {
                path: PathBuf::from("<inline>"),
                reason,
            })?
            .prepare_with_env(|key| std::env::var(key).ok())
    }

    /// Parse and prepare a TOML document, using the process environment.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, ConfigFormat::Toml)
            .map_err(|reason| ConfigError::ParseError {
                path: PathBuf::from("<inline>"),
                reason,
            })?
            .prepare_with_env(|key| std::env::var(key).ok())
    }

    /// The configuration used when no file is given.
    pub fn default_for_cli() -> Result<Self, ConfigError> {
        let config = Self {
            completion: CompletionSettings::for_model(FALLBACK_MODEL),
            ..Self::default()
        };
        config.prepare_with_env(|key| std::env::var(key).ok())
    }

    fn parse(content: &str, format: ConfigFormat) -> Result<Self, String> {
        // An empty document means "all defaults".
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }

    /// Apply environment overrides from `lookup`, validate, and resolve the
    /// system prompt.
    pub fn prepare_with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.apply_env_overrides(&lookup);
        self.validate()?;
        self.resolved_system_prompt = self.resolve_system_prompt();
        Ok(self)
    }

    /// Environment overrides for the model and API key.
    ///
    /// - `TINYAGENT_MODEL` replaces the model
    /// - `openai*` models read `OPENAI_API_KEY`, `anthropic*` models read
    ///   `ANTHROPIC_API_KEY`; a key found in the environment wins over the file
    /// - with no model at all, the first of those two keys that is set is used
    fn apply_env_overrides<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("TINYAGENT_MODEL").filter(|m| !m.is_empty()) {
            self.completion.model = model;
        }

        let model = self.completion.model.as_str();
        let key = if model.is_empty() {
            lookup("OPENAI_API_KEY").or_else(|| lookup("ANTHROPIC_API_KEY"))
        } else if model.starts_with("openai") {
            lookup("OPENAI_API_KEY")
        } else if model.starts_with("anthropic") {
            lookup("ANTHROPIC_API_KEY")
        } else {
            None
        };

        if let Some(key) = key.filter(|k| !k.is_empty()) {
            self.completion.api_key = Some(key);
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.completion.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "completion.model is required".into(),
            ));
        }

        if let Some(temperature) = self.completion.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::ValidationError(
                    "completion.temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        for (name, server) in &self.mcp_servers {
            if server.command.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "mcpServers.{name}.command must not be empty"
                )));
            }
        }

        if let Some(prompt) = &self.system_prompt {
            if templates::lookup(&prompt.prompt_type).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid prompt type '{}'. Available types: {:?}",
                    prompt.prompt_type,
                    templates::available()
                )));
            }
        }

        Ok(())
    }

    fn resolve_system_prompt(&self) -> Option<String> {
        let prompt = self.system_prompt.as_ref()?;

        let text = match prompt.custom_prompt.as_deref().filter(|p| !p.is_empty()) {
            Some(custom) => custom,
            None => templates::lookup(&prompt.prompt_type)?.system_prompt,
        };

        Some(templates::apply_variables(text, &prompt.variables))
    }

    /// The system prompt text after template selection and variable
    /// substitution, if a system prompt is configured.
    pub fn resolved_system_prompt(&self) -> Option<&str> {
        self.resolved_system_prompt.as_deref()
    }
}

/// Supported config file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Unsupported config format for {0} (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn parse_yaml(content: &str) -> AgentConfig {
        AgentConfig::parse(content, ConfigFormat::Yaml).unwrap()
    }

    #[test]
    fn yaml_with_litellm_alias_and_mcp_servers() {
        let config = parse_yaml(
            r#"
litellm:
  model: openai/gpt-4o-mini
  api_key: sk-file
  temperature: 0.2
  top_p: 0.9
mcpServers:
  weather:
    command: python
    args: ["-m", "weather_server"]
    env:
      UNITS: metric
"#,
        )
        .prepare_with_env(no_env)
        .unwrap();

        assert_eq!(config.completion.model, "openai/gpt-4o-mini");
        assert_eq!(config.completion.api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.completion.temperature, Some(0.2));
        assert_eq!(config.completion.extra["top_p"], serde_json::json!(0.9));

        let weather = &config.mcp_servers["weather"];
        assert_eq!(weather.command, "python");
        assert_eq!(weather.args, vec!["-m", "weather_server"]);
        assert_eq!(weather.env["UNITS"], "metric");
    }

    #[test]
    fn toml_config_parses() {
        let config: AgentConfig = toml::from_str(
            r#"
[completion]
model = "ollama/llama3"

[mcpServers.files]
command = "mcp-files"
"#,
        )
        .unwrap();
        let config = config.prepare_with_env(no_env).unwrap();
        assert_eq!(config.completion.model, "ollama/llama3");
        assert_eq!(config.mcp_servers["files"].command, "mcp-files");
    }

    #[test]
    fn openai_key_from_env_overrides_file() {
        let config = parse_yaml("completion:\n  model: openai/gpt-4\n  api_key: sk-file\n")
            .prepare_with_env(|key| match key {
                "OPENAI_API_KEY" => Some("sk-env".into()),
                "ANTHROPIC_API_KEY" => Some("sk-ant".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.completion.api_key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn anthropic_model_reads_anthropic_key() {
        let config = parse_yaml("completion:\n  model: anthropic/claude-3-haiku\n")
            .prepare_with_env(|key| match key {
                "OPENAI_API_KEY" => Some("sk-openai".into()),
                "ANTHROPIC_API_KEY" => Some("sk-ant".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.completion.api_key.as_deref(), Some("sk-ant"));
    }

    #[test]
    fn other_models_ignore_env_keys() {
        let config = parse_yaml("completion:\n  model: ollama/llama3\n")
            .prepare_with_env(|key| match key {
                "OPENAI_API_KEY" => Some("sk-openai".into()),
                _ => None,
            })
            .unwrap();
        assert!(config.completion.api_key.is_none());
    }

    #[test]
    fn model_env_override() {
        let config = parse_yaml("completion:\n  model: openai/gpt-4\n")
            .prepare_with_env(|key| match key {
                "TINYAGENT_MODEL" => Some("ollama/qwen2".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.completion.model, "ollama/qwen2");
    }

    #[test]
    fn missing_model_is_fatal() {
        let err = AgentConfig::default().prepare_with_env(no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("completion.model"));
    }

    #[test]
    fn invalid_temperature_rejected() {
        let err = parse_yaml("completion:\n  model: gpt-4\n  temperature: 5.0\n")
            .prepare_with_env(no_env)
            .unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn empty_server_command_rejected() {
        let err = parse_yaml("completion:\n  model: gpt-4\nmcpServers:\n  broken:\n    command: \"\"\n")
            .prepare_with_env(no_env)
            .unwrap_err();
        assert!(err.to_string().contains("mcpServers.broken.command"));
    }

    #[test]
    fn unknown_prompt_type_lists_available_types() {
        let err = parse_yaml("completion:\n  model: gpt-4\nsystem_prompt:\n  type: pirate\n")
            .prepare_with_env(no_env)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Invalid prompt type 'pirate'"));
        assert!(message.contains("default"));
    }

    #[test]
    fn template_prompt_resolves_with_variables() {
        let config = parse_yaml(
            "completion:\n  model: gpt-4\nsystem_prompt:\n  type: default\n",
        )
        .prepare_with_env(no_env)
        .unwrap();
        let prompt = config.resolved_system_prompt().unwrap();
        assert_eq!(prompt, templates::lookup("default").unwrap().system_prompt);
    }

    #[test]
    fn custom_prompt_wins_over_template() {
        let config = parse_yaml(
            r#"
completion:
  model: gpt-4
system_prompt:
  custom_prompt: "You are {name}, expert in {domain}."
  variables:
    name: Ferris
    domain: ownership
"#,
        )
        .prepare_with_env(no_env)
        .unwrap();
        assert_eq!(
            config.resolved_system_prompt(),
            Some("You are Ferris, expert in ownership.")
        );
    }

    #[test]
    fn no_system_prompt_section_resolves_to_none() {
        let config = parse_yaml("completion:\n  model: gpt-4\n")
            .prepare_with_env(no_env)
            .unwrap();
        assert!(config.resolved_system_prompt().is_none());
    }

    #[test]
    fn empty_document_means_defaults() {
        let config = AgentConfig::parse("   \n", ConfigFormat::Yaml).unwrap();
        assert!(config.completion.model.is_empty());
        assert!(config.mcp_servers.is_empty());
    }

    #[test]
    fn format_detection() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), None);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = AgentConfig::load_from(Path::new("/nonexistent/tinyagent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "completion: [unclosed").unwrap();
        let err = AgentConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn unsupported_extension_rejected() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, "{{}}").unwrap();
        let err = AgentConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn load_from_file_uses_model_prefix_free_of_env() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "completion:\n  model: ollama/llama3\n  api_base: http://localhost:11434/v1").unwrap();
        let config = AgentConfig::load_from(file.path()).unwrap();
        assert_eq!(config.completion.model, "ollama/llama3");
        assert_eq!(
            config.completion.api_base.as_deref(),
            Some("http://localhost:11434/v1")
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        let settings = CompletionSettings {
            api_key: Some("sk-secret".into()),
            ..CompletionSettings::for_model("gpt-4")
        };
        let debug = format!("{settings:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
