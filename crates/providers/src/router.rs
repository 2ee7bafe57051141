//! Provider routing — selects the endpoint for a model from its prefix.
//!
//! Model identifiers look like `openai/gpt-4o-mini`, `ollama/llama3` or
//! `openrouter/anthropic/claude-3-haiku`. The prefix picks the base URL; an
//! explicit `api_base` in the settings always wins.

use std::sync::Arc;

use tinyagent_config::CompletionSettings;
use tinyagent_core::error::ProviderError;
use tinyagent_core::provider::Provider;
use tracing::debug;

use crate::openai_compat::{
    OLLAMA_BASE_URL, OPENAI_BASE_URL, OPENROUTER_BASE_URL, OpenAiCompatProvider,
};

/// Where a model's requests go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Provider name used in logs
    pub provider: String,
    pub base_url: String,
    /// Model name as the endpoint expects it
    pub model: String,
    /// Whether the endpoint needs an API key
    pub requires_key: bool,
}

/// Resolve the route for a model string.
pub fn resolve(model: &str, api_base: Option<&str>) -> Result<Route, ProviderError> {
    let (prefix, rest) = match model.split_once('/') {
        Some((prefix, rest)) => (Some(prefix), rest),
        None => (None, model),
    };

    if let Some(base) = api_base.filter(|b| !b.is_empty()) {
        // Custom endpoint: LiteLLM-style proxies expect the bare model name
        // unless the prefix is a routed id (openrouter).
        let model = match prefix {
            Some("openrouter") | None => model.to_string(),
            Some(_) => rest.to_string(),
        };
        return Ok(Route {
            provider: prefix.unwrap_or("custom").to_string(),
            base_url: base.to_string(),
            model,
            requires_key: prefix != Some("ollama"),
        });
    }

    let route = match prefix {
        None => Route {
            provider: "openai".into(),
            base_url: OPENAI_BASE_URL.into(),
            model: model.to_string(),
            requires_key: true,
        },
        Some("openai") => Route {
            provider: "openai".into(),
            base_url: OPENAI_BASE_URL.into(),
            model: rest.to_string(),
            requires_key: true,
        },
        Some("openrouter") => Route {
            provider: "openrouter".into(),
            base_url: OPENROUTER_BASE_URL.into(),
            model: rest.to_string(),
            requires_key: true,
        },
        Some("ollama") => Route {
            provider: "ollama".into(),
            base_url: OLLAMA_BASE_URL.into(),
            model: rest.to_string(),
            requires_key: false,
        },
        Some(other) => {
            return Err(ProviderError::NotConfigured(format!(
                "no endpoint known for '{other}' models; set completion.api_base"
            )));
        }
    };

    Ok(route)
}

/// Build the completion transport described by the settings.
pub fn build_from_settings(
    settings: &CompletionSettings,
) -> Result<(Arc<dyn Provider>, String), ProviderError> {
    let route = resolve(&settings.model, settings.api_base.as_deref())?;

    let api_key = match settings.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => key.to_string(),
        None if route.requires_key => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for {} (set completion.api_key or the provider's environment variable)",
                route.provider
            )));
        }
        None => route.provider.clone(),
    };

    debug!(provider = %route.provider, base_url = %route.base_url, model = %route.model, "Resolved completion route");

    let provider = OpenAiCompatProvider::new(&route.provider, &route.base_url, api_key);
    Ok((Arc::new(provider), route.model))
}
