//! Built-in system prompt templates.
//!
//! A config selects a template by `system_prompt.type`; `{name}` placeholders
//! in the template are filled from `system_prompt.variables`.

use std::collections::BTreeMap;

/// A named system prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub system_prompt: &'static str,
}

const DEFAULT_TEMPLATE: PromptTemplate = PromptTemplate {
    name: "default",
    description: "General problem-solving assistant",
    system_prompt: "You are a helpful assistant. Solve the user's problem step by step, \
calling the available tools whenever they help. \
When the problem is solved, say that you are done.",
};

static TEMPLATES: &[PromptTemplate] = &[DEFAULT_TEMPLATE];

/// Look up a template by name.
pub fn lookup(name: &str) -> Option<&'static PromptTemplate> {
    TEMPLATES.iter().find(|t| t.name == name)
}

/// Names of every registered template, in registration order.
pub fn available() -> Vec<&'static str> {
    TEMPLATES.iter().map(|t| t.name).collect()
}

/// Replace each `{key}` in `template` with its value.
///
/// Placeholders without a matching variable are left untouched.
pub fn apply_variables(template: &str, variables: &BTreeMap<String, String>) -> String {
    variables
        .iter()
        .fold(template.to_string(), |text, (key, value)| {
            text.replace(&format!("{{{key}}}"), value)
        })
}
