//! Assembles streamed tool-call fragments into complete calls.
//!
//! A call's id and name usually arrive on its first fragment; the argument
//! document follows as substrings, often on fragments with no id at all.
//! Those are folded into the most recently opened call.

use std::collections::HashMap;

use tinyagent_core::message::{FunctionCall, ToolCall};
use tinyagent_core::provider::ToolCallDelta;
use tracing::trace;

#[derive(Debug)]
struct PendingCall {
    id: String,
    kind: String,
    name: String,
    arguments: String,
}

/// Builds tool calls from fragments for one turn.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: Vec<PendingCall>,
    index: HashMap<String, usize>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one fragment.
    pub fn ingest(&mut self, fragment: &ToolCallDelta) {
        let id = fragment.id.as_deref().filter(|id| !id.is_empty());

        let slot = match id {
            Some(id) => match self.index.get(id) {
                Some(&slot) => slot,
                None => {
                    self.calls.push(PendingCall {
                        id: id.to_string(),
                        kind: fragment
                            .kind
                            .clone()
                            .filter(|k| !k.is_empty())
                            .unwrap_or_else(|| "function".to_string()),
                        name: String::new(),
                        arguments: String::new(),
                    });
                    let slot = self.calls.len() - 1;
                    self.index.insert(id.to_string(), slot);
                    slot
                }
            },
            None => match self.calls.len().checked_sub(1) {
                Some(last) => last,
                None => {
                    trace!("Dropping tool-call fragment with no call to attach to");
                    return;
                }
            },
        };

        let call = &mut self.calls[slot];
        if let Some(name) = fragment.name.as_deref().filter(|n| !n.is_empty()) {
            call.name = name.to_string();
        }
        if let Some(piece) = fragment.arguments.as_deref() {
            call.arguments.push_str(piece);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// The assembled calls in the order they were first seen.
    pub fn finalize(self) -> Vec<ToolCall> {
        self.calls
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                kind: call.kind,
                function: FunctionCall {
                    name: call.name,
                    arguments: call.arguments,
                },
            })
            .collect()
    }
}
