//! Completion transport implementations for tinyagent.
//!
//! All providers implement the `tinyagent_core::Provider` trait.
//! The router picks the endpoint from the configured model.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{Route, build_from_settings};
