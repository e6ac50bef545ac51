//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod doctor;
mod search;
mod serve;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use search::run_search;
pub use serve::{router, run_serve, AppState};

use crate::config::Settings;

/// Apply command-line overrides on top of the loaded settings.
fn apply_overrides(settings: &mut Settings, top_k: Option<usize>, model: Option<String>) {
    if let Some(k) = top_k {
        settings.retrieval.top_k = k;
    }
    if let Some(model) = model {
        settings.generation.model = model;
    }
}
