//! Configuration module for Rapport.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    EmbeddingProvider, EmbeddingSettings, GeneralSettings, GenerationSettings, IndexSettings,
    PassageSettings, PromptSettings, RetrievalSettings, Settings,
};
