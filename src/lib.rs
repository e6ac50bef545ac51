//! Rapport - Grounded question answering over indexed documents
//!
//! A CLI tool and library that answers questions from a pre-built document
//! index, keeping a multi-turn conversation and citing the passages it used.
//!
//! # Overview
//!
//! Rapport:
//! - Loads a vector index and its passage metadata built by an external indexer
//! - Encodes questions and retrieves the closest passages
//! - Sends the conversation plus retrieved context to a chat completions service
//! - Records every exchange, including failures, in the session history
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `embedding` - Query encoders (local hashing or OpenAI-compatible endpoint)
//! - `vector_index` - Nearest-neighbour search over the index artifact
//! - `passages` - Passage metadata keyed by vector id
//! - `rag` - Retrieval, prompt assembly, conversation state and generation
//! - `orchestrator` - Per-question pipeline and sessions
//!
//! # Example
//!
//! ```rust,no_run
//! use rapport::config::Settings;
//! use rapport::orchestrator::Orchestrator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Arc::new(Orchestrator::new(settings)?);
//!
//!     let mut session = orchestrator.session();
//!     let reply = session.submit("What is the notice period?").await;
//!     println!("{}", reply.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod passages;
pub mod rag;
pub mod vector_index;

pub use error::{RapportError, Result};
