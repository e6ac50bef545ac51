//! RAG (Retrieval-Augmented Generation) for question answering over indexed documents.
//!
//! Retrieval, prompt assembly and the generation call live here; the
//! orchestrator sequences them per question.

pub mod conversation;
pub mod generation;
pub mod prompt;
pub mod retriever;

pub use conversation::{ConversationState, Role, Turn};
pub use generation::{GenerationOutcome, Generator, HttpGenerator};
pub use prompt::assemble;
pub use retriever::{RetrievalResult, RetrievedPassage, Retriever};
