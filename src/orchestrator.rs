//! Pipeline orchestrator for Rapport.
//!
//! [`Orchestrator`] holds everything loaded once at startup (encoder, index,
//! passages, generation client) and is shared read-only. Each conversation is
//! a [`Session`] owning its own history; a question runs through
//! retrieve → assemble → generate → record before the next one starts.

use crate::config::{Prompts, Settings};
use crate::embedding::create_embedder;
use crate::error::{RapportError, Result};
use crate::passages::PassageStore;
use crate::rag::{
    assemble, ConversationState, GenerationOutcome, Generator, HttpGenerator, RetrievedPassage,
    Retriever, Turn,
};
use crate::vector_index::load_sqlite;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Shared, read-only pipeline components.
pub struct Orchestrator {
    settings: Settings,
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    directive: Option<String>,
    no_context_answer: String,
}

impl Orchestrator {
    /// Load artifacts, build the encoder and generation client.
    ///
    /// Any failure here is a configuration error: no query may be served.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let retriever = Self::load_retriever(&settings)?;
        let generator: Arc<dyn Generator> =
            Arc::new(HttpGenerator::from_settings(&settings.generation)?);

        info!(
            "Generation via {} ({})",
            settings.generation.api_url, settings.generation.model
        );

        Self::with_components(settings, &prompts, retriever, generator)
    }

    /// Load the index, passages and encoder without a generation client.
    pub fn load_retriever(settings: &Settings) -> Result<Retriever> {
        let index = load_sqlite(&settings.index_path())?;
        let passages = PassageStore::load(&settings.passages_path())?;
        passages.validate_against(&index)?;

        let embedder = create_embedder(&settings.embedding)?;
        info!(
            "Using {} embedder ({} dimensions)",
            settings.embedding.provider,
            embedder.dimensions()
        );

        let retriever = Retriever::new(embedder, Arc::new(index), Arc::new(passages));
        check_dimensions(&retriever)?;
        Ok(retriever)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: &Prompts,
        retriever: Retriever,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        settings.validate()?;
        check_dimensions(&retriever)?;

        let directive = settings
            .prompts
            .system_directive
            .then(|| prompts.system_directive());

        Ok(Self {
            no_context_answer: prompts.no_context_answer(),
            settings,
            retriever,
            generator,
            directive,
        })
    }

    /// Start a new session with empty history.
    pub fn session(self: &Arc<Self>) -> Session {
        Session::new(self.clone())
    }

    /// Get the retriever.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The system directive sent at position 0, if enabled.
    pub fn directive(&self) -> Option<&str> {
        self.directive.as_deref()
    }
}

fn check_dimensions(retriever: &Retriever) -> Result<()> {
    let embedder_dims = retriever.embedder().dimensions();
    let index_dims = retriever.index().dimensions();
    if embedder_dims != index_dims {
        return Err(RapportError::Config(format!(
            "Embedder produces {} dimensions but the index holds {}-dimensional vectors",
            embedder_dims, index_dims
        )));
    }
    Ok(())
}

/// How the answer of one cycle was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    /// The generation service answered.
    Answer,
    /// Nothing relevant was retrieved; canned answer, no generation call.
    NoContext,
    /// The generation service failed.
    ServiceError,
    /// The generation service answered in an unexpected shape.
    MalformedResponse,
    /// Retrieval itself failed for this question.
    RetrievalFailed,
}

/// The outcome of one question.
#[derive(Debug, Clone)]
pub struct Reply {
    /// Text shown to the user and recorded as the assistant turn.
    pub answer: String,
    pub kind: ReplyKind,
    /// Passages the answer was grounded on, best first.
    pub sources: Vec<RetrievedPassage>,
}

/// One conversation: shared components plus its own history.
pub struct Session {
    orchestrator: Arc<Orchestrator>,
    state: ConversationState,
}

impl Session {
    /// Create a session with empty history.
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            state: ConversationState::new(),
        }
    }

    /// Answer a question and record it.
    ///
    /// Never fails: retrieval and generation problems become the answer text.
    /// History grows by exactly one user turn and one assistant turn.
    #[instrument(skip(self), fields(question = %question, history = self.state.len()))]
    pub async fn submit(&mut self, question: &str) -> Reply {
        let pipeline = &self.orchestrator;
        let top_k = pipeline.settings.retrieval.top_k;

        debug!("Retrieving top {} passages", top_k);
        let reply = match pipeline.retriever.search(question, top_k).await {
            Err(e) => {
                warn!("Retrieval failed: {}", e);
                Reply {
                    answer: format!("Retrieval failed: {}", e),
                    kind: ReplyKind::RetrievalFailed,
                    sources: Vec::new(),
                }
            }
            Ok(sources) if sources.is_empty() => {
                info!("No relevant passages, short-circuiting");
                Reply {
                    answer: pipeline.no_context_answer.clone(),
                    kind: ReplyKind::NoContext,
                    sources,
                }
            }
            Ok(sources) => {
                let context: Vec<String> = sources.iter().map(|p| p.chunk.text.clone()).collect();
                let messages = assemble(
                    pipeline.directive.as_deref(),
                    self.state.turns(),
                    &context,
                    question,
                );

                debug!("Generating from {} messages", messages.len());
                let outcome = pipeline
                    .generator
                    .generate(&messages, pipeline.settings.generation.temperature)
                    .await;

                let kind = match &outcome {
                    GenerationOutcome::Answer(_) => ReplyKind::Answer,
                    GenerationOutcome::ServiceError(detail) => {
                        warn!("Generation service error: {}", detail);
                        ReplyKind::ServiceError
                    }
                    GenerationOutcome::MalformedResponse(detail) => {
                        warn!("Malformed generation response: {}", detail);
                        ReplyKind::MalformedResponse
                    }
                };

                Reply {
                    answer: outcome.into_answer_text(),
                    kind,
                    sources,
                }
            }
        };

        self.state.append(Turn::user(question));
        self.state.append(Turn::assistant(reply.answer.clone()));

        reply
    }

    /// All turns recorded so far, oldest first.
    pub fn history(&self) -> &[Turn] {
        self.state.turns()
    }
}
