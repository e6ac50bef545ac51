//! HTTP API server exposing conversation sessions.
//!
//! Each session keeps its own history behind a mutex, so questions within a
//! session run one at a time while separate sessions proceed independently.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, ReplyKind, Session};
use crate::passages::Provenance;
use crate::rag::Turn;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    async fn session(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        let id = Uuid::parse_str(id).ok()?;
        self.sessions.read().await.get(&id).cloned()
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/sessions/{session_id}", delete(end_session))
        .route("/sessions/{session_id}/ask", post(ask))
        .route("/sessions/{session_id}/history", get(history))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'rapport doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Arc::new(Orchestrator::new(settings)?);
    let app = router(Arc::new(AppState::new(orchestrator)));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Rapport API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("New session", "POST /sessions");
    Output::kv("Ask", "POST /sessions/:session_id/ask");
    Output::kv("History", "GET  /sessions/:session_id/history");
    Output::kv("End session", "DELETE /sessions/:session_id");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Serialize, Deserialize)]
struct SessionCreated {
    session_id: String,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    kind: ReplyKind,
    sources: Vec<SourceInfo>,
}

#[derive(Serialize)]
struct SourceInfo {
    id: u64,
    text: String,
    source: Provenance,
    distance: f32,
}

#[derive(Serialize)]
struct HistoryResponse<'a> {
    session_id: &'a str,
    turns: &'a [Turn],
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

fn session_not_found(session_id: &str) -> axum::response::Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Session not found: {}", session_id),
    )
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let id = Uuid::new_v4();
    let session = Arc::new(Mutex::new(state.orchestrator.session()));
    state.sessions.write().await.insert(id, session);
    info!("Created session {}", id);

    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: id.to_string(),
        }),
    )
}

async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let removed = match Uuid::parse_str(&session_id) {
        Ok(id) => state.sessions.write().await.remove(&id),
        Err(_) => None,
    };

    match removed {
        Some(_) => {
            info!("Ended session {}", session_id);
            StatusCode::NO_CONTENT.into_response()
        }
        None => session_not_found(&session_id),
    }
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<AskRequest>,
) -> impl IntoResponse {
    if req.question.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "question is empty".to_string());
    }

    let Some(session) = state.session(&session_id).await else {
        return session_not_found(&session_id);
    };

    let reply = session.lock().await.submit(req.question.trim()).await;

    Json(AskResponse {
        answer: reply.answer,
        kind: reply.kind,
        sources: reply
            .sources
            .into_iter()
            .map(|p| SourceInfo {
                id: p.chunk.id,
                text: p.chunk.text,
                source: p.chunk.source,
                distance: p.distance,
            })
            .collect(),
    })
    .into_response()
}

async fn history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = state.session(&session_id).await else {
        return session_not_found(&session_id);
    };

    let session = session.lock().await;
    Json(HistoryResponse {
        session_id: &session_id,
        turns: session.history(),
    })
    .into_response()
}
