// HTTP façade
// A small axum app exposing the chat session over POST /chat/. The session
// pipeline is synchronous, so handlers run it on the blocking pool behind a
// mutex that serializes conversation turns.

#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::session::Session;

/// Shared handler state holding the single live session
#[derive(Clone)]
pub struct AppState {
    session: Arc<Mutex<Session>>,
}

impl AppState {
    #[inline]
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Build the application router
#[inline]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat/", post(chat))
        .route("/chat", post(chat))
        .with_state(state)
}

/// Run the chat server until a shutdown signal arrives, then delete the
/// session's chat history best-effort.
#[inline]
pub async fn serve(config: Config, port: u16) -> anyhow::Result<()> {
    let session = tokio::task::spawn_blocking(move || Session::start(&config))
        .await
        .context("Session startup task panicked")??;
    info!("Chat session {} ready", session.session_id());

    let state = AppState::new(session);
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let session = state.session;
    let cleanup = tokio::task::spawn_blocking(move || {
        session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .terminate()
    })
    .await
    .context("Shutdown cleanup task panicked")?;

    if let Err(e) = cleanup {
        warn!("Failed to delete chat history on shutdown: {:#}", e);
    }

    Ok(())
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let session = Arc::clone(&state.session);

    let response = tokio::task::spawn_blocking(move || {
        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
        session.handle(&request.text)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(ChatResponse { response }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
