//! HTTP surface
//!
//! `POST /api/hr-chat` answers questions, `GET /api/health` reports whether
//! the index is ready.

pub mod errors;


use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::index::IndexStatus;
use crate::query::QueryHandler;

pub use errors::{ApiError, ErrorBody};

pub const CHAT_ROUTE: &str = "/api/hr-chat";
pub const HEALTH_ROUTE: &str = "/api/health";

#[derive(Clone)]
pub struct AppState {
    handler: Arc<QueryHandler>,
}

impl AppState {
    #[inline]
    pub fn new(handler: QueryHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<usize>,
}

/// Build the application router
#[inline]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(CHAT_ROUTE, post(handle_chat))
        .route(HEALTH_ROUTE, get(handle_health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router on an already bound listener until `shutdown` resolves
#[inline]
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Policy chat backend listening on http://{}", addr);
        info!("  POST {}", CHAT_ROUTE);
        info!("  GET {}", HEALTH_ROUTE);
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidBody(e.body_text()))?;

    let question = request
        .question
        .filter(|q| !q.trim().is_empty())
        .ok_or(ApiError::MissingQuestion)?;

    debug!("Answering question ({} chars)", question.len());
    let answer = state.handler.answer(&question).await?;

    Ok(Json(ChatResponse {
        answer: answer.text,
    }))
}

async fn handle_health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.handler.index().status().await {
        IndexStatus::Ready { chunks, .. } => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ready".to_string(),
                chunks: Some(chunks),
            }),
        ),
        IndexStatus::Pending => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "pending".to_string(),
                chunks: None,
            }),
        ),
        IndexStatus::Failed { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "failed".to_string(),
                chunks: None,
            }),
        ),
    }
}
