use anyhow::{anyhow, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{info, warn};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

use super::dispatch::{ChatDispatcher, ChatRequest, MESSAGE_REQUIRED};
use crate::config::{Config, HEALTH_PATH};
use crate::metrics;

/// # Hunt Server
///
/// Owns the configuration and the shared [`ChatDispatcher`] and exposes them over
/// HTTP:
///
/// ```text
/// POST {chat_path}   { message, sessionId? } -> { reply, sessionId, foundFragments, missionComplete? }
/// GET  /healthz      liveness plus counters
/// ```
///
/// Any other method on the chat path gets `405` with `Allow: POST`.
///
/// ## Usage
///
/// ```rust,no_run
/// use omegahunt::config::Config;
/// use omegahunt::hunt::HuntServer;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = Config::load("config.toml").await?;
///     HuntServer::new(config).run().await
/// }
/// ```
pub struct HuntServer {
    config: Config,
    dispatcher: Arc<ChatDispatcher>,
}

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<ChatDispatcher>,
}

impl HuntServer {
    pub fn new(config: Config) -> Self {
        let dispatcher = Arc::new(ChatDispatcher::from_config(&config));
        Self { config, dispatcher }
    }

    pub fn router(&self) -> Router {
        router(self.dispatcher.clone(), &self.config.server.chat_path)
    }

    /// Bind and serve until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        self.config.server.validate()?;
        let bind = &self.config.server.bind;
        let listener = TcpListener::bind(bind)
            .await
            .map_err(|e| anyhow!("Failed to bind {}: {}", bind, e))?;
        info!(
            "Hunt server listening on http://{}{}",
            bind, self.config.server.chat_path
        );
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Hunt server stopped");
        Ok(())
    }
}

/// Build the HTTP routes around a dispatcher.
pub fn router(dispatcher: Arc<ChatDispatcher>, chat_path: &str) -> Router {
    Router::new()
        .route(chat_path, post(chat).fallback(method_not_allowed))
        .route(HEALTH_PATH, get(health))
        .with_state(AppState { dispatcher })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn chat(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match serde_json::from_slice::<Value>(&body)
        .map_err(|_| MESSAGE_REQUIRED.to_string())
        .and_then(|v| ChatRequest::from_json(&v).map_err(|e| e.public_message()))
    {
        Ok(request) => request,
        Err(message) => {
            metrics::inc_request_rejected();
            return error_response(StatusCode::BAD_REQUEST, message);
        }
    };

    match state.dispatcher.handle(request).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) => {
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            error_response(status, e.public_message())
        }
    }
}

async fn method_not_allowed() -> Response {
    metrics::inc_request_rejected();
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(json!({ "error": "Method Not Allowed" })),
    )
        .into_response()
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let sessions = state.dispatcher.store().session_count().await;
    Json(json!({
        "status": "ok",
        "sessions": sessions,
        "counters": metrics::snapshot(),
    }))
}
