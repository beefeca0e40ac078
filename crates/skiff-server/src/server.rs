//! Axum web server wiring for the Skiff agent
//!
//! Two inbound surfaces carry the same single message kind:
//!
//! - `GET /ws` upgrades to the duplex channel (see [`crate::ws`])
//! - `POST /api/message` is the fallback for clients without a socket;
//!   it runs the turn synchronously and returns only the final reply,
//!   with no streaming or action/browser-state side events

use crate::ws;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use skiff_agent::{AgentLoop, EventSink};
use skiff_browser::{BrowserConfig, SharedBrowser};
use skiff_core::{ClientMessage, Session, SkiffConfig};
use skiff_model::ModelClient;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application state
pub struct AppState {
    pub config: SkiffConfig,
    pub agent: AgentLoop<ModelClient, SharedBrowser>,
    pub browser: Arc<SharedBrowser>,
    /// Global turn serialization: one browser, one operator at a time
    pub turn_lock: Mutex<()>,
    /// Connected duplex clients, for status reporting
    pub ws_clients: AtomicUsize,
    /// Session backing the HTTP fallback delivery mode
    fallback_session: Mutex<Session>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: SkiffConfig) -> skiff_core::Result<Self> {
        let model = Arc::new(ModelClient::from_config(&config)?);
        let browser = Arc::new(SharedBrowser::new(BrowserConfig::from(&config.browser)));
        let agent = AgentLoop::new(model, browser.clone(), config.agent.clone());

        Ok(Self {
            config,
            agent,
            browser,
            turn_lock: Mutex::new(()),
            ws_clients: AtomicUsize::new(0),
            fallback_session: Mutex::new(Session::new()),
        })
    }
}

/// Build the application router
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/message", post(post_message))
        .route("/api/status", get(get_status))
        .route("/api/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until the process is stopped
pub async fn serve(config: SkiffConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config)?);
    let app = router(state);

    info!("Skiff server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// POST /api/message - fallback delivery: runs the turn, returns the reply
async fn post_message(
    State(app): State<SharedState>,
    Json(message): Json<ClientMessage>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if message.content.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    info!("Fallback message received ({} chars)", message.content.len());

    // Same global serialization as duplex turns
    let _turn = app.turn_lock.lock().await;
    let mut session = app.fallback_session.lock().await;
    let reply = app
        .agent
        .handle_turn(&mut session, &EventSink::disconnected(), &message.content)
        .await;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "message": reply,
    })))
}

/// GET /api/status
async fn get_status(State(app): State<SharedState>) -> Json<serde_json::Value> {
    let browser_launched = app.browser.is_launched().await;
    let current_url = app.browser.current_url().await;
    Json(status_body(
        browser_launched,
        current_url,
        app.ws_clients.load(Ordering::SeqCst),
    ))
}

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "skiff-server"
    }))
}

fn status_body(
    browser_launched: bool,
    current_url: Option<String>,
    connected_clients: usize,
) -> serde_json::Value {
    serde_json::json!({
        "status": "online",
        "browser_launched": browser_launched,
        "current_url": current_url,
        "connected_clients": connected_clients,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_body_shape() {
        let body = status_body(true, Some("https://example.com".to_string()), 2);
        assert_eq!(body["status"], "online");
        assert_eq!(body["browser_launched"], true);
        assert_eq!(body["current_url"], "https://example.com");
        assert_eq!(body["connected_clients"], 2);

        let body = status_body(false, None, 0);
        assert!(body["current_url"].is_null());
    }
}
