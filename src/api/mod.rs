//! HTTP/WebSocket surface: router assembly and shared application state.

pub mod notes;
pub mod oauth;
pub mod ws;

use std::sync::Arc;

use axum::http::{HeaderValue, StatusCode};
use axum::response::Json;
use axum::routing::{get, post};
use axum::{Router, middleware};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::gate::{AuthenticationGate, authenticate};
use crate::auth::local::{LocalTokenVerifier, TokenIssuer};
use crate::auth::remote::{IdentityCache, RemoteTokenValidator};
use crate::broadcast::BroadcastHub;
use crate::config::AppConfig;
use crate::store::NoteStore;
use self::oauth::OAuthClient;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<NoteStore>,
    pub hub: Arc<BroadcastHub>,
    pub gate: Arc<AuthenticationGate>,
    pub issuer: Arc<TokenIssuer>,
    pub oauth: Arc<OAuthClient>,
    pub allowed_origins: Vec<String>,
}

impl AppState {
    /// Wire up every component from a validated configuration.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let local = LocalTokenVerifier::new(&config.token_secret);
        let remote =
            RemoteTokenValidator::new(config.provider.api_base.clone(), IdentityCache::new())?;
        let gate = AuthenticationGate::new(local, remote);

        Ok(Self {
            store: Arc::new(NoteStore::new()),
            hub: Arc::new(BroadcastHub::new()),
            gate: Arc::new(gate),
            issuer: Arc::new(TokenIssuer::new(&config.token_secret)),
            oauth: Arc::new(OAuthClient::new(&config.provider)?),
            allowed_origins: config.allowed_origins.clone(),
        })
    }
}

/// Build the service router with all layers applied.
///
/// Layer order, outer to inner: request tracing, CORS, the authentication
/// gate. The gate runs before every handler and after CORS so pre-flight
/// requests are answered without touching credentials.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/auth/exchange", post(oauth::exchange_code))
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route(
            "/notes/{id}",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .route("/ws/notes", get(ws::subscribe_notes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.allowed_origins))
                .layer(middleware::from_fn_with_state(
                    state.gate.clone(),
                    authenticate,
                )),
        )
        .with_state(state)
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring unparsable CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}
