// ABOUTME: HTTP surface of the gateway: access grants, terminal upgrade, health
// Thin glue over the session authority and terminal bridge

pub mod auth;
pub mod handlers;
pub mod url;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::runtime::ContainerRuntime;
use crate::session::{MemorySessionStore, SessionAuthority, SessionStore};
use crate::terminal::TerminalBridge;
use crate::token::TokenCodec;

#[derive(Clone)]
pub struct AppState {
    pub authority: Arc<SessionAuthority>,
    pub bridge: Arc<TerminalBridge>,
    pub sessions: Arc<dyn SessionStore>,
    pub api_key: Option<String>,
    pub public_url: Option<String>,
}

impl AppState {
    /// Wire the core components together around one shared session store.
    pub fn new(
        config: &AppConfig,
        runtime: Arc<dyn ContainerRuntime>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(config.auth.token_secret.as_bytes()));
        let authority = SessionAuthority::new(
            runtime.clone(),
            sessions.clone(),
            codec.clone(),
            config.auth.access_policy(),
        );
        let bridge = TerminalBridge::new(
            codec,
            sessions.clone(),
            runtime,
            config.terminal.shell_request(),
        );

        Self {
            authority: Arc::new(authority),
            bridge: Arc::new(bridge),
            sessions,
            api_key: config.auth.api_key.clone(),
            public_url: config.server.public_url.clone(),
        }
    }

    pub fn with_memory_store(config: &AppConfig, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self::new(config, runtime, Arc::new(MemorySessionStore::new()))
    }
}

pub fn router(state: AppState) -> Router {
    let access = Router::new()
        .route("/getaccess", get(handlers::get_access))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .merge(access)
        .route("/terminal", get(handlers::terminal_ws))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
