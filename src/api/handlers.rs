// ABOUTME: HTTP handlers for access grants, the terminal WebSocket upgrade, and health

use std::sync::Arc;

use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::url::terminal_url;
use super::AppState;
use crate::error::GatewayError;
use crate::session::{AccessGrant, SessionStore};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessQuery {
    pub container_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TerminalQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessData {
    pub url: String,
    #[serde(flatten)]
    pub grant: AccessGrant,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub success: bool,
    pub data: AccessData,
}

pub async fn get_access(
    State(state): State<AppState>,
    Query(query): Query<AccessQuery>,
    headers: HeaderMap,
) -> Result<Json<AccessResponse>, GatewayError> {
    let container_ref = query
        .container_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| {
            GatewayError::InvalidRequest("containerName parameter is required".to_string())
        })?;

    let grant = state.authority.request_access(&container_ref).await?;
    let url = terminal_url(
        &headers,
        state.public_url.as_deref(),
        &grant.token,
    );

    Ok(Json(AccessResponse {
        success: true,
        data: AccessData { url, grant },
    }))
}

pub async fn terminal_ws(
    State(state): State<AppState>,
    Query(query): Query<TerminalQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let bridge = Arc::clone(&state.bridge);
    ws.on_upgrade(move |socket| async move { bridge.serve(socket, query.token).await })
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "activeSessions": state.sessions.len().await,
    }))
}
