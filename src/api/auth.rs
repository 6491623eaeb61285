// ABOUTME: API key check guarding the access-grant endpoint

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use super::AppState;
use crate::error::GatewayError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Key from `X-API-Key`, or a bearer `Authorization` header.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
        })
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

fn keys_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

pub fn check_api_key(expected: Option<&str>, headers: &HeaderMap) -> Result<(), GatewayError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    match presented_key(headers) {
        None => Err(GatewayError::Unauthorized),
        Some(key) if keys_match(key, expected) => Ok(()),
        Some(_) => Err(GatewayError::Forbidden),
    }
}

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    check_api_key(state.api_key.as_deref(), request.headers())?;
    Ok(next.run(request).await)
}
