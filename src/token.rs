// ABOUTME: Signed, self-expiring terminal access tokens (HS256 JWT)
// Pure encode/verify; the session registry decides whether a verified token is still usable

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The only purpose a gateway token is ever issued for.
pub const TERMINAL_PURPOSE: &str = "terminal";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalClaims {
    #[serde(rename = "containerName")]
    pub container_ref: String,
    pub session_id: Uuid,
    pub purpose: String,
    pub iat: i64,
    pub exp: i64,
}

/// Why a token was rejected. Callers surface all of these the same way.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("bad token signature")]
    BadSignature,
    #[error("token signing failed: {0}")]
    Signing(String),
}

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn issue(
        &self,
        container_ref: &str,
        session_id: Uuid,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        self.issue_at(container_ref, session_id, ttl, Utc::now())
    }

    /// Same as [`issue`](Self::issue) with an explicit issuance time.
    pub fn issue_at(
        &self,
        container_ref: &str,
        session_id: Uuid,
        ttl: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let ttl_secs = i64::try_from(ttl.as_secs()).map_err(|e| TokenError::Signing(e.to_string()))?;
        let iat = issued_at.timestamp();
        let claims = TerminalClaims {
            container_ref: container_ref.to_string(),
            session_id,
            purpose: TERMINAL_PURPOSE.to_string(),
            iat,
            exp: iat + ttl_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<TerminalClaims, TokenError> {
        let data = decode::<TerminalClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            },
        )?;

        if data.claims.purpose != TERMINAL_PURPOSE {
            return Err(TokenError::Malformed);
        }
        Ok(data.claims)
    }
}
