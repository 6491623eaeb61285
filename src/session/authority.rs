// ABOUTME: Grants terminal access to running containers by issuing tokens and registering sessions
// Validates the container reference against the runtime before anything is recorded

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::models::{find_container, SessionRecord};
use crate::runtime::ContainerRuntime;
use crate::session::SessionStore;
use crate::token::TokenCodec;

/// Lifetimes applied to every grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    pub token_ttl: Duration,
    /// Unclaimed sessions older than this are swept.
    pub session_max_age: Duration,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            token_ttl: Duration::from_secs(5 * 60),
            session_max_age: Duration::from_secs(10 * 60),
        }
    }
}

/// Everything a caller needs to build a connection URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub token: String,
    pub session_id: Uuid,
    #[serde(rename = "containerName")]
    pub container_ref: String,
    pub container_id: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

pub struct SessionAuthority {
    runtime: Arc<dyn ContainerRuntime>,
    sessions: Arc<dyn SessionStore>,
    codec: Arc<TokenCodec>,
    policy: AccessPolicy,
}

impl SessionAuthority {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        sessions: Arc<dyn SessionStore>,
        codec: Arc<TokenCodec>,
        policy: AccessPolicy,
    ) -> Self {
        Self {
            runtime,
            sessions,
            codec,
            policy,
        }
    }

    pub const fn policy(&self) -> AccessPolicy {
        self.policy
    }

    pub async fn request_access(&self, container_ref: &str) -> Result<AccessGrant, GatewayError> {
        let container_ref = container_ref.trim();
        if container_ref.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "containerName parameter is required".to_string(),
            ));
        }

        let containers = self.runtime.list_containers().await?;
        let container = find_container(&containers, container_ref)
            .ok_or_else(|| GatewayError::NotFound(container_ref.to_string()))?;

        if !container.is_running() {
            debug!(
                container_id = %container.id,
                state = %container.state,
                "Refusing access to container that is not running"
            );
            return Err(GatewayError::NotRunning(container.display_name().to_string()));
        }

        let session_id = Uuid::new_v4();
        let token = self
            .codec
            .issue(container_ref, session_id, self.policy.token_ttl)
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        self.sessions
            .put(
                session_id,
                SessionRecord::new(container_ref.to_string(), container.id.clone()),
            )
            .await;
        let max_age = chrono::Duration::from_std(self.policy.session_max_age)
            .unwrap_or_else(|_| chrono::Duration::minutes(10));
        self.sessions.sweep(max_age).await;

        info!(
            %session_id,
            container_id = %container.id,
            container = %container_ref,
            "Issued terminal session"
        );

        Ok(AccessGrant {
            token,
            session_id,
            container_ref: container_ref.to_string(),
            container_id: container.id.clone(),
            expires_in: self.policy.token_ttl.as_secs(),
        })
    }
}
