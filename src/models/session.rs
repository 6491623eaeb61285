// ABOUTME: Session record stored in the registry between token issuance and socket close

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Reference the client asked for (name or id prefix).
    pub container_ref: String,
    /// Canonical id resolved at issuance time.
    pub container_id: String,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(container_ref: String, container_id: String) -> Self {
        Self {
            container_ref,
            container_id,
            created_at: Utc::now(),
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    pub fn is_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) > max_age
    }
}
