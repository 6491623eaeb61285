// ABOUTME: Container summary model as seen by the gateway, plus reference lookup
// Mirrors the subset of Docker's container listing the access path needs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: String,
    pub names: Vec<String>,
    pub state: String,
}

impl ContainerInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            names: vec![name.into()],
            state: state.into(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    /// True when `reference` is a prefix of the id or a substring of any name.
    pub fn matches(&self, reference: &str) -> bool {
        self.id.starts_with(reference) || self.names.iter().any(|name| name.contains(reference))
    }

    /// Name without Docker's leading slash, falling back to the short id.
    pub fn display_name(&self) -> &str {
        self.names
            .first()
            .map(|name| name.trim_start_matches('/'))
            .unwrap_or_else(|| &self.id[..self.id.len().min(12)])
    }
}

/// First container matching `reference`, in listing order.
pub fn find_container<'a>(containers: &'a [ContainerInfo], reference: &str) -> Option<&'a ContainerInfo> {
    containers.iter().find(|container| container.matches(reference))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Vec<ContainerInfo> {
        vec![
            ContainerInfo::new("a1b2c3d4e5f6", "/web-frontend", "running"),
            ContainerInfo::new("ffee00112233", "/test-alpine", "exited"),
        ]
    }

    #[test]
    fn test_match_by_name_containment() {
        let containers = listing();
        let found = find_container(&containers, "alpine").unwrap();
        assert_eq!(found.id, "ffee00112233");
        assert!(!found.is_running());
    }

    #[test]
    fn test_match_by_id_prefix() {
        let containers = listing();
        let found = find_container(&containers, "a1b2").unwrap();
        assert_eq!(found.display_name(), "web-frontend");
        assert!(found.is_running());
    }

    #[test]
    fn test_no_match() {
        assert!(find_container(&listing(), "postgres").is_none());
    }
}
