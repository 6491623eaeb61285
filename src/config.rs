// ABOUTME: Gateway configuration loaded from TOML with environment overrides
// Signing secret and lifetimes are fixed for the life of the process once loaded

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::runtime::ShellRequest;
use crate::session::AccessPolicy;

pub const ENV_TOKEN_SECRET: &str = "SHELL_GATEWAY_TOKEN_SECRET";
pub const ENV_API_KEY: &str = "SHELL_GATEWAY_API_KEY";
pub const ENV_BIND: &str = "SHELL_GATEWAY_BIND";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub docker: DockerConfig,
    pub terminal: TerminalConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Externally visible base URL, e.g. `https://shell.example.com`.
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            public_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When unset, `/getaccess` is open.
    pub api_key: Option<String>,
    pub token_secret: String,
    pub token_ttl_secs: u64,
    pub session_max_age_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            token_secret: String::new(),
            token_ttl_secs: 300,
            session_max_age_secs: 600,
        }
    }
}

impl AuthConfig {
    pub const fn access_policy(&self) -> AccessPolicy {
        AccessPolicy {
            token_ttl: Duration::from_secs(self.token_ttl_secs),
            session_max_age: Duration::from_secs(self.session_max_age_secs),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    pub host: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub command: Vec<String>,
    pub env: Vec<String>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            // Login bash when the image has it, plain sh otherwise
            command: vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                "if command -v bash >/dev/null 2>&1; then exec bash -l; else exec sh; fi"
                    .to_string(),
            ],
            env: vec![
                "TERM=xterm-256color".to_string(),
                "COLORTERM=truecolor".to_string(),
            ],
        }
    }
}

impl TerminalConfig {
    pub fn shell_request(&self) -> ShellRequest {
        ShellRequest::new(self.command.clone(), self.env.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write logs to a timestamped file here instead of stderr.
    pub directory: Option<PathBuf>,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            filter: "shell_gateway=info,tower_http=info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("shell-gateway").join("config.toml"))
    }

    /// Load from `path` (or the default location), apply environment overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) if path_was_explicit(path.as_path(), &Self::default_path()) => {
                bail!("Config file not found: {}", path.display());
            }
            _ => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(ENV_TOKEN_SECRET) {
            self.auth.token_secret = secret;
        }
        if let Some(api_key) = lookup(ENV_API_KEY) {
            self.auth.api_key = Some(api_key).filter(|key| !key.is_empty());
        }
        if let Some(bind) = lookup(ENV_BIND).and_then(|bind| bind.parse().ok()) {
            self.server.bind = bind;
        }
        if let Some(host) = lookup("DOCKER_HOST") {
            self.docker.host = Some(host);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.token_secret.trim().is_empty() {
            bail!("auth.token_secret must be set (or {})", ENV_TOKEN_SECRET);
        }
        if self.auth.token_ttl_secs == 0 {
            bail!("auth.token_ttl_secs must be greater than zero");
        }
        if self.auth.session_max_age_secs == 0 {
            bail!("auth.session_max_age_secs must be greater than zero");
        }
        if self.terminal.command.is_empty() {
            bail!("terminal.command must not be empty");
        }
        Ok(())
    }
}

fn path_was_explicit(path: &Path, default: &Option<PathBuf>) -> bool {
    default.as_deref() != Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.auth.token_ttl_secs, 300);
        assert_eq!(config.auth.session_max_age_secs, 600);
        assert_eq!(config.server.bind.port(), 8080);
        assert!(config.terminal.env.contains(&"TERM=xterm-256color".to_string()));
        assert!(config.terminal.shell_request().tty);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [auth]
            token_secret = "s3cret"
            token_ttl_secs = 60

            [server]
            bind = "127.0.0.1:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.auth.token_secret, "s3cret");
        assert_eq!(config.auth.token_ttl_secs, 60);
        assert_eq!(config.auth.session_max_age_secs, 600);
        assert_eq!(config.server.bind.to_string(), "127.0.0.1:9000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_secret_fails_validation() {
        assert!(AppConfig::default().validate().is_err());
    }

    #[test]
    fn test_zero_ttl_fails_validation() {
        let mut config = AppConfig::default();
        config.auth.token_secret = "x".into();
        config.auth.token_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_TOKEN_SECRET, "from-env"),
            (ENV_API_KEY, "key-123"),
            (ENV_BIND, "127.0.0.1:7000"),
            ("DOCKER_HOST", "unix:///tmp/docker.sock"),
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.auth.token_secret, "from-env");
        assert_eq!(config.auth.api_key.as_deref(), Some("key-123"));
        assert_eq!(config.server.bind.port(), 7000);
        assert_eq!(config.docker.host.as_deref(), Some("unix:///tmp/docker.sock"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[auth]\ntoken_secret = \"file-secret\"\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.auth.token_secret, "file-secret");
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }
}
