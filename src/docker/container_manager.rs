// ABOUTME: Docker-backed container runtime using Bollard for container discovery and shell exec

use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::models::ContainerSummary;
use bollard::{Docker, API_DEFAULT_VERSION};
use tracing::{debug, info, warn};

use super::exec_session;
use crate::config::DockerConfig;
use crate::models::ContainerInfo;
use crate::runtime::{ContainerError, ContainerRuntime, ShellRequest, ShellStream};

const CONNECT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct ContainerManager {
    docker: Docker,
}

impl ContainerManager {
    pub async fn new(config: &DockerConfig) -> Result<Self, ContainerError> {
        let docker = Self::connect_to_docker(config).map_err(ContainerError::Connection)?;

        // Test the connection
        docker.ping().await.map_err(ContainerError::Connection)?;

        info!("Successfully connected to Docker daemon");
        Ok(Self { docker })
    }

    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }

    fn connect_to_docker(config: &DockerConfig) -> Result<Docker, bollard::errors::Error> {
        if let Some(docker_host) = &config.host {
            info!("Using Docker host from config: {}", docker_host);
            match connect_to_host(docker_host) {
                Ok(docker) => return Ok(docker),
                Err(e) => {
                    warn!("Failed to connect to configured Docker host {}: {}", docker_host, e);
                }
            }
        }

        if let Ok(docker_host) = std::env::var("DOCKER_HOST") {
            info!("Using DOCKER_HOST: {}", docker_host);
            return connect_to_host(&docker_host);
        }

        for socket_path in Self::get_docker_socket_paths() {
            if !std::path::Path::new(&socket_path).exists() {
                continue;
            }
            info!("Found Docker socket at: {}", socket_path);

            match Docker::connect_with_socket(&socket_path, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION) {
                Ok(docker) => return Ok(docker),
                Err(e) => {
                    warn!("Failed to connect to Docker socket {}: {}", socket_path, e);
                }
            }
        }

        warn!("No Docker socket found, trying default connection");
        Docker::connect_with_local_defaults()
    }

    fn get_docker_socket_paths() -> Vec<String> {
        let mut paths = Vec::new();

        if cfg!(target_os = "macos") {
            if let Ok(home) = std::env::var("HOME") {
                // Docker Desktop, then Colima
                paths.push(format!("{}/.docker/run/docker.sock", home));
                paths.push(format!("{}/.colima/default/docker.sock", home));
            }
        }

        if cfg!(target_os = "linux") {
            paths.push("/var/run/docker.sock".to_string());

            // Rootless Docker, then Podman
            if let Ok(xdg_runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
                paths.push(format!("{}/docker.sock", xdg_runtime_dir));
                paths.push(format!("{}/podman/podman.sock", xdg_runtime_dir));
            }
        }

        paths
    }
}

/// Client for an explicit host, without touching the process environment.
fn connect_to_host(host: &str) -> Result<Docker, bollard::errors::Error> {
    if host.starts_with("tcp://") || host.starts_with("http://") {
        Docker::connect_with_http(host, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)
    } else if host.starts_with("unix://") || host.starts_with('/') {
        Docker::connect_with_socket(host, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)
    } else {
        Err(bollard::errors::Error::UnsupportedURISchemeError {
            uri: host.to_string(),
        })
    }
}

fn summary_to_info(summary: ContainerSummary) -> Option<ContainerInfo> {
    Some(ContainerInfo {
        id: summary.id?,
        names: summary.names.unwrap_or_default(),
        state: summary.state.unwrap_or_else(|| "unknown".to_string()),
    })
}

#[async_trait]
impl ContainerRuntime for ContainerManager {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, ContainerError> {
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: true,
                ..Default::default()
            }))
            .await?;

        debug!("Docker reported {} containers", containers.len());
        Ok(containers.into_iter().filter_map(summary_to_info).collect())
    }

    async fn open_shell(
        &self,
        container_id: &str,
        request: &ShellRequest,
    ) -> Result<ShellStream, ContainerError> {
        exec_session::start_shell(&self.docker, container_id, request).await
    }
}
