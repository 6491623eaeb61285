// ABOUTME: Container runtime seam used by the session authority and terminal bridge
// The Docker implementation lives in crate::docker; tests substitute in-process fakes

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use thiserror::Error;
use tokio::io::AsyncWrite;

use crate::models::ContainerInfo;
use crate::terminal::protocol::TerminalSize;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Docker connection error: {0}")]
    Connection(#[from] bollard::errors::Error),
    #[error("Container not found: {0}")]
    NotFound(String),
    #[error("Container operation failed: {0}")]
    OperationFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What to run inside the container and how to attach to it.
///
/// The gateway always requests a TTY attach. With a TTY the runtime hands back
/// a single unmultiplexed byte stream; non-TTY attaches would need stream
/// framing that the bridge does not implement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellRequest {
    pub command: Vec<String>,
    pub env: Vec<String>,
    pub tty: bool,
}

impl ShellRequest {
    pub fn new(command: Vec<String>, env: Vec<String>) -> Self {
        Self {
            command,
            env,
            tty: true,
        }
    }
}

pub type ShellOutput = BoxStream<'static, Result<Bytes, ContainerError>>;
pub type ShellInput = Pin<Box<dyn AsyncWrite + Send>>;

/// A live interactive process inside a container.
pub struct ShellStream {
    /// Combined stdout/stderr.
    pub output: ShellOutput,
    pub input: ShellInput,
    pub resizer: Box<dyn TerminalResizer>,
}

impl std::fmt::Debug for ShellStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellStream").finish_non_exhaustive()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TerminalResizer: Send + Sync {
    async fn resize(&self, size: TerminalSize) -> Result<(), ContainerError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// All containers known to the runtime, running or not.
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, ContainerError>;

    /// Start a new interactive process in `container_id` with stdin, stdout
    /// and stderr attached.
    async fn open_shell(
        &self,
        container_id: &str,
        request: &ShellRequest,
    ) -> Result<ShellStream, ContainerError>;
}
