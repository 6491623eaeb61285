// ABOUTME: Shared test fixtures: an in-process container runtime with an echoing fake shell
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

use shell_gateway::api::{router, AppState};
use shell_gateway::config::AppConfig;
use shell_gateway::models::ContainerInfo;
use shell_gateway::runtime::{
    ContainerError, ContainerRuntime, ShellRequest, ShellStream, TerminalResizer,
};
use shell_gateway::terminal::TerminalSize;

pub const SECRET: &str = "integration-test-secret";
pub const API_KEY: &str = "integration-api-key";
pub const ALPINE_ID: &str = "4f1c2a9be0d7";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.token_secret = SECRET.to_string();
    config.auth.api_key = Some(API_KEY.to_string());
    config
}

pub fn default_containers() -> Vec<ContainerInfo> {
    vec![
        ContainerInfo::new(ALPINE_ID, "/test-alpine", "running"),
        ContainerInfo::new("9a8b7c6d5e4f", "/stopped-db", "exited"),
    ]
}

/// Runtime whose shells echo input back, answer `ls`, and exit on `exit`.
/// Stdin is a 4 KiB pipe and at most four echo chunks queue up unread.
#[derive(Default)]
pub struct FakeRuntime {
    containers: Vec<ContainerInfo>,
    fail_attach: bool,
    fail_resize: bool,
    ignore_stdin: bool,
    pub opened: AtomicUsize,
    pub resizes: Arc<Mutex<Vec<TerminalSize>>>,
    pub stdin_closed: Arc<AtomicBool>,
    pub last_request: Mutex<Option<ShellRequest>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            containers: default_containers(),
            ..Default::default()
        }
    }

    pub fn failing_attach() -> Self {
        Self {
            fail_attach: true,
            ..Self::new()
        }
    }

    pub fn failing_resize() -> Self {
        Self {
            fail_resize: true,
            ..Self::new()
        }
    }

    /// Shell that prints a prompt and then never reads stdin.
    pub fn ignoring_stdin() -> Self {
        Self {
            ignore_stdin: true,
            ..Self::new()
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn resizes(&self) -> Vec<TerminalSize> {
        self.resizes.lock().unwrap().clone()
    }
}

struct FakeResizer {
    resizes: Arc<Mutex<Vec<TerminalSize>>>,
    fail: bool,
}

#[async_trait]
impl TerminalResizer for FakeResizer {
    async fn resize(&self, size: TerminalSize) -> Result<(), ContainerError> {
        self.resizes.lock().unwrap().push(size);
        if self.fail {
            return Err(ContainerError::OperationFailed("resize_exec refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, ContainerError> {
        Ok(self.containers.clone())
    }

    async fn open_shell(
        &self,
        container_id: &str,
        request: &ShellRequest,
    ) -> Result<ShellStream, ContainerError> {
        if self.fail_attach {
            return Err(ContainerError::NotFound(container_id.to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        let (input, mut shell_stdin) = tokio::io::duplex(4096);
        // Bounded like a real TTY: echo stalls until the bridge drains output
        let (reply_tx, mut reply_rx) = tokio::sync::mpsc::channel::<Bytes>(4);
        let stdin_closed = self.stdin_closed.clone();

        let ignore_stdin = self.ignore_stdin;
        tokio::spawn(async move {
            if reply_tx.send(Bytes::from_static(b"/ # ")).await.is_err() {
                return;
            }
            if ignore_stdin {
                reply_tx.closed().await;
                drop(shell_stdin);
                return;
            }
            let mut buf = vec![0u8; 1024];
            loop {
                let n = match shell_stdin.read(&mut buf).await {
                    Ok(0) | Err(_) => {
                        stdin_closed.store(true, Ordering::SeqCst);
                        break;
                    }
                    Ok(n) => n,
                };
                let line = &buf[..n];
                if contains(line, b"exit\n") {
                    break;
                }
                let mut reply = line.to_vec();
                if contains(line, b"ls\n") {
                    reply.extend_from_slice(b"bin  etc  home  usr\r\n/ # ");
                }
                if reply_tx.send(Bytes::from(reply)).await.is_err() {
                    break;
                }
            }
        });

        let output = async_stream::stream! {
            while let Some(chunk) = reply_rx.recv().await {
                yield Ok::<_, ContainerError>(chunk);
            }
        };

        Ok(ShellStream {
            output: Box::pin(output),
            input: Box::pin(input),
            resizer: Box::new(FakeResizer {
                resizes: self.resizes.clone(),
                fail: self.fail_resize,
            }),
        })
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Serve the real router on an ephemeral port.
pub async fn spawn_gateway(runtime: Arc<FakeRuntime>) -> (SocketAddr, AppState) {
    let state = AppState::with_memory_store(&test_config(), runtime);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}
