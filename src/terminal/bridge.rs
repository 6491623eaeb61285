// ABOUTME: Bridges one WebSocket connection to one interactive shell inside a container
// Authenticates the token, attaches a fresh exec, relays both directions, and tears down once

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::models::SessionRecord;
use crate::runtime::{
    ContainerRuntime, ShellInput, ShellOutput, ShellRequest, ShellStream, TerminalResizer,
};
use crate::session::SessionStore;
use crate::terminal::demux::{classify, InboundFrame};
use crate::terminal::protocol::{decode_input, encode_output, ErrorFrame};
use crate::token::TokenCodec;

type SocketSink = SplitSink<WebSocket, Message>;
type SocketStream = SplitStream<WebSocket>;

const STDIN_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Connecting,
    Authenticating,
    Attaching,
    Streaming,
    Closed,
}

/// Removes a session from the registry exactly once, however many times it is
/// asked to and from wherever. Dropping it unfinished schedules the removal.
pub struct SessionTeardown {
    session_id: Uuid,
    sessions: Arc<dyn SessionStore>,
    done: AtomicBool,
}

impl SessionTeardown {
    pub fn new(session_id: Uuid, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            session_id,
            sessions,
            done: AtomicBool::new(false),
        }
    }

    /// Returns `true` only for the call that performed the teardown.
    pub async fn close(&self) -> bool {
        if self.done.swap(true, Ordering::AcqRel) {
            return false;
        }
        let removed = self.sessions.delete(&self.session_id).await;
        debug!(session_id = %self.session_id, removed, "Session released");
        true
    }

    pub fn is_closed(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

impl Drop for SessionTeardown {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let sessions = self.sessions.clone();
            let session_id = self.session_id;
            handle.spawn(async move {
                sessions.delete(&session_id).await;
            });
        }
    }
}

struct Connection {
    id: Uuid,
    state: BridgeState,
}

impl Connection {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: BridgeState::Connecting,
        }
    }

    fn advance(&mut self, next: BridgeState) {
        debug!(conn_id = %self.id, from = ?self.state, to = ?next, "Terminal bridge transition");
        self.state = next;
    }
}

pub struct TerminalBridge {
    codec: Arc<TokenCodec>,
    sessions: Arc<dyn SessionStore>,
    runtime: Arc<dyn ContainerRuntime>,
    shell: ShellRequest,
}

impl TerminalBridge {
    pub fn new(
        codec: Arc<TokenCodec>,
        sessions: Arc<dyn SessionStore>,
        runtime: Arc<dyn ContainerRuntime>,
        shell: ShellRequest,
    ) -> Self {
        Self {
            codec,
            sessions,
            runtime,
            shell,
        }
    }

    /// Drive one accepted WebSocket until either side ends.
    pub async fn serve(&self, socket: WebSocket, token: Option<String>) {
        let mut conn = Connection::new();
        let (mut ws_tx, mut ws_rx) = socket.split();

        conn.advance(BridgeState::Authenticating);
        let (session_id, record) = match self.authenticate(token.as_deref()).await {
            Ok(session) => session,
            Err(err) => {
                info!(conn_id = %conn.id, reason = %err, "Rejected terminal connection");
                reject(&mut ws_tx, &err).await;
                conn.advance(BridgeState::Closed);
                return;
            }
        };
        let teardown = SessionTeardown::new(session_id, self.sessions.clone());

        conn.advance(BridgeState::Attaching);
        let shell = match self.runtime.open_shell(&record.container_id, &self.shell).await {
            Ok(shell) => shell,
            Err(e) => {
                error!(
                    conn_id = %conn.id,
                    %session_id,
                    container_id = %record.container_id,
                    "Failed to attach shell: {}", e
                );
                reject(&mut ws_tx, &GatewayError::AttachFailure(e.to_string())).await;
                teardown.close().await;
                conn.advance(BridgeState::Closed);
                return;
            }
        };

        info!(
            conn_id = %conn.id,
            %session_id,
            container_id = %record.container_id,
            "Terminal attached"
        );
        conn.advance(BridgeState::Streaming);
        let ShellStream {
            mut output,
            mut input,
            resizer,
        } = shell;
        let (stdin_tx, stdin_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        // Each direction runs independently; a stalled stdin write never holds up output or Close
        let end = tokio::select! {
            end = pump_output(conn.id, &mut output, &mut ws_tx) => end,
            end = pump_input(conn.id, &mut ws_rx, &stdin_tx, resizer.as_ref()) => end,
            end = write_stdin(stdin_rx, &mut input) => end,
        };
        debug!(conn_id = %conn.id, ?end, "Terminal relay finished");

        conn.advance(BridgeState::Closed);
        teardown.close().await;
        drop(stdin_tx);
        match tokio::time::timeout(STDIN_SHUTDOWN_GRACE, input.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(conn_id = %conn.id, "Shell stdin already closed: {}", e),
            Err(_) => warn!(conn_id = %conn.id, "Shell stdin did not close in time"),
        }

        match end {
            RelayEnd::Failed(err) => reject(&mut ws_tx, &err).await,
            RelayEnd::ShellExited => {
                let _ = ws_tx.send(Message::Close(None)).await;
            }
            RelayEnd::ClientClosed | RelayEnd::SocketGone => {}
        }
    }

    async fn authenticate(
        &self,
        token: Option<&str>,
    ) -> Result<(Uuid, SessionRecord), GatewayError> {
        let token = token
            .filter(|token| !token.is_empty())
            .ok_or(GatewayError::InvalidOrExpiredToken)?;

        let claims = self.codec.verify(token).map_err(|e| {
            debug!(reason = %e, "Token verification failed");
            GatewayError::InvalidOrExpiredToken
        })?;

        let record = self
            .sessions
            .get(&claims.session_id)
            .await
            .filter(|record| record.container_ref == claims.container_ref)
            .ok_or(GatewayError::SessionNotFound)?;

        Ok((claims.session_id, record))
    }
}

/// Why a connection's relay stopped.
#[derive(Debug)]
enum RelayEnd {
    ShellExited,
    ClientClosed,
    SocketGone,
    Failed(GatewayError),
}

/// Shell output to the socket, one base64 text frame per chunk.
async fn pump_output(
    conn_id: Uuid,
    output: &mut ShellOutput,
    ws_tx: &mut SocketSink,
) -> RelayEnd {
    while let Some(chunk) = output.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%conn_id, "Shell stream error: {}", e);
                return RelayEnd::Failed(GatewayError::StreamFailure(e.to_string()));
            }
        };
        if bytes.is_empty() {
            continue;
        }
        let frame = Message::Text(encode_output(&bytes).into());
        if let Err(e) = ws_tx.send(frame).await {
            debug!(%conn_id, "Socket no longer writable: {}", e);
            return RelayEnd::SocketGone;
        }
    }
    info!(%conn_id, "Shell exited");
    RelayEnd::ShellExited
}

/// Socket frames to the stdin queue or the resizer.
async fn pump_input(
    conn_id: Uuid,
    ws_rx: &mut SocketStream,
    stdin_tx: &mpsc::UnboundedSender<Vec<u8>>,
    resizer: &dyn TerminalResizer,
) -> RelayEnd {
    while let Some(frame) = ws_rx.next().await {
        let forwarded = match frame {
            Ok(Message::Text(text)) => {
                forward_frame(conn_id, text.as_str().as_bytes(), stdin_tx, resizer).await
            }
            Ok(Message::Binary(data)) => forward_frame(conn_id, &data, stdin_tx, resizer).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => Ok(()),
            Err(e) => {
                debug!(%conn_id, "Socket error: {}", e);
                return RelayEnd::SocketGone;
            }
        };
        if let Err(err) = forwarded {
            return RelayEnd::Failed(err);
        }
    }
    info!(%conn_id, "Client closed terminal");
    RelayEnd::ClientClosed
}

/// Drain the stdin queue into the shell. A failed write is fatal.
async fn write_stdin(
    mut stdin_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    input: &mut ShellInput,
) -> RelayEnd {
    while let Some(bytes) = stdin_rx.recv().await {
        let written = match input.write_all(&bytes).await {
            Ok(()) => input.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            return RelayEnd::Failed(GatewayError::StreamFailure(e.to_string()));
        }
    }
    RelayEnd::ClientClosed
}

/// Decode, classify, then queue for stdin or resize. Undecodable frames and
/// failed resizes are dropped.
async fn forward_frame(
    conn_id: Uuid,
    payload: &[u8],
    stdin_tx: &mpsc::UnboundedSender<Vec<u8>>,
    resizer: &dyn TerminalResizer,
) -> Result<(), GatewayError> {
    let decoded = match decode_input(payload) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!(%conn_id, "Dropping undecodable frame: {}", e);
            return Ok(());
        }
    };

    match classify(&decoded) {
        InboundFrame::Discard(reason) => {
            trace!(%conn_id, ?reason, len = decoded.len(), "Discarded inbound frame");
        }
        InboundFrame::Resize { size, encoding } => {
            trace!(%conn_id, %size, ?encoding, "Resize directive");
            if let Err(e) = resizer.resize(size).await {
                warn!(%conn_id, %size, "Terminal resize failed: {}", e);
            }
        }
        InboundFrame::Input(bytes) => {
            if !bytes.is_empty() {
                stdin_tx
                    .send(bytes.to_vec())
                    .map_err(|_| GatewayError::StreamFailure("shell stdin closed".to_string()))?;
            }
        }
    }
    Ok(())
}

/// Send one JSON error frame, then close.
async fn reject(ws_tx: &mut SocketSink, err: &GatewayError) {
    let frame = ErrorFrame::new(err.to_string()).to_json();
    if ws_tx.send(Message::Text(frame.into())).await.is_ok() {
        let _ = ws_tx.send(Message::Close(None)).await;
    }
}
