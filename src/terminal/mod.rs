// ABOUTME: Terminal module: WebSocket wire protocol, inbound frame classification, and the shell bridge
// Connects browser terminals to interactive exec sessions inside containers

pub mod bridge;
pub mod demux;
pub mod protocol;

pub use bridge::{BridgeState, SessionTeardown, TerminalBridge};
pub use demux::{classify, DiscardReason, InboundFrame, ResizeEncoding};
pub use protocol::{ErrorFrame, TerminalSize};
