// ABOUTME: Wire protocol for the /terminal WebSocket
// Frames carry base64 of raw terminal bytes in both directions; errors are a single JSON frame

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

// ============================================
// Frame payloads
// ============================================

/// Encode one chunk of process output for a server→client text frame.
pub fn encode_output(chunk: &[u8]) -> String {
    STANDARD.encode(chunk)
}

/// Decode a client→server frame payload. Surrounding whitespace is ignored.
pub fn decode_input(payload: &[u8]) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(payload.trim_ascii())
}

// ============================================
// Error frame
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub error: String,
}

impl ErrorFrame {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"error":"internal error"}"#.to_string())
    }
}

// ============================================
// Terminal geometry
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    pub cols: u16,
    pub rows: u16,
}

impl TerminalSize {
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl std::fmt::Display for TerminalSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}
