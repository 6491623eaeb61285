// ABOUTME: Classifies decoded inbound terminal frames as noise, resize directives, or raw input
// Rules are ordered predicates; the first one that claims a frame decides its fate

//! The discard rules are signal/noise heuristics learned from one browser
//! terminal client's behaviour, not a wire protocol. Two of them
//! ([`short_high_byte`] and [`escape_marker`]) will also swallow legitimate
//! input that happens to look like noise, for example a paste containing an
//! OSC sequence. That is known and kept as-is; each rule is a standalone
//! function so it can be revisited without touching the relay loop.

use lazy_static::lazy_static;
use regex::bytes::Regex;
use serde_json::{Map, Value};

use super::protocol::TerminalSize;

/// Artifact some client libraries emit around their resize handshake.
pub const CORRUPTION_SIGNATURE: [u8; 4] = [0xCD, 0xE4, 0xD3, 0x63];

const HIGH_BYTE_FRAME_LIMIT: usize = 50;
const ESC: u8 = 0x1B;
const OSC_BRACKET: u8 = b']';

const WIDTH_KEYS: [&str; 3] = ["Width", "width", "w"];
const HEIGHT_KEYS: [&str; 3] = ["Height", "height", "h"];

lazy_static! {
    static ref NUMERIC_RESIZE: Regex = Regex::new(r"^(\d+),(\d+)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    CorruptionSignature,
    HighByteNoise,
    EscapeSequence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeEncoding {
    /// `cols,rows`
    Numeric,
    /// `{"width":..,"height":..}` and friends
    Structured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundFrame<'a> {
    Discard(DiscardReason),
    Resize {
        size: TerminalSize,
        encoding: ResizeEncoding,
    },
    Input(&'a [u8]),
}

type Rule = for<'a> fn(&'a [u8]) -> Option<InboundFrame<'a>>;

/// Evaluated in order; anything no rule claims is raw input.
const RULES: [Rule; 5] = [
    corruption_signature,
    short_high_byte,
    escape_marker,
    numeric_resize,
    structured_resize,
];

pub fn classify(bytes: &[u8]) -> InboundFrame<'_> {
    RULES
        .iter()
        .find_map(|rule| rule(bytes))
        .unwrap_or(InboundFrame::Input(bytes))
}

fn corruption_signature(bytes: &[u8]) -> Option<InboundFrame<'_>> {
    bytes
        .starts_with(&CORRUPTION_SIGNATURE)
        .then_some(InboundFrame::Discard(DiscardReason::CorruptionSignature))
}

fn short_high_byte(bytes: &[u8]) -> Option<InboundFrame<'_>> {
    let first = *bytes.first()?;
    (bytes.len() < HIGH_BYTE_FRAME_LIMIT && first > 127)
        .then_some(InboundFrame::Discard(DiscardReason::HighByteNoise))
}

fn escape_marker(bytes: &[u8]) -> Option<InboundFrame<'_>> {
    (bytes.contains(&ESC) && bytes.contains(&OSC_BRACKET))
        .then_some(InboundFrame::Discard(DiscardReason::EscapeSequence))
}

fn numeric_resize(bytes: &[u8]) -> Option<InboundFrame<'_>> {
    let captures = NUMERIC_RESIZE.captures(bytes)?;
    let cols = parse_dimension(&captures[1])?;
    let rows = parse_dimension(&captures[2])?;
    Some(InboundFrame::Resize {
        size: TerminalSize::new(cols, rows),
        encoding: ResizeEncoding::Numeric,
    })
}

fn structured_resize(bytes: &[u8]) -> Option<InboundFrame<'_>> {
    if bytes.first() != Some(&b'{') {
        return None;
    }
    let object: Map<String, Value> = serde_json::from_slice(bytes).ok()?;
    let cols = lookup_dimension(&object, &WIDTH_KEYS)?;
    let rows = lookup_dimension(&object, &HEIGHT_KEYS)?;
    Some(InboundFrame::Resize {
        size: TerminalSize::new(cols, rows),
        encoding: ResizeEncoding::Structured,
    })
}

fn parse_dimension(digits: &[u8]) -> Option<u16> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

fn lookup_dimension(object: &Map<String, Value>, keys: &[&str]) -> Option<u16> {
    keys.iter()
        .find_map(|key| object.get(*key))
        .and_then(|value| match value {
            Value::Number(number) => number.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
}
