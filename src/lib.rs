// ABOUTME: Library crate for the shell gateway: short-lived, token-gated terminal access to containers

//! Issues single-use terminal tokens for running containers and bridges
//! WebSocket connections to interactive exec sessions inside them.

pub mod api;
pub mod config;
pub mod docker;
pub mod error;
pub mod models;
pub mod runtime;
pub mod session;
pub mod terminal;
pub mod token;

pub use error::GatewayError;
