// ABOUTME: Terminal session registry and the authority that issues access to it

pub mod authority;
pub mod store;

pub use authority::{AccessGrant, AccessPolicy, SessionAuthority};
pub use store::{MemorySessionStore, SessionStore};
