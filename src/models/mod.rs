// ABOUTME: Core data models for gateway sessions and the containers they target

pub mod container;
pub mod session;

pub use container::{find_container, ContainerInfo};
pub use session::SessionRecord;
