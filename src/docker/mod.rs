// ABOUTME: Docker integration: container discovery and interactive exec sessions

pub mod container_manager;
pub mod exec_session;

pub use container_manager::ContainerManager;
pub use exec_session::ExecResizer;
