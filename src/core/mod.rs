// src/core/mod.rs
//! Backend gateway and file system helpers

pub mod fs_ops;
pub mod service_client;

pub use fs_ops::FsOps;
pub use service_client::{ResumeBackend, ServiceClient, DEFAULT_TIMEOUT_SECS};
