pub mod app;
pub mod auth;
pub mod cli;
pub mod clipboard;
pub mod core;
pub mod environment;
pub mod error;
pub mod notifications;
pub mod preview;
pub mod report;
pub mod router;
pub mod session;
pub mod store;
pub mod types;
pub mod upload;
pub mod workflow;

pub use crate::app::App;
pub use crate::core::{ResumeBackend, ServiceClient};
pub use crate::environment::AppConfig;
pub use crate::error::{GatewayError, ValidationError, WorkflowError};
pub use crate::workflow::{Phase, Workflow, WorkflowState};
