// src/workflow/mod.rs
pub mod engine;
pub mod state;

pub use engine::Workflow;
pub use state::{ExportArtifact, Phase, WorkflowEvent, WorkflowState, COVER_LETTER_FILE_NAME};
