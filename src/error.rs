// src/error.rs
//! Error taxonomy shared by the upload stage, the gateway and the workflow engine

use std::fmt;
use thiserror::Error;

/// Input rejected before any network call is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please upload a PDF file only.")]
    WrongFormat { received: String },

    #[error("File size should be less than 10MB.")]
    TooLarge { size_bytes: u64 },

    #[error("Please upload a resume PDF first.")]
    MissingResume,

    #[error("Please enter the job description.")]
    EmptyJobDescription,

    #[error("Please run the analysis first.")]
    MissingAnalysis,

    #[error("No cover letter content to convert to PDF.")]
    EmptyCoverLetter,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::WrongFormat { .. } => "INVALID_FORMAT",
            Self::TooLarge { .. } => "FILE_TOO_LARGE",
            Self::MissingResume => "RESUME_REQUIRED",
            Self::EmptyJobDescription => "JOB_DESCRIPTION_REQUIRED",
            Self::MissingAnalysis => "ANALYSIS_REQUIRED",
            Self::EmptyCoverLetter => "COVER_LETTER_REQUIRED",
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::WrongFormat { .. } => "Export your resume as a PDF and upload it again",
            Self::TooLarge { .. } => "Compress your resume (max 10MB)",
            Self::MissingResume => "Upload a resume PDF",
            Self::EmptyJobDescription => "Paste the job description",
            Self::MissingAnalysis => "Run the analysis before generating a cover letter",
            Self::EmptyCoverLetter => "Generate a cover letter first",
        }
    }
}

/// Failure talking to the analysis backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Non-2xx response; carries the status code and raw body text.
    #[error("Server error: {status} - {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Well-formed 2xx response that breaks the backend contract.
    #[error("{0}")]
    Protocol(String),
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The three mutually exclusive in-flight actions of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activity {
    Analyzing,
    GeneratingLetter,
    ExportingPdf,
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Activity::Analyzing => "analysis",
            Activity::GeneratingLetter => "cover letter generation",
            Activity::ExportingPdf => "PDF export",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Please wait: {running} is still in progress.")]
    Busy { running: Activity },

    #[error("File error: {0}")]
    Io(String),

    /// The attempt finished after a newer upload; its result was discarded.
    #[error("The {activity} result was discarded because a newer resume was uploaded.")]
    Superseded { activity: Activity },
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Auth provider is not configured")]
    NotConfigured,

    #[error("Auth request failed with status {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Auth transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid access token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Callback URL carries no access token")]
    MissingCallbackToken,

    #[error("Session storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// True when the provider refused the credentials themselves, as opposed
    /// to a transport failure or a server-side outage.
    pub fn rejects_grant(&self) -> bool {
        matches!(self, AuthError::Provider { status: 400 | 401, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipboardError {
    #[error("No clipboard command available")]
    Unavailable,

    #[error("Clipboard command failed: {0}")]
    CommandFailed(String),

    #[error("Clipboard write failed: {0}")]
    Io(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewError {
    #[error("Popup blocked. Please allow popups for this site to use the preview feature.")]
    PopupBlocked,

    #[error("Could not write preview: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_carries_status_and_body() {
        let err = GatewayError::Http {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), "Server error: 502 - bad gateway");
    }

    #[test]
    fn test_protocol_error_is_verbatim() {
        let err = GatewayError::Protocol("The server returned an empty file.".to_string());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "The server returned an empty file.");
    }

    #[test]
    fn test_workflow_error_wraps_validation_transparently() {
        let err: WorkflowError = ValidationError::MissingResume.into();
        assert_eq!(err.to_string(), "Please upload a resume PDF first.");
    }

    #[test]
    fn test_only_refused_grants_revoke_session() {
        let refused = |status| AuthError::Provider {
            status,
            body: "invalid_grant".to_string(),
        };
        assert!(refused(400).rejects_grant());
        assert!(refused(401).rejects_grant());
        assert!(!refused(503).rejects_grant());
        assert!(!AuthError::Storage("disk full".to_string()).rejects_grant());
    }

    #[test]
    fn test_validation_codes() {
        assert_eq!(
            ValidationError::TooLarge { size_bytes: 1 }.code(),
            "FILE_TOO_LARGE"
        );
        assert_eq!(
            ValidationError::WrongFormat {
                received: "text/plain".to_string()
            }
            .code(),
            "INVALID_FORMAT"
        );
    }
}
