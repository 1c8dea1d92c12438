// src/upload.rs
//! Résumé intake: candidate files from disk or a byte stream, validated the same way

use bytes::Bytes;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::ValidationError;

pub const PDF_MIME: &str = "application/pdf";
pub const MAX_RESUME_BYTES: u64 = 10 * 1024 * 1024;

/// A file offered by the user, not yet accepted.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// File-picker path: the mime type comes from the file extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("resume")
            .to_string();
        let bytes = fs::read(path).await?;
        debug!("Read candidate {} ({} bytes)", path.display(), bytes.len());

        Ok(Self {
            mime_type: mime_for_file_name(&name).to_string(),
            name,
            bytes: Bytes::from(bytes),
        })
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// An accepted résumé. Only `ResumeValidator` builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedResume {
    name: String,
    bytes: Bytes,
}

impl UploadedResume {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn mime_type(&self) -> &'static str {
        PDF_MIME
    }
}

pub struct ResumeValidator;

impl ResumeValidator {
    /// Accepts iff the candidate is a PDF of at most 10MB.
    pub fn validate(candidate: FileCandidate) -> Result<UploadedResume, ValidationError> {
        if candidate.mime_type != PDF_MIME {
            warn!(
                "Rejected {}: unsupported type {}",
                candidate.name, candidate.mime_type
            );
            return Err(ValidationError::WrongFormat {
                received: candidate.mime_type,
            });
        }

        let size_bytes = candidate.size_bytes();
        if size_bytes > MAX_RESUME_BYTES {
            warn!(
                "Rejected {}: {:.1}MB exceeds the 10MB limit",
                candidate.name,
                size_bytes as f64 / 1024.0 / 1024.0
            );
            return Err(ValidationError::TooLarge { size_bytes });
        }

        Ok(UploadedResume {
            name: candidate.name,
            bytes: candidate.bytes,
        })
    }
}

/// Content type for a file name, by extension.
pub fn mime_for_file_name(file_name: &str) -> &'static str {
    let lower_name = file_name.to_lowercase();
    if lower_name.ends_with(".pdf") {
        PDF_MIME
    } else if lower_name.ends_with(".docx") {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    } else if lower_name.ends_with(".doc") {
        "application/msword"
    } else if lower_name.ends_with(".txt") {
        "text/plain"
    } else if lower_name.ends_with(".png") {
        "image/png"
    } else if lower_name.ends_with(".jpg") || lower_name.ends_with(".jpeg") {
        "image/jpeg"
    } else {
        "application/octet-stream"
    }
}
