// src/types/request.rs
use serde::{Deserialize, Serialize};

use super::response::AnalysisResult;

/// Body of `POST /generate_cover_letter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverLetterRequest {
    pub resume_text: String,
    pub job_description: String,
    pub missing_keywords: String,
}

impl CoverLetterRequest {
    pub fn from_analysis(analysis: &AnalysisResult, job_description: &str) -> Self {
        Self {
            resume_text: analysis.resume_text.clone(),
            job_description: job_description.trim().to_string(),
            missing_keywords: analysis.keywords_for_submission(),
        }
    }
}

/// Body of `POST /generate_pdf`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfRequest {
    pub text: String,
}
