// src/types/mod.rs
//! Wire types exchanged with the analysis backend

pub mod request;
pub mod response;

pub use request::{CoverLetterRequest, PdfRequest};
pub use response::{AnalysisResult, AnalyzeResponse, CoverLetterResponse, MissingKeywords};
