// src/types/response.rs
use serde::{Deserialize, Serialize};

/// `missing_keywords` arrives either as a JSON array or as one string
/// (comma separated, or a bulleted list with one keyword per line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MissingKeywords {
    List(Vec<String>),
    Text(String),
}

impl MissingKeywords {
    pub fn into_keywords(self) -> Vec<String> {
        match self {
            MissingKeywords::List(items) => items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
            MissingKeywords::Text(text) => text
                .split(|c: char| c == ',' || c == '\n')
                .map(clean_keyword)
                .filter(|item| !item.is_empty())
                .collect(),
        }
    }
}

fn clean_keyword(raw: &str) -> String {
    raw.trim()
        .trim_start_matches(|c: char| c == '-' || c == '*' || c == '•')
        .trim()
        .to_string()
}

// ===== Service Response Types =====

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub missing_keywords: Option<MissingKeywords>,
    #[serde(default)]
    pub suggestions: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CoverLetterResponse {
    #[serde(default)]
    pub cover_letter: Option<String>,
}

/// Analysis as the rest of the crate sees it: keywords already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub resume_text: String,
    pub missing_keywords: Vec<String>,
    pub suggestions: String,
}

impl AnalysisResult {
    pub fn keywords_for_submission(&self) -> String {
        self.missing_keywords.join(", ")
    }
}
