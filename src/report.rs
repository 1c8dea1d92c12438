// src/report.rs
//! Plain-text rendering of workflow results for the terminal

use crate::error::WorkflowError;
use crate::notifications::{Notification, NotificationKind};
use crate::types::AnalysisResult;

/// One `[keyword]` chip per missing keyword.
pub fn keyword_chips(keywords: &[String]) -> Vec<String> {
    keywords.iter().map(|kw| format!("[{}]", kw)).collect()
}

pub fn render_analysis(analysis: &AnalysisResult) -> String {
    let mut out = String::new();

    out.push_str("Missing keywords\n");
    out.push_str("----------------\n");
    if analysis.missing_keywords.is_empty() {
        out.push_str("None - your resume already covers the job description.\n");
    } else {
        out.push_str(&keyword_chips(&analysis.missing_keywords).join(" "));
        out.push('\n');
    }

    out.push('\n');
    out.push_str("Suggestions\n");
    out.push_str("-----------\n");
    let suggestions = analysis.suggestions.trim();
    if suggestions.is_empty() {
        out.push_str("No suggestions returned.\n");
    } else {
        out.push_str(suggestions);
        out.push('\n');
    }
    out
}

pub fn render_cover_letter(letter: &str) -> String {
    format!("Cover letter\n------------\n{}\n", letter.trim_end())
}

pub fn render_notification(notification: &Notification) -> String {
    match notification.kind {
        NotificationKind::Success => format!("✓ {}", notification.message),
        NotificationKind::Error => format!("✗ {}", notification.message),
    }
}

/// Suggested fix for input errors, tagged with the validation code.
pub fn render_validation_hint(err: &WorkflowError) -> Option<String> {
    match err {
        WorkflowError::Validation(e) => Some(format!("💡 {} [{}]", e.suggestion(), e.code())),
        _ => None,
    }
}
