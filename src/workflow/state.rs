// src/workflow/state.rs
//! Workflow snapshot and its transition function

use bytes::Bytes;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::{Activity, ValidationError, WorkflowError};
use crate::notifications::{Notification, NotificationKind, Notifications};
use crate::store::Reducer;
use crate::types::AnalysisResult;
use crate::upload::UploadedResume;

pub const COVER_LETTER_FILE_NAME: &str = "AI_Generated_Cover_Letter.pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Analyzing,
    Analyzed,
    GeneratingLetter,
    LetterReady,
    ExportingPdf,
    PdfReady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub bytes: Bytes,
    pub file_name: String,
    pub saved_to: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowState {
    pub resume: Option<UploadedResume>,
    pub job_description: String,
    pub analysis: Option<AnalysisResult>,
    pub cover_letter: Option<String>,
    pub artifact: Option<ExportArtifact>,
    pub activity: Option<Activity>,
    pub notifications: Notifications,
    /// Bumped on every accepted upload; completions from an older epoch are dropped.
    pub epoch: u64,
    copied: BTreeMap<String, u64>,
}

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    ResumeAccepted(UploadedResume),
    JobDescriptionChanged(String),
    Started(Activity),
    AnalysisSucceeded { epoch: u64, result: AnalysisResult },
    LetterSucceeded { epoch: u64, letter: String },
    PdfSucceeded { epoch: u64, artifact: ExportArtifact },
    AttemptFailed { epoch: u64, activity: Activity },
    Notified(Notification),
    NotificationExpired { kind: NotificationKind, id: u64 },
    Copied { tag: String, id: u64 },
    CopyExpired { tag: String, id: u64 },
}

impl WorkflowState {
    pub fn phase(&self) -> Phase {
        match self.activity {
            Some(Activity::Analyzing) => Phase::Analyzing,
            Some(Activity::GeneratingLetter) => Phase::GeneratingLetter,
            Some(Activity::ExportingPdf) => Phase::ExportingPdf,
            None if self.artifact.is_some() => Phase::PdfReady,
            None if self.cover_letter.is_some() => Phase::LetterReady,
            None if self.analysis.is_some() => Phase::Analyzed,
            None => Phase::Idle,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.activity.is_some()
    }

    pub fn is_copied(&self, tag: &str) -> bool {
        self.copied.contains_key(tag)
    }

    pub fn copied_tags(&self) -> impl Iterator<Item = &str> {
        self.copied.keys().map(String::as_str)
    }

    /// Admission check for a new action: nothing in flight and inputs present.
    fn check_can_start(&self, activity: Activity) -> Result<(), WorkflowError> {
        if let Some(running) = self.activity {
            return Err(WorkflowError::Busy { running });
        }

        match activity {
            Activity::Analyzing => {
                if self.resume.is_none() {
                    return Err(ValidationError::MissingResume.into());
                }
                if self.job_description.trim().is_empty() {
                    return Err(ValidationError::EmptyJobDescription.into());
                }
            }
            Activity::GeneratingLetter => {
                if self.analysis.is_none() {
                    return Err(ValidationError::MissingAnalysis.into());
                }
                if self.job_description.trim().is_empty() {
                    return Err(ValidationError::EmptyJobDescription.into());
                }
            }
            Activity::ExportingPdf => {
                if self
                    .cover_letter
                    .as_deref()
                    .map_or(true, |letter| letter.trim().is_empty())
                {
                    return Err(ValidationError::EmptyCoverLetter.into());
                }
            }
        }
        Ok(())
    }

    /// Completion for `activity` from `epoch`; false when it no longer applies.
    fn accepts_completion(&mut self, epoch: u64, activity: Activity) -> bool {
        if self.activity == Some(activity) {
            self.activity = None;
        }
        if epoch != self.epoch {
            warn!(
                "Dropping {} result from epoch {} (current {})",
                activity, epoch, self.epoch
            );
            return false;
        }
        true
    }
}

impl Reducer for WorkflowState {
    type Event = WorkflowEvent;
    type Error = WorkflowError;

    fn reduce(&mut self, event: WorkflowEvent) -> Result<(), WorkflowError> {
        match event {
            WorkflowEvent::ResumeAccepted(resume) => {
                debug!("Resume replaced: {}", resume.name());
                self.resume = Some(resume);
                self.analysis = None;
                self.cover_letter = None;
                self.artifact = None;
                self.epoch += 1;
                self.notifications.clear(NotificationKind::Error);
            }
            WorkflowEvent::JobDescriptionChanged(text) => {
                self.job_description = text;
            }
            WorkflowEvent::Started(activity) => {
                self.check_can_start(activity)?;
                self.activity = Some(activity);
                self.notifications.clear(NotificationKind::Error);
                if activity == Activity::Analyzing {
                    self.notifications.clear(NotificationKind::Success);
                    self.analysis = None;
                    self.cover_letter = None;
                    self.artifact = None;
                }
            }
            WorkflowEvent::AnalysisSucceeded { epoch, result } => {
                if self.accepts_completion(epoch, Activity::Analyzing) {
                    self.analysis = Some(result);
                    self.cover_letter = None;
                    self.artifact = None;
                }
            }
            WorkflowEvent::LetterSucceeded { epoch, letter } => {
                if self.accepts_completion(epoch, Activity::GeneratingLetter) {
                    self.cover_letter = Some(letter);
                    self.artifact = None;
                }
            }
            WorkflowEvent::PdfSucceeded { epoch, artifact } => {
                if self.accepts_completion(epoch, Activity::ExportingPdf) {
                    self.artifact = Some(artifact);
                }
            }
            WorkflowEvent::AttemptFailed { epoch, activity } => {
                self.accepts_completion(epoch, activity);
            }
            WorkflowEvent::Notified(notification) => {
                self.notifications.show(notification);
            }
            WorkflowEvent::NotificationExpired { kind, id } => {
                self.notifications.expire(kind, id);
            }
            WorkflowEvent::Copied { tag, id } => {
                self.copied.insert(tag, id);
            }
            WorkflowEvent::CopyExpired { tag, id } => {
                if self.copied.get(&tag) == Some(&id) {
                    self.copied.remove(&tag);
                }
            }
        }
        Ok(())
    }
}
