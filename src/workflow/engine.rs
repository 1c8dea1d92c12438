// src/workflow/engine.rs
//! Sequences upload -> analyze -> cover letter -> PDF export

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::state::{ExportArtifact, WorkflowEvent, WorkflowState, COVER_LETTER_FILE_NAME};
use crate::clipboard::{ClipboardChain, COPIED_TTL};
use crate::core::{FsOps, ResumeBackend};
use crate::error::{Activity, ValidationError, WorkflowError};
use crate::notifications::{Notification, NotificationKind};
use crate::preview::{preview_in_new_window, DocumentOpener, SystemOpener};
use crate::store::Store;
use crate::types::{AnalysisResult, CoverLetterRequest};
use crate::upload::{FileCandidate, ResumeValidator};

/// Client-side workflow engine.
///
/// Clones share one state; at most one backend call is in flight across all of
/// them. Expiry timers need a Tokio runtime; without one, notifications simply
/// stay until replaced.
pub struct Workflow<B> {
    backend: Arc<B>,
    store: Store<WorkflowState>,
    ids: Arc<AtomicU64>,
    clipboard: ClipboardChain,
    opener: Arc<dyn DocumentOpener>,
    preview_dir: PathBuf,
}

impl<B> Clone for Workflow<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            store: self.store.clone(),
            ids: Arc::clone(&self.ids),
            clipboard: self.clipboard.clone(),
            opener: Arc::clone(&self.opener),
            preview_dir: self.preview_dir.clone(),
        }
    }
}

impl<B: ResumeBackend + 'static> Workflow<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            store: Store::new(WorkflowState::default()),
            ids: Arc::new(AtomicU64::new(1)),
            clipboard: ClipboardChain::system(),
            opener: Arc::new(SystemOpener::detect()),
            preview_dir: std::env::temp_dir().join("resume-optimizer-previews"),
        }
    }

    pub fn with_clipboard(mut self, clipboard: ClipboardChain) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn with_opener(mut self, opener: Arc<dyn DocumentOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn with_preview_dir(mut self, dir: PathBuf) -> Self {
        self.preview_dir = dir;
        self
    }

    pub fn snapshot(&self) -> WorkflowState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.store.subscribe()
    }

    // ===== Upload & input =====

    /// Single entry point for every upload path.
    pub fn submit_file(&self, candidate: FileCandidate) -> Result<(), WorkflowError> {
        let resume = match ResumeValidator::validate(candidate) {
            Ok(resume) => resume,
            Err(e) => return Err(self.reject(e.into())),
        };

        let name = resume.name().to_string();
        self.apply(WorkflowEvent::ResumeAccepted(resume));
        self.notify(
            NotificationKind::Success,
            format!("Resume \"{}\" uploaded successfully!", name),
        );
        Ok(())
    }

    /// File-picker path.
    pub async fn submit_path(&self, path: &Path) -> Result<(), WorkflowError> {
        match FileCandidate::from_path(path).await {
            Ok(candidate) => self.submit_file(candidate),
            Err(e) => Err(self.reject(WorkflowError::Io(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))),
        }
    }

    /// Drag-and-drop / stream path: the caller declares name and type.
    pub fn submit_bytes(
        &self,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Result<(), WorkflowError> {
        self.submit_file(FileCandidate::new(name, mime_type, bytes))
    }

    pub fn set_job_description(&self, text: impl Into<String>) {
        self.apply(WorkflowEvent::JobDescriptionChanged(text.into()));
    }

    // ===== Backend actions =====

    pub async fn analyze(&self) -> Result<AnalysisResult, WorkflowError> {
        let (epoch, state) = self.begin(Activity::Analyzing)?;
        let Some(resume) = state.resume else {
            return Err(self.fail(epoch, Activity::Analyzing, ValidationError::MissingResume.into()));
        };

        info!(
            "Analyzing {} against a {}-character job description",
            resume.name(),
            state.job_description.trim().len()
        );

        match self.backend.analyze(&resume, &state.job_description).await {
            Ok(result) => {
                self.apply(WorkflowEvent::AnalysisSucceeded {
                    epoch,
                    result: result.clone(),
                });
                self.succeed(epoch, Activity::Analyzing, "Resume analysis completed successfully!")?;
                Ok(result)
            }
            Err(e) => Err(self.fail(epoch, Activity::Analyzing, e.into())),
        }
    }

    pub async fn generate_cover_letter(&self) -> Result<String, WorkflowError> {
        let (epoch, state) = self.begin(Activity::GeneratingLetter)?;
        let Some(analysis) = state.analysis else {
            return Err(self.fail(
                epoch,
                Activity::GeneratingLetter,
                ValidationError::MissingAnalysis.into(),
            ));
        };

        let request = CoverLetterRequest::from_analysis(&analysis, &state.job_description);
        debug!("Cover letter keywords: {}", request.missing_keywords);

        match self.backend.generate_cover_letter(&request).await {
            Ok(letter) => {
                self.apply(WorkflowEvent::LetterSucceeded {
                    epoch,
                    letter: letter.clone(),
                });
                self.succeed(
                    epoch,
                    Activity::GeneratingLetter,
                    "Cover letter generated successfully!",
                )?;
                Ok(letter)
            }
            Err(e) => Err(self.fail(epoch, Activity::GeneratingLetter, e.into())),
        }
    }

    /// Renders the current letter to PDF and saves it into `dest_dir`.
    pub async fn download_pdf(&self, dest_dir: &Path) -> Result<PathBuf, WorkflowError> {
        let (epoch, state) = self.begin(Activity::ExportingPdf)?;
        let letter = state.cover_letter.unwrap_or_default();

        let bytes = match self.backend.generate_pdf(&letter).await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(epoch, Activity::ExportingPdf, e.into())),
        };

        let path = dest_dir.join(COVER_LETTER_FILE_NAME);
        if let Err(e) = FsOps::write_bytes(&path, &bytes).await {
            return Err(self.fail(
                epoch,
                Activity::ExportingPdf,
                WorkflowError::Io(format!("{:#}", e)),
            ));
        }

        self.apply(WorkflowEvent::PdfSucceeded {
            epoch,
            artifact: ExportArtifact {
                bytes,
                file_name: COVER_LETTER_FILE_NAME.to_string(),
                saved_to: Some(path.clone()),
            },
        });
        self.succeed(
            epoch,
            Activity::ExportingPdf,
            format!("PDF download complete: {}", path.display()),
        )?;
        Ok(path)
    }

    // ===== Helpers without backend calls =====

    /// Never returns an error; failures become an error notification.
    pub async fn preview_cover_letter(&self) -> bool {
        let letter = self.snapshot().cover_letter.unwrap_or_default();
        if letter.trim().is_empty() {
            self.notify(
                NotificationKind::Error,
                "Generate a cover letter first to preview it.",
            );
            return false;
        }

        match preview_in_new_window(self.opener.as_ref(), &letter, &self.preview_dir).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Preview failed: {}", e);
                self.notify(NotificationKind::Error, e.to_string());
                false
            }
        }
    }

    /// Copies `text`; a `tag` is flagged as copied for two seconds.
    pub async fn copy_to_clipboard(&self, text: &str, tag: Option<&str>) -> bool {
        match self.clipboard.copy(text).await {
            Ok(writer) => {
                debug!("Copied {} chars via {}", text.len(), writer);
                if let Some(tag) = tag {
                    let id = self.next_id();
                    self.apply(WorkflowEvent::Copied {
                        tag: tag.to_string(),
                        id,
                    });
                    self.schedule(
                        COPIED_TTL,
                        WorkflowEvent::CopyExpired {
                            tag: tag.to_string(),
                            id,
                        },
                    );
                }
                self.notify(NotificationKind::Success, "Copied to clipboard!");
                true
            }
            Err(e) => {
                error!("Failed to copy: {}", e);
                self.notify(
                    NotificationKind::Error,
                    "Failed to copy to clipboard. Please copy manually.",
                );
                false
            }
        }
    }

    // ===== Internals =====

    fn next_id(&self) -> u64 {
        self.ids.fetch_add(1, Ordering::Relaxed)
    }

    /// For events the reducer never rejects.
    fn apply(&self, event: WorkflowEvent) {
        if let Err(e) = self.store.dispatch(event) {
            error!("Unexpected workflow rejection: {}", e);
        }
    }

    /// Admission: marks `activity` in flight or rejects with a notification.
    fn begin(&self, activity: Activity) -> Result<(u64, WorkflowState), WorkflowError> {
        if let Err(e) = self.store.dispatch(WorkflowEvent::Started(activity)) {
            warn!("Rejected {}: {}", activity, e);
            return Err(self.reject(e));
        }
        let state = self.store.snapshot();
        Ok((state.epoch, state))
    }

    fn fail(&self, epoch: u64, activity: Activity, err: WorkflowError) -> WorkflowError {
        self.apply(WorkflowEvent::AttemptFailed { epoch, activity });
        let prefix = match activity {
            Activity::Analyzing => "Analysis failed",
            Activity::GeneratingLetter => "Failed to generate cover letter",
            Activity::ExportingPdf => "Download failed",
        };
        error!("{}: {}", prefix, err);
        self.notify(NotificationKind::Error, format!("{}: {}", prefix, err));
        err
    }

    /// Success notice, or `Superseded` when a newer upload made the result stale.
    fn succeed(
        &self,
        epoch: u64,
        activity: Activity,
        message: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        if self.store.snapshot().epoch != epoch {
            debug!("Discarding stale {} result from epoch {}", activity, epoch);
            return Err(WorkflowError::Superseded { activity });
        }
        self.notify(NotificationKind::Success, message);
        Ok(())
    }

    fn reject(&self, err: WorkflowError) -> WorkflowError {
        self.notify(NotificationKind::Error, err.to_string());
        err
    }

    fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        let notification = Notification::new(self.next_id(), kind, message);
        let (id, ttl) = (notification.id, notification.expires_after);
        self.apply(WorkflowEvent::Notified(notification));
        self.schedule(ttl, WorkflowEvent::NotificationExpired { kind, id });
    }

    fn schedule(&self, after: Duration, event: WorkflowEvent) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime; {:?} will not fire", event);
            return;
        };
        let store = self.store.clone();
        handle.spawn(async move {
            tokio::time::sleep(after).await;
            if let Err(e) = store.dispatch(event) {
                error!("Timer event rejected: {}", e);
            }
        });
    }
}
