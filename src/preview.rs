// src/preview.rs
//! Cover letter preview in a new browser window

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::core::FsOps;
use crate::error::PreviewError;

const OPENER_COMMANDS: &[&str] = &["xdg-open", "open", "wslview"];
const PREVIEW_PREFIX: &str = "cover_letter_preview_";

/// Something that can show a local document in a new browsing context.
#[async_trait]
pub trait DocumentOpener: Send + Sync {
    async fn open(&self, path: &Path) -> Result<(), PreviewError>;
}

/// Opens documents with the desktop's default handler.
pub struct SystemOpener {
    program: Option<PathBuf>,
}

impl SystemOpener {
    pub fn detect() -> Self {
        let program = OPENER_COMMANDS
            .iter()
            .find_map(|program| which::which(program).ok());
        Self { program }
    }
}

#[async_trait]
impl DocumentOpener for SystemOpener {
    async fn open(&self, path: &Path) -> Result<(), PreviewError> {
        let program = self.program.as_ref().ok_or(PreviewError::PopupBlocked)?;

        let status = Command::new(program)
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                warn!("Failed to launch {}: {}", program.display(), e);
                PreviewError::PopupBlocked
            })?;

        if status.success() {
            Ok(())
        } else {
            warn!("{} exited with {}", program.display(), status);
            Err(PreviewError::PopupBlocked)
        }
    }
}

pub fn escape_html(unsafe_text: &str) -> String {
    let mut escaped = String::with_capacity(unsafe_text.len());
    for c in unsafe_text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn render_preview_page(text: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Cover Letter Preview</title>
<style>
  body {{ font-family: 'Times New Roman', Times, serif; line-height: 1.6; padding: 40px; max-width: 800px; margin: 0 auto; }}
  pre {{ white-space: pre-wrap; word-wrap: break-word; font-family: inherit; }}
</style>
</head>
<body><pre>{}</pre></body>
</html>
"#,
        escape_html(text)
    )
}

/// Writes the escaped page under `dir` and asks `opener` to show it.
///
/// Pages from earlier previews are removed first, and the new page is removed
/// again when the opener refuses. At most one preview page stays on disk.
pub async fn preview_in_new_window(
    opener: &dyn DocumentOpener,
    text: &str,
    dir: &Path,
) -> Result<PathBuf, PreviewError> {
    remove_stale_previews(dir).await;

    let path = dir.join(format!("{}{}.html", PREVIEW_PREFIX, uuid::Uuid::new_v4()));
    FsOps::write_file_safe(&path, &render_preview_page(text))
        .await
        .map_err(|e| PreviewError::Io(format!("{:#}", e)))?;

    match opener.open(&path).await {
        Ok(()) => {
            info!("Preview opened: {}", path.display());
            Ok(path)
        }
        Err(e) => {
            FsOps::remove_file_quiet(&path).await;
            Err(e)
        }
    }
}

async fn remove_stale_previews(dir: &Path) {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(PREVIEW_PREFIX) && name.ends_with(".html") {
            debug!("Removing old preview page {}", name);
            FsOps::remove_file_quiet(&entry.path()).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    pub(crate) struct FakeOpener {
        pub blocked: bool,
        pub opened: Mutex<Vec<PathBuf>>,
    }

    impl FakeOpener {
        pub(crate) fn allowing() -> Self {
            Self {
                blocked: false,
                opened: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn blocking() -> Self {
            Self {
                blocked: true,
                opened: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DocumentOpener for FakeOpener {
        async fn open(&self, path: &Path) -> Result<(), PreviewError> {
            if self.blocked {
                return Err(PreviewError::PopupBlocked);
            }
            self.opened.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn test_escape_html_all_specials() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#039;Jerry&#039;&lt;/b&gt;"
        );
        assert_eq!(escape_html(""), "");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_page_contains_only_escaped_markup() {
        let page = render_preview_page("<script>alert(1)</script>");
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!page.contains("<script>"));
        assert!(page.contains("<title>Cover Letter Preview</title>"));
    }

    #[tokio::test]
    async fn test_preview_writes_page_and_opens_it() {
        let dir = tempfile::tempdir().unwrap();
        let opener = FakeOpener::allowing();

        let path = preview_in_new_window(&opener, "Dear Hiring Manager,", dir.path())
            .await
            .unwrap();

        assert_eq!(opener.opened.lock().unwrap().as_slice(), [path.clone()]);
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("<pre>Dear Hiring Manager,</pre>"));
    }

    #[tokio::test]
    async fn test_new_preview_replaces_old_page() {
        let dir = tempfile::tempdir().unwrap();
        let unrelated = dir.path().join("notes.html");
        std::fs::write(&unrelated, "keep me").unwrap();
        let opener = FakeOpener::allowing();

        let first = preview_in_new_window(&opener, "first draft", dir.path())
            .await
            .unwrap();
        let second = preview_in_new_window(&opener, "second draft", dir.path())
            .await
            .unwrap();

        assert!(!first.exists());
        assert!(second.exists());
        assert!(unrelated.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_blocked_preview_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let opener = FakeOpener::blocking();

        let err = preview_in_new_window(&opener, "text", dir.path())
            .await
            .unwrap_err();

        assert_eq!(err, PreviewError::PopupBlocked);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_opener_reports_popup_blocked() {
        let opener = SystemOpener { program: None };
        let err = opener.open(Path::new("/tmp/x.html")).await.unwrap_err();
        assert_eq!(err, PreviewError::PopupBlocked);
    }
}
