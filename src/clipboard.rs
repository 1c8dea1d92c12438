// src/clipboard.rs
//! Copy-to-clipboard with a terminal escape-sequence fallback

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io::Write;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::ClipboardError;

/// How long a copied tag stays flagged.
pub const COPIED_TTL: Duration = Duration::from_millis(2_000);

const CLIPBOARD_COMMANDS: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("clip.exe", &[]),
];

#[async_trait]
pub trait ClipboardWriter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Platform clipboard through whichever clipboard command is installed.
pub struct SystemClipboard {
    command: Option<(String, Vec<String>)>,
}

impl SystemClipboard {
    pub fn detect() -> Self {
        let command = CLIPBOARD_COMMANDS
            .iter()
            .find(|(program, _)| which::which(program).is_ok())
            .map(|(program, args)| {
                (
                    program.to_string(),
                    args.iter().map(|a| a.to_string()).collect(),
                )
            });

        debug!("Clipboard command: {:?}", command.as_ref().map(|(p, _)| p));
        Self { command }
    }

    pub fn with_command(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: Some((program.into(), args)),
        }
    }
}

#[async_trait]
impl ClipboardWriter for SystemClipboard {
    fn name(&self) -> &'static str {
        "system"
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let (program, args) = self.command.as_ref().ok_or(ClipboardError::Unavailable)?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ClipboardError::CommandFailed(format!("{}: {}", program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| ClipboardError::Io(e.to_string()))?;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ClipboardError::CommandFailed(format!("{}: {}", program, e)))?;

        if !status.success() {
            return Err(ClipboardError::CommandFailed(format!(
                "{} exited with {}",
                program, status
            )));
        }
        Ok(())
    }
}

/// Legacy path: asks the terminal to set its selection (OSC 52).
pub struct Osc52Clipboard<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> Osc52Clipboard<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Osc52Clipboard<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send> ClipboardWriter for Osc52Clipboard<W> {
    fn name(&self) -> &'static str {
        "osc52"
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let sequence = format!("\x1b]52;c;{}\x07", STANDARD.encode(text));
        let mut out = self
            .out
            .lock()
            .map_err(|_| ClipboardError::Io("terminal writer poisoned".to_string()))?;
        out.write_all(sequence.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| ClipboardError::Io(e.to_string()))
    }
}

/// Primary writer first; on failure the fallback is tried once.
#[derive(Clone)]
pub struct ClipboardChain {
    primary: Arc<dyn ClipboardWriter>,
    fallback: Arc<dyn ClipboardWriter>,
}

impl ClipboardChain {
    pub fn new(primary: Arc<dyn ClipboardWriter>, fallback: Arc<dyn ClipboardWriter>) -> Self {
        Self { primary, fallback }
    }

    pub fn system() -> Self {
        Self::new(
            Arc::new(SystemClipboard::detect()),
            Arc::new(Osc52Clipboard::stdout()),
        )
    }

    /// Returns the name of the writer that succeeded.
    pub async fn copy(&self, text: &str) -> Result<&'static str, ClipboardError> {
        match self.primary.write_text(text).await {
            Ok(()) => Ok(self.primary.name()),
            Err(e) => {
                warn!(
                    "Clipboard writer '{}' failed ({}), trying '{}'",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                self.fallback.write_text(text).await?;
                Ok(self.fallback.name())
            }
        }
    }
}
