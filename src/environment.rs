// src/environment.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::DEFAULT_TIMEOUT_SECS;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const CONFIG_FILE: &str = "config.yaml";

/// Identity provider endpoint and credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
    /// HS256 secret; when absent tokens are decoded without signature checks.
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            jwt_secret: None,
            session_file: default_session_file(),
        }
    }
}

impl AuthSettings {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default)]
    pub auth: AuthSettings,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: AppConfig,
    production: AppConfig,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_output_path() -> PathBuf {
    PathBuf::from("output")
}

fn default_session_file() -> PathBuf {
    PathBuf::from(".resume-optimizer/session.json")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_seconds: default_timeout(),
            output_path: default_output_path(),
            auth: AuthSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration based on environment
    pub fn load() -> Result<Self> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);

        let config = if Path::new(CONFIG_FILE).exists() {
            Self::load_from_file(Path::new(CONFIG_FILE), &environment)?
        } else {
            warn!("{} not found, using built-in defaults", CONFIG_FILE);
            Self::default()
        };

        config
            .with_env_overrides(|key| std::env::var(key).ok())?
            .resolved()
    }

    fn get_environment() -> String {
        std::env::var("RESUME_OPTIMIZER_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .or_else(|_| std::env::var("ENV"))
            .unwrap_or_else(|_| "local".to_string())
    }

    pub fn load_from_file(path: &Path, environment: &str) -> Result<Self> {
        let config_content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config_file: ConfigFile = serde_yaml::from_str(&config_content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(match environment {
            "production" => config_file.production,
            _ => config_file.local,
        })
    }

    /// Applies `RESUME_API_URL`, `RESUME_API_TIMEOUT_SECS`, `AUTH_URL`,
    /// `AUTH_ANON_KEY` and `AUTH_JWT_SECRET` from `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup("RESUME_API_URL") {
            self.api_url = url;
        }
        if let Some(secs) = lookup("RESUME_API_TIMEOUT_SECS") {
            self.timeout_seconds = secs
                .trim()
                .parse()
                .with_context(|| format!("Invalid RESUME_API_TIMEOUT_SECS: {}", secs))?;
        }
        if let Some(url) = lookup("AUTH_URL") {
            self.auth.url = url;
        }
        if let Some(key) = lookup("AUTH_ANON_KEY") {
            self.auth.anon_key = key;
        }
        if let Some(secret) = lookup("AUTH_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret).filter(|s| !s.is_empty());
        }
        Ok(self)
    }

    fn resolved(mut self) -> Result<Self> {
        if self.timeout_seconds == 0 {
            anyhow::bail!("timeout_seconds must be greater than zero");
        }
        self.output_path = Self::resolve_path(&self.output_path)?;
        self.auth.session_file = Self::resolve_path(&self.auth.session_file)?;
        Ok(self)
    }

    fn resolve_path(path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            // For relative paths, resolve from current working directory
            let current_dir = std::env::current_dir().context("Failed to get current directory")?;
            Ok(current_dir.join(path))
        }
    }

    /// Ensure the output directory and the session file's directory exist
    pub async fn ensure_directories(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_path)
            .await
            .with_context(|| format!("Failed to create directory: {}", self.output_path.display()))?;

        if let Some(parent) = self.auth.session_file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        info!("All configured directories ensured to exist");
        Ok(())
    }
}
