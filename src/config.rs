//! TOML configuration for netverdict.
//!
//! Every field has a default, so an empty or partial file is valid. The
//! config file is found through an explicit path, the `NETVERDICT_CONFIG`
//! environment variable, or `./netverdict.toml`, in that order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "NETVERDICT_CONFIG";
pub const LOCAL_CONFIG: &str = "netverdict.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve the configuration for this process.
    ///
    /// The first source present wins and must load: an explicit path, then
    /// the `NETVERDICT_CONFIG` path, then `./netverdict.toml`. Defaults apply
    /// only when none of them is present.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::resolve_from(explicit, env_path.as_deref(), Path::new(LOCAL_CONFIG))
    }

    fn resolve_from(
        explicit: Option<&Path>,
        env_path: Option<&Path>,
        local: &Path,
    ) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Some(path) = env_path {
            return Self::load(path).with_context(|| format!("{} is set but unusable", CONFIG_ENV));
        }

        if local.exists() {
            return Self::load(local);
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }

    pub fn log_summary(&self) {
        info!(
            bind = %self.server.bind,
            artifacts = %self
                .artifacts
                .dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "<embedded>".to_string()),
            db_path = %self.storage.db_path,
            "configuration"
        );
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP API listens on.
    pub bind: String,
    /// Identity recorded when a request carries no `x-user-id` header.
    pub default_user: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            default_user: "anonymous".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory holding `model.json`, `scaler.json` and the optional
    /// `labels.json` / `vocabularies.json`. Unset means the embedded
    /// reference artifacts.
    pub dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "data/netverdict.db".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable logs.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
