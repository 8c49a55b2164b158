use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default number of simultaneous frame transfers.
pub const DEFAULT_STREAMS: usize = 6;

/// The archive refuses page sizes above this.
pub const MAX_PAGE_LIMIT: usize = 1000;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per frame (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.5 = 500ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.5,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/lcodl/config.toml`.
/// Keys left out of the file take their default values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LcoConfig {
    /// Base URL of the science archive API.
    pub archive_url: String,
    /// Base URL of the observation portal (request details).
    pub portal_url: String,
    /// API token from the observing portal profile page. `--token` overrides it.
    pub token: Option<String>,
    /// Simultaneous transfers when `--streams` is not given.
    pub streams: usize,
    /// Frames requested per listing page.
    pub page_limit: usize,
    /// Optional retry policy; if missing, built-in defaults are used.
    pub retry: Option<RetryConfig>,
}

impl Default for LcoConfig {
    fn default() -> Self {
        Self {
            archive_url: "https://archive-api.lco.global".to_string(),
            portal_url: "https://observe.lco.global".to_string(),
            token: None,
            streams: DEFAULT_STREAMS,
            page_limit: MAX_PAGE_LIMIT,
            retry: None,
        }
    }
}

impl LcoConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone().unwrap_or_default().to_policy()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("lcodl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<LcoConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = LcoConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: LcoConfig = toml::from_str(&data)?;
    Ok(cfg)
}
