//! Resolved run options: command-line flags merged over the config file and defaults.

use std::path::{Path, PathBuf};

use crate::config::LcoConfig;
use crate::error::LcoError;
use crate::select::{ReductionMode, SelectionCriteria};

/// Flags as given on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct OptionArgs {
    pub request_id: String,
    pub directory: Option<PathBuf>,
    /// Empty or `None` selects every filter.
    pub filter: Option<String>,
    /// Negative selects every frame.
    pub numframes: Option<i64>,
    pub start: Option<i64>,
    pub raw: bool,
    pub count_only: bool,
    pub zipfile: bool,
    pub streams: Option<usize>,
    pub token: Option<String>,
    pub organize: bool,
}

/// Everything one run needs. Built once at startup and passed down by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub request_id: String,
    pub directory: PathBuf,
    pub filter: Option<String>,
    pub max_per_filter: Option<usize>,
    pub start: usize,
    pub mode: ReductionMode,
    pub count_only: bool,
    pub zipfile: bool,
    pub streams: usize,
    pub token: String,
    pub organize: bool,
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// `~` and `~/...` against `$HOME`; anything else is returned as is.
fn expand_home(path: &Path) -> PathBuf {
    let Some(s) = path.to_str() else {
        return path.to_path_buf();
    };
    let rest = match s.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return path.to_path_buf(),
    };
    match std::env::var_os("HOME") {
        Some(home) if rest.is_empty() => PathBuf::from(home),
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

impl Options {
    /// Merge `args` over `cfg`. Validation and the token check happen here,
    /// before any client exists.
    pub fn resolve(args: &OptionArgs, cfg: &LcoConfig) -> Result<Options, LcoError> {
        let request_id = args.request_id.trim().to_string();
        if request_id.is_empty() {
            return Err(LcoError::Config("a request ID is required (-r/--requestid)".into()));
        }
        if !request_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(LcoError::Config(format!(
                "request ID must be numeric, got {:?}",
                request_id
            )));
        }

        let start = args.start.unwrap_or(1);
        if start < 1 {
            return Err(LcoError::Config(format!("--start must be at least 1, got {}", start)));
        }

        let streams = args.streams.unwrap_or(cfg.streams);
        if streams < 1 {
            return Err(LcoError::Config("--streams must be at least 1".into()));
        }

        let max_per_filter = match args.numframes {
            Some(n) if n >= 0 => Some(n as usize),
            _ => None,
        };

        let token = non_empty(args.token.as_deref())
            .or_else(|| non_empty(cfg.token.as_deref()))
            .ok_or_else(|| {
                LcoError::Auth("no API token: pass --token or set token in config.toml".into())
            })?;

        let directory = args
            .directory
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Options {
            request_id,
            directory,
            filter: non_empty(args.filter.as_deref()),
            max_per_filter,
            start: start as usize,
            mode: ReductionMode::from_raw_flag(args.raw),
            count_only: args.count_only,
            zipfile: args.zipfile,
            streams,
            token,
            organize: args.organize,
        })
    }

    pub fn criteria(&self) -> SelectionCriteria {
        SelectionCriteria {
            filter: self.filter.clone(),
            mode: self.mode,
            start: self.start,
            max_per_filter: self.max_per_filter,
        }
    }
}
