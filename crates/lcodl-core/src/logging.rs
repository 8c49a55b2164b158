//! Tracing setup. Logs go to `lcodl.log` under the XDG state directory so that
//! stdout stays free for counts and progress; stderr is the fallback.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info,lcodl=debug,lcodl_core=debug";

const LOG_FILE: &str = "lcodl.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// `$XDG_STATE_HOME/lcodl/lcodl.log`
pub fn log_file_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("lcodl")?;
    Ok(dirs.get_state_home().join(LOG_FILE))
}

/// Per-event handle on the shared log file; a failed clone degrades to stderr for that event.
struct SharedFile(File);

enum EventWriter {
    File(File),
    Stderr(io::Stderr),
}

impl io::Write for EventWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            EventWriter::File(f) => f.write(buf),
            EventWriter::Stderr(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            EventWriter::File(f) => f.flush(),
            EventWriter::Stderr(e) => e.flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for SharedFile {
    type Writer = EventWriter;

    fn make_writer(&'a self) -> Self::Writer {
        match self.0.try_clone() {
            Ok(f) => EventWriter::File(f),
            Err(_) => EventWriter::Stderr(io::stderr()),
        }
    }
}

fn install(writer: BoxMakeWriter) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing subscriber: {}", e))
}

/// Append to the log file, creating its directory. Returns the file's path.
/// An error leaves no subscriber installed, so the caller can fall back to `init_logging_stderr`.
pub fn init_logging() -> Result<PathBuf> {
    let path = log_file_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;

    install(BoxMakeWriter::new(SharedFile(file)))?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "lcodl logging to {}", path.display());
    Ok(path)
}

pub fn init_logging_stderr() {
    let _ = install(BoxMakeWriter::new(io::stderr));
}
