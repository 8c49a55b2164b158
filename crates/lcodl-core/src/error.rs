//! Error taxonomy for archive lookups and option resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Longest slice of a response body kept in an error message.
const BODY_EXCERPT_LEN: usize = 300;

#[derive(Debug, Error)]
pub enum LcoError {
    /// Missing or invalid option.
    #[error("configuration error: {0}")]
    Config(String),

    /// Missing token, or the archive rejected it (HTTP 401/403).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Unknown request ID (HTTP 404 or no frames).
    #[error("request {0} not found")]
    NotFound(String),

    #[error("filter {filter} is not present in request {request_id}")]
    FilterNotInRequest { filter: String, request_id: String },

    /// Any other non-2xx answer; the body excerpt is kept verbatim.
    #[error("{url} returned HTTP {status}: {body}")]
    Status { url: String, status: u32, body: String },

    #[error("transfer failed for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: curl::Error,
    },

    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid URL {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A zip package failed; the message tells the user to fall back to single frames.
    #[error("{}", zip_failure_hint(.filter, .source))]
    ZipPackage {
        filter: String,
        path: PathBuf,
        #[source]
        source: Box<LcoError>,
    },

    #[error("cannot write {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LcoError {
    /// Map a non-2xx status into the taxonomy.
    pub fn from_status(url: &str, status: u32, body: &[u8], request_id: Option<&str>) -> Self {
        match status {
            401 | 403 => LcoError::Auth(format!("{} returned HTTP {}", url, status)),
            404 => LcoError::NotFound(request_id.unwrap_or(url).to_string()),
            _ => LcoError::Status {
                url: url.to_string(),
                status,
                body: body_excerpt(body),
            },
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LcoError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// True for gateway-class failures the archive reports when a zip takes too long to build.
    pub fn is_gateway_timeout(&self) -> bool {
        match self {
            LcoError::Status { status, .. } => matches!(status, 502 | 504),
            LcoError::ZipPackage { source, .. } => source.is_gateway_timeout(),
            _ => false,
        }
    }
}

fn zip_failure_hint(filter: &str, source: &LcoError) -> String {
    let cause = if source.is_gateway_timeout() {
        "the archive timed out building the zip (too many frames?)"
    } else {
        "zip download failed"
    };
    format!(
        "filter {}: {}; run again without --zipfile to download frames individually",
        filter, cause
    )
}

fn body_excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
