//! Client for the LCO science archive and observation portal.
//!
//! Lists the frames of a request (following pagination), fetches the portal
//! record of the request, and asks the archive to package frames as a zip.

mod model;
mod request_info;

pub use model::{Frame, FramePage, RAW_LEVEL, REDUCED_LEVEL};
pub use request_info::{FilterExposure, RequestInfo};

use serde::de::DeserializeOwned;
use std::path::Path;
use url::Url;

use crate::batch::{ByteProgressSink, FrameFetcher};
use crate::config::{LcoConfig, MAX_PAGE_LIMIT};
use crate::error::LcoError;
use crate::http::{HttpClient, StreamOutcome};
use crate::retry::TransferError;

/// Blocking archive client; cheap to share across worker threads by reference.
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    http: HttpClient,
    archive_url: Url,
    portal_url: Url,
    page_limit: usize,
}

/// Parse a base URL so that `join("frames/")` appends instead of replacing the last segment.
fn base_url(raw: &str) -> Result<Url, LcoError> {
    let mut s = raw.trim().to_string();
    if !s.ends_with('/') {
        s.push('/');
    }
    Url::parse(&s).map_err(|source| LcoError::Url {
        url: raw.to_string(),
        source,
    })
}

fn join(base: &Url, path: &str) -> Result<Url, LcoError> {
    base.join(path).map_err(|source| LcoError::Url {
        url: format!("{}{}", base, path),
        source,
    })
}

impl ArchiveClient {
    pub fn new(cfg: &LcoConfig, token: Option<String>) -> Result<Self, LcoError> {
        Ok(Self {
            http: HttpClient::new(token, cfg.retry_policy()),
            archive_url: base_url(&cfg.archive_url)?,
            portal_url: base_url(&cfg.portal_url)?,
            page_limit: cfg.page_limit.clamp(1, MAX_PAGE_LIMIT),
        })
    }

    /// First listing page for a request.
    pub fn frames_url(&self, request_id: &str) -> Result<Url, LcoError> {
        let mut url = join(&self.archive_url, "frames/")?;
        url.query_pairs_mut()
            .append_pair("request_id", request_id)
            .append_pair("limit", &self.page_limit.to_string())
            .append_pair("offset", "0");
        Ok(url)
    }

    pub fn request_url(&self, request_id: &str) -> Result<Url, LcoError> {
        join(&self.portal_url, &format!("api/requests/{}/", request_id))
    }

    pub fn zip_url(&self) -> Result<Url, LcoError> {
        join(&self.archive_url, "frames/zip/")
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, request_id: &str) -> Result<T, LcoError> {
        let resp = self.http.get_with_retry(url)?;
        if !resp.is_success() {
            return Err(LcoError::from_status(url, resp.status, &resp.body, Some(request_id)));
        }
        serde_json::from_slice(&resp.body).map_err(|source| LcoError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// All frames of `request_id`, raw and reduced, sorted by basename.
    /// An empty listing is reported as `NotFound`.
    pub fn list_frames(&self, request_id: &str) -> Result<Vec<Frame>, LcoError> {
        let mut frames: Vec<Frame> = Vec::new();
        let mut next = Some(self.frames_url(request_id)?.to_string());
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            let page: FramePage = self.get_json(&url, request_id)?;
            pages += 1;
            tracing::debug!(
                url = %url,
                results = page.results.len(),
                count = ?page.count,
                "fetched frame page"
            );
            let empty_page = page.results.is_empty();
            frames.extend(page.results);
            next = page.next.filter(|n| !empty_page && *n != url);
        }

        if frames.is_empty() {
            return Err(LcoError::NotFound(request_id.to_string()));
        }
        frames.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
        tracing::info!(request_id, frames = frames.len(), pages, "listed request frames");
        Ok(frames)
    }

    pub fn request_info(&self, request_id: &str) -> Result<RequestInfo, LcoError> {
        let url = self.request_url(request_id)?.to_string();
        let record = self.get_json(&url, request_id)?;
        Ok(RequestInfo::from_record(record))
    }

    /// Ask the archive to zip `frames` and stream the package into `dest`,
    /// reporting received bytes to `progress`.
    ///
    /// Large packages can hit the archive's gateway timeout; that status and
    /// its body come back unchanged as `LcoError::Status`.
    pub fn download_zip(
        &self,
        frames: &[Frame],
        dest: &Path,
        progress: &mut dyn ByteProgressSink,
    ) -> Result<u64, LcoError> {
        let url = self.zip_url()?.to_string();
        let ids: Vec<u64> = frames.iter().map(|f| f.id).collect();
        let body = serde_json::to_vec(&serde_json::json!({ "frame_ids": ids })).map_err(|source| {
            LcoError::Decode {
                url: url.clone(),
                source,
            }
        })?;

        tracing::info!(frames = ids.len(), dest = %dest.display(), "requesting zip package");
        match self.http.post_json_to_file(&url, &body, dest, progress) {
            Ok(StreamOutcome::Saved(bytes)) => Ok(bytes),
            Ok(StreamOutcome::Rejected { status, body }) => {
                Err(LcoError::from_status(&url, status, &body, None))
            }
            Err(TransferError::Curl(source)) => Err(LcoError::Transport { url, source }),
            Err(TransferError::Storage(source)) => Err(LcoError::filesystem(dest, source)),
            Err(TransferError::Http(status)) => Err(LcoError::from_status(&url, status, b"", None)),
        }
    }
}

impl FrameFetcher for ArchiveClient {
    fn fetch(&self, frame: &Frame, dest: &Path) -> Result<u64, TransferError> {
        self.http.download_to(&frame.url, dest)
    }
}
