//! Blocking HTTP transport over libcurl (curl crate).
//!
//! Every call runs on the current thread; call from `spawn_blocking` if used
//! from async code.

use curl::easy::{Easy, List};
use std::cell::Cell;
use std::io;
use std::path::Path;
use std::str;
use std::time::Duration;

use crate::batch::ByteProgressSink;
use crate::error::LcoError;
use crate::retry::{
    classify_curl_error, classify_http_status, RetryDecision, RetryPolicy, TransferError,
};
use crate::storage::PartFile;

/// Bytes of an error response body kept for diagnostics.
const MAX_ERROR_BODY: usize = 4096;

/// Buffered response of a metadata request.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u32,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Result of streaming a response body to a file.
#[derive(Debug)]
pub enum StreamOutcome {
    /// 2xx; the file is in place and this many bytes were written.
    Saved(u64),
    /// Non-2xx; nothing was written to the destination.
    Rejected { status: u32, body: Vec<u8> },
}

/// Connection settings plus the optional API token sent as `Authorization: Token <token>`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    token: Option<String>,
    retry: RetryPolicy,
    metadata_timeout: Duration,
    transfer_timeout: Duration,
}

impl HttpClient {
    pub fn new(token: Option<String>, retry: RetryPolicy) -> Self {
        Self {
            token,
            retry,
            metadata_timeout: Duration::from_secs(120),
            transfer_timeout: Duration::from_secs(7200),
        }
    }

    fn easy(
        &self,
        url: &str,
        authenticated: bool,
        timeout: Duration,
        extra_headers: &[&str],
    ) -> Result<Easy, curl::Error> {
        let mut easy = Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(Duration::from_secs(30))?;
        easy.timeout(timeout)?;
        easy.useragent(concat!("lcodl/", env!("CARGO_PKG_VERSION")))?;

        let mut list = List::new();
        // curl sends `Expect: 100-continue` for larger POST bodies; the archive does not need it.
        list.append("Expect:")?;
        if authenticated {
            if let Some(token) = &self.token {
                list.append(&format!("Authorization: Token {}", token.trim()))?;
            }
        }
        for header in extra_headers {
            list.append(header)?;
        }
        easy.http_headers(list)?;
        Ok(easy)
    }

    /// Authenticated GET, buffering the body. Non-2xx statuses are returned, not mapped.
    pub fn get(&self, url: &str) -> Result<Response, curl::Error> {
        let mut easy = self.easy(url, true, self.metadata_timeout, &[])?;
        let mut body = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }
        let status = easy.response_code()?;
        Ok(Response { status, body })
    }

    /// `get` with backoff on timeouts, connection failures, 429 and 5xx.
    /// The last response is returned as-is once retries run out.
    pub fn get_with_retry(&self, url: &str) -> Result<Response, LcoError> {
        let mut attempt = 1u32;
        loop {
            let (kind, outcome) = match self.get(url) {
                Ok(resp) if resp.is_success() => return Ok(resp),
                Ok(resp) => (classify_http_status(resp.status), Ok(resp)),
                Err(e) => (classify_curl_error(&e), Err(e)),
            };
            match self.retry.decide(attempt, kind) {
                RetryDecision::NoRetry => {
                    return outcome.map_err(|source| LcoError::Transport {
                        url: url.to_string(),
                        source,
                    })
                }
                RetryDecision::RetryAfter(d) => {
                    tracing::warn!(attempt, url, "metadata request failed ({:?}); retrying", kind);
                    std::thread::sleep(d);
                    attempt += 1;
                }
            }
        }
    }

    /// Unauthenticated GET of a frame URL into `dest` (via `dest.part`).
    pub fn download_to(&self, url: &str, dest: &Path) -> Result<u64, TransferError> {
        let mut easy = self.easy(url, false, self.transfer_timeout, &[])?;
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(Duration::from_secs(60))?;
        match stream_to_file(easy, dest, None)? {
            StreamOutcome::Saved(n) => Ok(n),
            StreamOutcome::Rejected { status, .. } => Err(TransferError::Http(status)),
        }
    }

    /// Authenticated POST of a JSON body, streaming the response into `dest`
    /// and reporting bytes written to `progress`.
    pub fn post_json_to_file(
        &self,
        url: &str,
        json: &[u8],
        dest: &Path,
        progress: &mut dyn ByteProgressSink,
    ) -> Result<StreamOutcome, TransferError> {
        let mut easy = self.easy(
            url,
            true,
            self.transfer_timeout,
            &["Content-Type: application/json"],
        )?;
        easy.post(true)?;
        easy.post_fields_copy(json)?;
        stream_to_file(easy, dest, Some(progress))
    }
}

/// Parse the status code out of an `HTTP/x y reason` header line.
fn parse_status_line(line: &[u8]) -> Option<u32> {
    let line = str::from_utf8(line).ok()?;
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Value of a `Content-Length` header line.
fn parse_content_length(line: &[u8]) -> Option<u64> {
    let line = str::from_utf8(line).ok()?;
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse().ok()
}

/// Runs the transfer. The body reaches `dest` only when the final status is 2xx;
/// otherwise the first `MAX_ERROR_BODY` bytes are kept for the error message.
fn stream_to_file(
    mut easy: Easy,
    dest: &Path,
    mut progress: Option<&mut dyn ByteProgressSink>,
) -> Result<StreamOutcome, TransferError> {
    let status = Cell::new(0u32);
    let content_length: Cell<Option<u64>> = Cell::new(None);
    let mut part: Option<PartFile> = None;
    let mut error_body: Vec<u8> = Vec::new();
    let mut storage_err: Option<io::Error> = None;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| {
            if let Some(code) = parse_status_line(line) {
                // a new response (after a redirect) starts over
                status.set(code);
                content_length.set(None);
            } else if let Some(len) = parse_content_length(line) {
                content_length.set(Some(len));
            }
            true
        })?;
        transfer.write_function(|data| {
            if !(200..300).contains(&status.get()) {
                let room = MAX_ERROR_BODY.saturating_sub(error_body.len());
                error_body.extend_from_slice(&data[..data.len().min(room)]);
                return Ok(data.len());
            }
            if part.is_none() {
                match PartFile::create(dest) {
                    Ok(p) => {
                        if let Some(sink) = progress.as_mut() {
                            sink.start(content_length.get());
                        }
                        part = Some(p);
                    }
                    Err(e) => {
                        storage_err = Some(e);
                        return Ok(0); // abort transfer
                    }
                }
            }
            let res = match part.as_mut() {
                Some(p) => p.write_chunk(data).map(|()| p.bytes_written()),
                None => Ok(0),
            };
            match res {
                Ok(written) => {
                    if let Some(sink) = progress.as_mut() {
                        sink.update(written);
                    }
                    Ok(data.len())
                }
                Err(e) => {
                    tracing::warn!("write to {} failed: {}", dest.display(), e);
                    storage_err = Some(e);
                    Ok(0)
                }
            }
        })?;
        transfer.perform()
    };

    if let Some(e) = storage_err {
        return Err(TransferError::Storage(e));
    }
    performed?;

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Ok(StreamOutcome::Rejected {
            status: code,
            body: error_body,
        });
    }
    // Empty 2xx bodies never hit the write callback.
    let part = match part {
        Some(p) => p,
        None => PartFile::create(dest)?,
    };
    let bytes = part.finalize()?;
    if let Some(sink) = progress.as_mut() {
        sink.finish(bytes);
    }
    Ok(StreamOutcome::Saved(bytes))
}
