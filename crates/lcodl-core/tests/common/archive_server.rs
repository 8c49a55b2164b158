//! Minimal HTTP/1.1 stand-in for the archive and portal APIs, for integration tests.
//!
//! Serves `/frames/` listings (paginated, token-checked), `/api/requests/{id}/`,
//! frame bodies under `/files/{name}` and `POST /frames/zip/`. Each connection
//! carries one request and is closed after the response.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct FrameSpec {
    pub id: u64,
    pub filename: String,
    pub filter: String,
    pub reduction_level: u8,
    pub body: Vec<u8>,
}

impl FrameSpec {
    pub fn new(id: u64, filter: &str, reduction_level: u8) -> Self {
        let filename = format!("cpt1m010-fa16-20220919-{:04}-e{:02}.fits.fz", id, reduction_level);
        Self {
            id,
            body: format!("SIMPLE = T / frame {}\n", id).into_bytes(),
            filename,
            filter: filter.to_string(),
            reduction_level,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveFixture {
    pub token: String,
    pub request_id: String,
    pub frames: Vec<FrameSpec>,
    /// Portal record; `None` answers 404.
    pub request_record: Option<Value>,
    /// Status for the portal endpoint instead of the record.
    pub request_status: Option<u32>,
    /// File names answered with this status instead of their body.
    pub failing_files: HashMap<String, u32>,
    /// Status for the zip endpoint instead of building a package.
    pub zip_status: Option<u32>,
}

impl ArchiveFixture {
    pub fn new(request_id: &str, frames: Vec<FrameSpec>) -> Self {
        Self {
            token: "good-token".to_string(),
            request_id: request_id.to_string(),
            frames,
            request_record: None,
            request_status: None,
            failing_files: HashMap::new(),
            zip_status: None,
        }
    }
}

/// Package returned by the zip endpoint for `ids`.
pub fn zip_body(ids: &[u64]) -> Vec<u8> {
    let list: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!("PK\u{3}\u{4}{}", list.join(",")).into_bytes()
}

pub struct ArchiveServer {
    /// Base URL, e.g. `http://127.0.0.1:12345/`.
    pub base: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl ArchiveServer {
    /// Requests seen for `path` (without query string).
    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .map(|h| h.get(path).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_file_hits(&self) -> usize {
        self.hits
            .lock()
            .map(|h| {
                h.iter()
                    .filter(|(p, _)| p.starts_with("/files/"))
                    .map(|(_, n)| *n)
                    .sum()
            })
            .unwrap_or(0)
    }
}

/// Starts the server in a background thread. It runs until the process exits.
pub fn start(fixture: ArchiveFixture) -> ArchiveServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let base = format!("http://127.0.0.1:{}/", port);
    let hits = Arc::new(Mutex::new(HashMap::new()));
    let fixture = Arc::new(fixture);
    {
        let base = base.clone();
        let hits = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let fixture = Arc::clone(&fixture);
                let hits = Arc::clone(&hits);
                let base = base.clone();
                thread::spawn(move || handle(stream, &fixture, &hits, &base));
            }
        });
    }
    ArchiveServer { base, hits }
}

struct Request {
    method: String,
    target: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Request {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };
    let head = std::str::from_utf8(&data[..header_end]).ok()?.to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = data[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }
    Some(Request {
        method,
        target,
        headers,
        body,
    })
}

fn respond(stream: &mut TcpStream, status: u32, content_type: &str, body: &[u8]) {
    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        504 => "Gateway Timeout",
        _ => "Status",
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        content_type,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}

fn respond_json(stream: &mut TcpStream, status: u32, value: &Value) {
    respond(stream, status, "application/json", value.to_string().as_bytes());
}

fn handle(
    mut stream: TcpStream,
    fixture: &ArchiveFixture,
    hits: &Mutex<HashMap<String, usize>>,
    base: &str,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    let parsed = match url::Url::parse(&format!("http://localhost{}", req.target)) {
        Ok(u) => u,
        Err(_) => return respond(&mut stream, 400, "text/plain", b"bad target"),
    };
    let path = parsed.path().to_string();
    if let Ok(mut h) = hits.lock() {
        *h.entry(path.clone()).or_insert(0) += 1;
    }

    if let Some(name) = path.strip_prefix("/files/") {
        if req.header("authorization").is_some() {
            // Pre-signed URLs reject extra credentials.
            return respond(&mut stream, 400, "text/plain", b"unexpected authorization");
        }
        if let Some(status) = fixture.failing_files.get(name) {
            return respond(&mut stream, *status, "text/plain", b"storage backend unavailable");
        }
        return match fixture.frames.iter().find(|f| f.filename == name) {
            Some(f) => respond(&mut stream, 200, "application/octet-stream", &f.body),
            None => respond(&mut stream, 404, "text/plain", b"no such file"),
        };
    }

    let expected = format!("Token {}", fixture.token);
    if req.header("authorization") != Some(expected.as_str()) {
        return respond_json(&mut stream, 401, &json!({"detail": "Invalid token."}));
    }

    match (req.method.as_str(), path.as_str()) {
        ("GET", "/frames/") => {
            let query: HashMap<String, String> = parsed.query_pairs().into_owned().collect();
            let number = |key: &str| query.get(key).and_then(|v| v.parse::<usize>().ok());
            let limit = number("limit").unwrap_or(100).max(1);
            let offset = number("offset").unwrap_or(0);
            let known = query.get("request_id") == Some(&fixture.request_id);
            let matching: Vec<&FrameSpec> = if known {
                fixture.frames.iter().collect()
            } else {
                Vec::new()
            };
            // The real archive lists newest first.
            let page: Vec<Value> = matching
                .iter()
                .rev()
                .skip(offset)
                .take(limit)
                .map(|f| frame_json(f, base))
                .collect();
            let next = (offset + limit < matching.len()).then(|| {
                format!(
                    "{}frames/?request_id={}&limit={}&offset={}",
                    base,
                    fixture.request_id,
                    limit,
                    offset + limit
                )
            });
            respond_json(
                &mut stream,
                200,
                &json!({"count": matching.len(), "next": next, "previous": null, "results": page}),
            );
        }
        ("GET", p) if p == format!("/api/requests/{}/", fixture.request_id) => {
            match (&fixture.request_record, fixture.request_status) {
                (_, Some(status)) => {
                    respond(&mut stream, status, "text/plain", b"portal unavailable")
                }
                (Some(record), None) => respond_json(&mut stream, 200, record),
                (None, None) => respond_json(&mut stream, 404, &json!({"detail": "Not found."})),
            }
        }
        ("POST", "/frames/zip/") => {
            if let Some(status) = fixture.zip_status {
                let page = b"<html>upstream timed out</html>";
                return respond(&mut stream, status, "text/html", page);
            }
            let ids: Vec<u64> = serde_json::from_slice::<Value>(&req.body)
                .ok()
                .and_then(|v| v.get("frame_ids").cloned())
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default();
            let known: HashSet<u64> = fixture.frames.iter().map(|f| f.id).collect();
            if ids.is_empty() || !ids.iter().all(|id| known.contains(id)) {
                return respond_json(&mut stream, 400, &json!({"detail": "bad frame_ids"}));
            }
            respond(&mut stream, 200, "application/zip", &zip_body(&ids));
        }
        _ => respond_json(&mut stream, 404, &json!({"detail": "Not found."})),
    }
}

fn frame_json(f: &FrameSpec, base: &str) -> Value {
    json!({
        "id": f.id,
        "basename": f.filename.trim_end_matches(".fits.fz"),
        "filename": f.filename,
        "url": format!("{}files/{}", base, f.filename),
        "primary_optical_element": f.filter,
        "reduction_level": f.reduction_level,
        "target_name": "TIC 359388309.01",
        "site_id": "cpt",
        "telescope_id": "1m0a",
        "instrument_id": "fa16",
        "observation_date": "2022-09-19T21:14:03.100000Z",
    })
}
