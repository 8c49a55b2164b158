//! Map transfer failures onto retry kinds.

use super::error::TransferError;
use super::policy::ErrorKind;

/// Curl failures that mean the connection dropped or never came up.
const CONNECTION_FAILURES: [fn(&curl::Error) -> bool; 7] = [
    curl::Error::is_couldnt_connect,
    curl::Error::is_couldnt_resolve_host,
    curl::Error::is_read_error,
    curl::Error::is_recv_error,
    curl::Error::is_send_error,
    curl::Error::is_got_nothing,
    curl::Error::is_partial_file,
];

/// 429/503 slow down, other 5xx are server trouble, the rest is final.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        ErrorKind::Timeout
    } else if CONNECTION_FAILURES.iter().any(|is| is(e)) {
        ErrorKind::Connection
    } else {
        ErrorKind::Other
    }
}

/// A full disk or unwritable directory will not fix itself; storage errors are final.
pub fn classify(e: &TransferError) -> ErrorKind {
    match e {
        TransferError::Curl(ce) => classify_curl_error(ce),
        TransferError::Http(code) => classify_http_status(*code),
        TransferError::Storage(_) => ErrorKind::Other,
    }
}
