//! Per-frame transfer error, kept unflattened so it can be classified for retry.

use std::fmt;

#[derive(Debug)]
pub enum TransferError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    Http(u32),
    /// Writing the `.part` file or renaming it into place failed. Not retried.
    Storage(std::io::Error),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Curl(e) => write!(f, "{}", e),
            TransferError::Http(code) => write!(f, "HTTP {}", code),
            TransferError::Storage(e) => write!(f, "storage: {}", e),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransferError::Curl(e) => Some(e),
            TransferError::Storage(e) => Some(e),
            TransferError::Http(_) => None,
        }
    }
}

impl From<curl::Error> for TransferError {
    fn from(e: curl::Error) -> Self {
        TransferError::Curl(e)
    }
}

impl From<std::io::Error> for TransferError {
    fn from(e: std::io::Error) -> Self {
        TransferError::Storage(e)
    }
}
