//! Retry and backoff for frame transfers.
//!
//! Classifies transfer failures (timeouts, throttling, connection drops, 5xx)
//! and decides whether another attempt is worth making.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::TransferError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
