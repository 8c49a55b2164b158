//! Retry loop: run a closure until success or policy says stop.

use super::classify;
use super::error::TransferError;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs `f` until it succeeds or the policy says to stop.
/// On a retryable failure, sleeps for the backoff duration then tries again.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, label: &str, mut f: F) -> Result<T, TransferError>
where
    F: FnMut() -> Result<T, TransferError>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = d.as_millis() as u64,
                            "{} failed: {}; retrying",
                            label,
                            e
                        );
                        std::thread::sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}
