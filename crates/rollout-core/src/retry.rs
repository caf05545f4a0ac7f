use crate::error::{Result, RolloutError};
use std::time::Duration;

pub const DEFAULT_ATTEMPTS: u32 = 10;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

/// Call `op` up to `attempts` times with a fixed `delay` between failures.
///
/// Everything wrapped here is an idempotent read or a submission the remote
/// end de-duplicates by content, so a flat delay is enough and there is no
/// backoff growth. After the last failure the error is rethrown wrapped with
/// `label`.
pub fn with_retry<T>(
    label: &str,
    attempts: u32,
    delay: Duration,
    mut op: impl FnMut() -> Result<T>,
) -> Result<T> {
    let attempts = attempts.max(1);
    let mut last_error = None;
    for attempt in 1..=attempts {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) => {
                tracing::warn!(label, attempt, attempts, error = %e, "attempt failed");
                last_error = Some(e);
                if attempt < attempts {
                    std::thread::sleep(delay);
                }
            }
        }
    }
    Err(RolloutError::RetriesExhausted {
        label: label.to_string(),
        attempts,
        last_error: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    })
}
