//! Courtesy rate limit for the public W3C validator.
//!
//! The public service asks batch clients to leave at least one second
//! between requests. Every request bound for the public endpoint takes a
//! single process-wide lock, waits out [`MINIMUM_SPACING`] while holding it,
//! and keeps holding it until its response has been read. Requests to any
//! other endpoint never touch the lock.

use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::sleep;
use tracing::debug;

use crate::client::ValidatorEndpoint;

/// Minimum delay between two requests to the public endpoint
pub const MINIMUM_SPACING: Duration = Duration::from_millis(1000);

static PUBLIC_ENDPOINT_LOCK: Mutex<()> = Mutex::const_new(());

/// Held for the lifetime of one public-endpoint request
#[derive(Debug)]
pub struct ThrottlePermit {
    _guard: MutexGuard<'static, ()>,
}

/// Wait for the right to send a request to `endpoint`.
///
/// Returns `None` immediately for endpoints other than the public validator.
pub async fn acquire(endpoint: &ValidatorEndpoint) -> Option<ThrottlePermit> {
    if !endpoint.is_public() {
        return None;
    }

    let guard = PUBLIC_ENDPOINT_LOCK.lock().await;
    debug!(
        delay_ms = MINIMUM_SPACING.as_millis() as u64,
        "pacing request to the public validator"
    );
    sleep(MINIMUM_SPACING).await;
    Some(ThrottlePermit { _guard: guard })
}
