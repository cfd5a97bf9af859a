//! Navigation with retry and linear backoff.

use roster_browser::{BrowserActions, BrowserError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Attempts and base delay of a retried navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failure; later failures wait a multiple of it
    pub base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before attempt `attempt + 1` (0-based `attempt` just failed).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * (attempt + 1)
    }
}

impl From<&roster_core::CrawlConfig> for RetryPolicy {
    fn from(config: &roster_core::CrawlConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.retry_delay_ms))
    }
}

/// Errors worth another attempt. Bad selectors and cancellation are not.
fn is_transient(error: &BrowserError) -> bool {
    matches!(
        error,
        BrowserError::ChromiumError(_) | BrowserError::NavigationError(_) | BrowserError::Timeout(_)
    )
}

/// Navigate to `url`, retrying transient failures.
///
/// Returns the last error once every attempt has failed.
pub async fn navigate_with_retry<B>(
    browser: &B,
    url: &str,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> Result<(), BrowserError>
where
    B: BrowserActions + ?Sized,
{
    let mut attempt = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(BrowserError::Cancelled);
        }

        match browser.navigate(url).await {
            Ok(()) => return Ok(()),
            Err(e) if is_transient(&e) && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    "Navigation to {} failed (attempt {}/{}), retrying in {:?}: {}",
                    url,
                    attempt + 1,
                    policy.max_attempts,
                    delay,
                    e
                );
                tokio::select! {
                    () = cancel.cancelled() => return Err(BrowserError::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
