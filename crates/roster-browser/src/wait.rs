//! Page readiness polling.
//!
//! The directory renders results client-side and exposes no completion event,
//! only a loading indicator whose inline style flips while it works. Every
//! navigation therefore waits here: re-fetch the document, inspect the
//! indicator, sleep a short interval, until ready or the bound runs out.

use crate::actions::BrowserActions;
use crate::dom::parse_selector;
use crate::error::{BrowserError, Result};
use roster_core::{SelectorConfig, WaitConfig};
use scraper::{Html, Selector};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Bounds of one readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Give up (best effort) after this long
    pub max_wait: Duration,
    /// Delay between two checks
    pub poll_interval: Duration,
}

impl WaitPolicy {
    #[must_use]
    pub fn new(max_wait: Duration, poll_interval: Duration) -> Self {
        Self {
            max_wait,
            poll_interval,
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::from(&WaitConfig::default())
    }
}

impl From<&WaitConfig> for WaitPolicy {
    fn from(config: &WaitConfig) -> Self {
        Self::new(config.max_wait(), config.poll_interval())
    }
}

/// The loading indicator and the style token that marks it busy.
#[derive(Debug, Clone)]
pub struct LoadingIndicator {
    selector: Selector,
    busy_token: String,
}

impl LoadingIndicator {
    pub fn new(selector: &str, busy_token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            selector: parse_selector(selector)?,
            busy_token: busy_token.into().to_lowercase(),
        })
    }

    pub fn from_config(selectors: &SelectorConfig) -> Result<Self> {
        Self::new(&selectors.loading_indicator, selectors.busy_token.as_str())
    }

    /// Whether the document is still rendering.
    ///
    /// An absent indicator counts as done, as does one whose inline style no
    /// longer mentions the busy token.
    #[must_use]
    pub fn is_busy(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        document
            .select(&self.selector)
            .next()
            .and_then(|el| el.value().attr("style"))
            .is_some_and(|style| style.to_lowercase().contains(&self.busy_token))
    }
}

/// Document state returned by a wait.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    /// Latest fetched document
    pub html: String,
    /// The bound elapsed before the page reported ready
    pub timed_out: bool,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of fetches performed
    pub polls: u32,
}

/// Re-fetch until `ready` accepts the document or the policy bound elapses.
///
/// Never fails because of the bound: on timeout the latest document is returned
/// with `timed_out` set. Fetch errors and cancellation are propagated.
pub async fn poll_until<F, Fut, P>(
    mut fetch: F,
    mut ready: P,
    policy: WaitPolicy,
    cancel: &CancellationToken,
) -> Result<PageSnapshot>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
    P: FnMut(&str) -> bool,
{
    let start = Instant::now();
    let mut polls = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(BrowserError::Cancelled);
        }

        let html = fetch().await?;
        polls += 1;

        let elapsed = start.elapsed();
        if ready(&html) {
            tracing::trace!("Page ready after {:?} ({} polls)", elapsed, polls);
            return Ok(PageSnapshot {
                html,
                timed_out: false,
                elapsed,
                polls,
            });
        }

        if elapsed >= policy.max_wait {
            tracing::debug!("Page not ready after {:?}, using latest document", elapsed);
            return Ok(PageSnapshot {
                html,
                timed_out: true,
                elapsed,
                polls,
            });
        }

        let nap = policy.poll_interval.min(policy.max_wait - elapsed);
        tokio::select! {
            () = cancel.cancelled() => return Err(BrowserError::Cancelled),
            () = tokio::time::sleep(nap) => {}
        }
    }
}

/// Wait until the current page of `browser` stops showing the loading indicator.
pub async fn await_ready<B>(
    browser: &B,
    indicator: &LoadingIndicator,
    policy: WaitPolicy,
    cancel: &CancellationToken,
) -> Result<PageSnapshot>
where
    B: BrowserActions + ?Sized,
{
    poll_until(
        || browser.content(),
        |html| !indicator.is_busy(html),
        policy,
        cancel,
    )
    .await
}

/// Wait until `browser` has left `from_url`.
///
/// History navigation returns before the previous entry is restored, so a
/// readiness check right after it may still see the page being left. The
/// snapshot carries the latest URL instead of a document.
pub async fn await_departure<B>(
    browser: &B,
    from_url: &str,
    policy: WaitPolicy,
    cancel: &CancellationToken,
) -> Result<PageSnapshot>
where
    B: BrowserActions + ?Sized,
{
    let snapshot = poll_until(|| browser.current_url(), |url| url != from_url, policy, cancel).await?;
    if snapshot.timed_out {
        tracing::debug!("Still on {} after {:?}", from_url, snapshot.elapsed);
    }
    Ok(snapshot)
}
