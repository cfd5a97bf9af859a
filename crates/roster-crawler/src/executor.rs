use crate::error::{Result, ScanError};
use crate::parser::ResultParser;
use crate::retry::{navigate_with_retry, RetryPolicy};
use crate::session::SessionManager;
use crate::url_builder::DirectoryUrls;
use roster_browser::{await_ready, BrowserActions, LoadingIndicator, WaitPolicy};
use roster_core::{AppConfig, MatchedEntry, Prefix, QuerySummary, Record};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything read from one results page.
#[derive(Debug, Clone)]
pub struct QueryPage {
    pub summary: QuerySummary,
    /// Listing entries, at most the reported count
    pub entries: Vec<MatchedEntry>,
    /// Detail view rendered in place of a listing for a single match
    pub inline_record: Option<Record>,
    /// The page never reported ready and was read as-is
    pub timed_out: bool,
}

/// Runs one prefix search in a browsing context.
pub struct QueryExecutor {
    browser: Arc<dyn BrowserActions>,
    session: Arc<SessionManager>,
    parser: Arc<ResultParser>,
    urls: DirectoryUrls,
    indicator: LoadingIndicator,
    wait: WaitPolicy,
    retry: RetryPolicy,
    cap: u32,
    cancel: CancellationToken,
}

impl QueryExecutor {
    pub fn new(
        browser: Arc<dyn BrowserActions>,
        session: Arc<SessionManager>,
        parser: Arc<ResultParser>,
        urls: DirectoryUrls,
        config: &AppConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        Ok(Self {
            browser,
            session,
            parser,
            urls,
            indicator: LoadingIndicator::from_config(&config.selectors)?,
            wait: WaitPolicy::from(&config.wait),
            retry: RetryPolicy::from(&config.crawl),
            cap: config.directory.cap,
            cancel,
        })
    }

    /// Load the results page for `prefix` and summarize it.
    ///
    /// A page that never reports ready is still parsed; the summary then
    /// reflects whatever had rendered. Navigation failures surviving the
    /// retries are returned as errors.
    pub async fn run_query(&self, prefix: &Prefix) -> Result<QueryPage> {
        self.session.ensure_active().await?;

        let url = self.urls.search_url(prefix);
        tracing::debug!("Searching {:?}...", prefix.as_str());
        navigate_with_retry(self.browser.as_ref(), &url, self.retry, &self.cancel).await?;

        let snapshot = await_ready(self.browser.as_ref(), &self.indicator, self.wait, &self.cancel).await?;
        if snapshot.timed_out {
            let timeout = ScanError::ReadinessTimeout {
                context: format!("prefix {:?}", prefix.as_str()),
                waited: snapshot.elapsed,
            };
            tracing::warn!("{}", timeout);
        }

        let summary = self.parser.parse_summary(prefix, &snapshot.html, self.cap);
        tracing::debug!(
            "Searching {:?}... found {} results{}",
            prefix.as_str(),
            summary.match_count,
            if summary.is_capped { " (capped)" } else { "" }
        );

        let (entries, inline_record) = match summary.match_count {
            0 => (Vec::new(), None),
            1 => (
                self.parser.parse_entries(&snapshot.html, 1),
                self.parser.inline_record(&snapshot.html),
            ),
            count => (self.parser.parse_entries(&snapshot.html, count as usize), None),
        };

        Ok(QueryPage {
            summary,
            entries,
            inline_record,
            timed_out: snapshot.timed_out,
        })
    }
}
