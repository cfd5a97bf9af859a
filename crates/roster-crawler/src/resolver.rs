use crate::error::{Result, ScanError};
use crate::parser::{MissingField, ResultParser};
use crate::retry::{navigate_with_retry, RetryPolicy};
use crate::session::SessionManager;
use crate::url_builder::DirectoryUrls;
use roster_browser::{await_departure, await_ready, BrowserActions, BrowserError, LoadingIndicator, WaitPolicy};
use roster_core::{AppConfig, DetailRoute, MatchedEntry, Record};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Opens detail views and reads full records. Requires an authenticated session.
pub struct DetailResolver {
    browser: Arc<dyn BrowserActions>,
    session: Arc<SessionManager>,
    parser: Arc<ResultParser>,
    urls: DirectoryUrls,
    indicator: LoadingIndicator,
    wait: WaitPolicy,
    retry: RetryPolicy,
    go_back: String,
    cancel: CancellationToken,
}

impl DetailResolver {
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
            go_back: config.selectors.go_back.clone(),
            cancel,
        })
    }

    /// Resolve one listing entry into a full record.
    ///
    /// An incomplete detail view yields [`Record::placeholder`], which callers
    /// skip. A lost session is an error. The listing is restored afterwards so
    /// the next entry of the same listing stays reachable.
    pub async fn resolve(&self, entry: &MatchedEntry) -> Result<Record> {
        self.session.require_authenticated().await?;

        let route = self.open(entry).await?;

        let snapshot = await_ready(self.browser.as_ref(), &self.indicator, self.wait, &self.cancel).await?;
        if snapshot.timed_out {
            let timeout = ScanError::ReadinessTimeout {
                context: format!("detail of {:?}", entry.name),
                waited: snapshot.elapsed,
            };
            tracing::warn!("{}", timeout);
        }

        let url = self.browser.current_url().await?;
        self.session.observe_privileged(&url, &snapshot.html).await?;

        let record = match self.parser.extract_record(&snapshot.html) {
            Ok(record) => record,
            Err(MissingField(field)) => {
                let failure = ScanError::FieldExtraction {
                    entry: entry.name.clone(),
                    field,
                };
                tracing::warn!("{}", failure);
                Record::placeholder()
            }
        };

        self.return_to_listing(&route, &url).await?;

        tracing::trace!("Resolved {:?}", entry.name);
        Ok(record)
    }

    /// Bring up the detail view, returning the route actually taken.
    async fn open(&self, entry: &MatchedEntry) -> Result<DetailRoute> {
        match &entry.route {
            DetailRoute::Link(url) => {
                navigate_with_retry(self.browser.as_ref(), url, self.retry, &self.cancel).await?;
                Ok(entry.route.clone())
            }
            DetailRoute::Click { selector } => match self.browser.click(selector).await {
                Ok(()) => Ok(entry.route.clone()),
                Err(BrowserError::SelectorNotFound(_)) => {
                    tracing::debug!("Listing entry {:?} not clickable, using term search", entry.name);
                    self.open_by_term(&entry.name).await
                }
                Err(e) => Err(e.into()),
            },
            DetailRoute::TermSearch => self.open_by_term(&entry.name).await,
        }
    }

    async fn open_by_term(&self, name: &str) -> Result<DetailRoute> {
        let url = self.urls.term_url(name);
        navigate_with_retry(self.browser.as_ref(), &url, self.retry, &self.cancel).await?;
        Ok(DetailRoute::TermSearch)
    }

    /// Leave the detail view. In-page views close through the back control,
    /// linked ones through session history. Term searches replaced the listing
    /// and have nothing to return to.
    async fn return_to_listing(&self, route: &DetailRoute, detail_url: &str) -> Result<()> {
        match route {
            DetailRoute::Click { .. } => match self.browser.click(&self.go_back).await {
                Ok(()) => {}
                Err(BrowserError::SelectorNotFound(_)) => self.browser.go_back().await?,
                Err(e) => return Err(e.into()),
            },
            DetailRoute::Link(_) => {
                self.browser.go_back().await?;
                await_departure(self.browser.as_ref(), detail_url, self.wait, &self.cancel).await?;
            }
            DetailRoute::TermSearch => return Ok(()),
        }
        await_ready(self.browser.as_ref(), &self.indicator, self.wait, &self.cancel).await?;
        Ok(())
    }
}
