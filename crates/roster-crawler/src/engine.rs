//! Depth-first enumeration of a letter range.
//!
//! The walk keeps an explicit stack of prefixes still to query, seeded with the
//! range's letters in reverse so they pop in alphabet order. A capped prefix
//! pushes its children the same way, which yields records in lexicographic
//! prefix order. Records are produced lazily, one `next_record` at a time.
//!
//! Children only cover names that continue with an alphabet character. Below
//! each capped prefix's children the walk leaves a settle frame holding the
//! prefix's visible listing; once the children are done, any of those entries
//! no descendant listed (a name equal to the prefix, or one continuing with a
//! character outside the alphabet) is kept from the parent's page.

use crate::error::Result;
use crate::executor::{QueryExecutor, QueryPage};
use crate::parser::ResultParser;
use crate::partition::{Outcome, Partitioner};
use crate::report::{Accumulator, CrawlInterrupted, CrawlReport, CrawlStats};
use crate::resolver::DetailResolver;
use crate::session::SessionManager;
use crate::url_builder::DirectoryUrls;
use futures::stream::{self, Stream};
use roster_browser::{BrowserActions, BrowserError};
use roster_core::{Alphabet, AppConfig, CrawlId, DetailRoute, MatchedEntry, Prefix, Record, Timestamp};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Drives one browsing context through a prefix walk.
pub struct EnumerationEngine {
    session: Arc<SessionManager>,
    executor: QueryExecutor,
    resolver: DetailResolver,
    partitioner: Partitioner,
    cancel: CancellationToken,
}

impl EnumerationEngine {
    /// Wire an engine around `browser`. The engine owns the session of that
    /// browsing context; authenticate it through [`Self::session`].
    pub fn new(
        browser: Arc<dyn BrowserActions>,
        config: &AppConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let urls = DirectoryUrls::new(&config.directory)?;
        let parser = Arc::new(ResultParser::new(&config.selectors, urls.clone())?);
        let session = Arc::new(SessionManager::new(
            browser.clone(),
            parser.clone(),
            &urls,
            config,
            cancel.clone(),
        ));

        let executor = QueryExecutor::new(
            browser.clone(),
            session.clone(),
            parser.clone(),
            urls.clone(),
            config,
            cancel.clone(),
        )?;
        let resolver = DetailResolver::new(browser, session.clone(), parser, urls, config, cancel.clone())?;

        Ok(Self {
            session,
            executor,
            resolver,
            partitioner: Partitioner::new(config.crawl.alphabet.clone(), config.crawl.max_depth),
            cancel,
        })
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    #[must_use]
    pub fn alphabet(&self) -> &Alphabet {
        self.partitioner.alphabet()
    }

    /// Start a walk over the first letters `start..=end`.
    ///
    /// # Errors
    /// Fails before any query if the range is not a valid alphabet slice, or if
    /// details are requested without an authenticated session.
    pub async fn enumerate(&self, start: char, end: char, resolve_details: bool) -> Result<Walk<'_>> {
        let letters = self.alphabet().range(start, end)?;

        if resolve_details {
            self.session.require_authenticated().await?;
        }

        let stack = letters
            .iter()
            .rev()
            .map(|&c| Frame::Query(Prefix::root().child(c)))
            .collect();
        Ok(Walk {
            engine: self,
            stack,
            pending: VecDeque::new(),
            listed: HashSet::new(),
            resolve_details,
            seen: Accumulator::new(),
            stats: CrawlStats::default(),
            finished: false,
        })
    }

    /// Run a whole walk and gather its records.
    ///
    /// A fatal error ends the crawl with [`CrawlInterrupted`], which still
    /// carries every record emitted before it.
    pub async fn collect(
        &self,
        start: char,
        end: char,
        resolve_details: bool,
    ) -> std::result::Result<CrawlReport, CrawlInterrupted> {
        let crawl_id = CrawlId::generate();
        let span = tracing::info_span!("crawl", id = %crawl_id, range = %format!("{start}-{end}"));
        let mut report = CrawlReport::new(crawl_id, Timestamp::now());

        async move {
            tracing::info!(
                "Enumerating {}..{} ({})",
                start,
                end,
                if resolve_details { "with details" } else { "listing only" }
            );

            let mut walk = match self.enumerate(start, end, resolve_details).await {
                Ok(walk) => walk,
                Err(cause) => return Err(CrawlInterrupted { report, cause }),
            };

            let outcome = loop {
                match walk.next_record().await {
                    Ok(Some(record)) => report.records.push(record),
                    Ok(None) => break Ok(()),
                    Err(cause) => break Err(cause),
                }
            };

            report.stats = walk.stats().clone();
            report.finished_at = Timestamp::now();

            match outcome {
                Ok(()) => {
                    tracing::info!(
                        "Enumeration complete: {} records from {} queries",
                        report.records.len(),
                        report.stats.queries
                    );
                    Ok(report)
                }
                Err(cause) => {
                    tracing::error!(
                        "Enumeration interrupted after {} records: {}",
                        report.records.len(),
                        cause
                    );
                    Err(CrawlInterrupted { report, cause })
                }
            }
        }
        .instrument(span)
        .await
    }
}

enum Frame {
    Query(Prefix),
    /// Revisit a capped prefix's listing once its children are done
    Settle {
        prefix: Prefix,
        entries: Vec<MatchedEntry>,
    },
}

enum Pending {
    Ready(Record),
    Resolve(MatchedEntry),
}

/// An in-progress walk. Yields each record once, in prefix order.
pub struct Walk<'a> {
    engine: &'a EnumerationEngine,
    stack: Vec<Frame>,
    pending: VecDeque<Pending>,
    /// Listing names already queued, whichever prefix showed them
    listed: HashSet<String>,
    resolve_details: bool,
    seen: Accumulator,
    stats: CrawlStats,
    finished: bool,
}

impl<'a> Walk<'a> {
    #[must_use]
    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    /// The next record, `None` once the range is exhausted.
    ///
    /// A fatal error ends the walk; later calls return `None`.
    pub async fn next_record(&mut self) -> Result<Option<Record>> {
        if self.finished {
            return Ok(None);
        }
        match self.advance().await {
            Ok(Some(record)) => Ok(Some(record)),
            other => {
                self.finished = true;
                other
            }
        }
    }

    async fn advance(&mut self) -> Result<Option<Record>> {
        loop {
            if self.engine.cancel.is_cancelled() {
                return Err(BrowserError::Cancelled.into());
            }

            if let Some(item) = self.pending.pop_front() {
                let record = match item {
                    Pending::Ready(record) => record,
                    Pending::Resolve(entry) => self.engine.resolver.resolve(&entry).await?,
                };

                if record.is_placeholder() {
                    self.stats.skipped_rows += 1;
                    continue;
                }

                match self.seen.admit(record) {
                    Ok(record) => {
                        self.stats.records += 1;
                        return Ok(Some(record));
                    }
                    Err(duplicate) => {
                        tracing::warn!("{}", duplicate);
                        self.stats.duplicates += 1;
                        continue;
                    }
                }
            }

            match self.stack.pop() {
                Some(Frame::Query(prefix)) => self.visit(&prefix).await?,
                Some(Frame::Settle { prefix, entries }) => self.settle(&prefix, entries),
                None => return Ok(None),
            }
        }
    }

    async fn visit(&mut self, prefix: &Prefix) -> Result<()> {
        let page = self.engine.executor.run_query(prefix).await?;
        self.stats.note_query(prefix);
        if page.timed_out {
            self.stats.readiness_timeouts += 1;
        }

        let partitioner = &self.engine.partitioner;
        match partitioner.partition(&page.summary) {
            Outcome::Empty => self.stats.empty += 1,
            Outcome::Recurse(children) if partitioner.may_subdivide(prefix) => {
                tracing::debug!(
                    "Prefix {:?} is capped, subdividing into {} children",
                    prefix.as_str(),
                    children.len()
                );
                self.stats.subdivisions += 1;
                self.stack.push(Frame::Settle {
                    prefix: prefix.clone(),
                    entries: page.entries,
                });
                self.stack.extend(children.into_iter().rev().map(Frame::Query));
            }
            Outcome::Recurse(_) => {
                tracing::warn!(
                    "Prefix {:?} is still capped at depth {}; keeping its {} visible results",
                    prefix.as_str(),
                    prefix.depth(),
                    page.entries.len()
                );
                self.stats.truncated += 1;
                self.queue_leaf(page, true);
            }
            Outcome::Leaf(_) => {
                self.stats.leaves += 1;
                self.queue_leaf(page, false);
            }
        }
        Ok(())
    }

    fn queue_leaf(&mut self, page: QueryPage, truncated: bool) {
        let QueryPage {
            summary,
            entries,
            inline_record,
            ..
        } = page;

        if let Some(record) = inline_record {
            self.listed.insert(record.name.clone());
            // listing-only walks key every record on its name
            let record = if self.resolve_details {
                record
            } else {
                Record::from_listing(record.name)
            };
            self.pending.push_back(Pending::Ready(record));
            return;
        }

        if !truncated && entries.len() != summary.match_count as usize {
            tracing::warn!(
                "Prefix {:?} reports {} results but lists {}",
                summary.prefix.as_str(),
                summary.match_count,
                entries.len()
            );
        }

        for entry in entries {
            self.queue_entry(entry);
        }
    }

    fn queue_entry(&mut self, entry: MatchedEntry) {
        self.listed.insert(entry.name.clone());
        let item = if self.resolve_details {
            Pending::Resolve(entry)
        } else {
            Pending::Ready(Record::from_listing(entry.name))
        };
        self.pending.push_back(item);
    }

    /// Keep the visible entries of a capped prefix that none of its children
    /// listed. The cap may hide more of them, so this counts as truncation.
    fn settle(&mut self, prefix: &Prefix, entries: Vec<MatchedEntry>) {
        let stranded: Vec<MatchedEntry> = entries
            .into_iter()
            .filter(|entry| !self.listed.contains(&entry.name))
            .collect();
        if stranded.is_empty() {
            return;
        }

        tracing::warn!(
            "{} visible results under {:?} are not reachable through a longer prefix; keeping them",
            stranded.len(),
            prefix.as_str()
        );
        self.stats.truncated += 1;

        for entry in stranded {
            // the parent listing is no longer on screen
            let entry = match entry.route {
                DetailRoute::Click { .. } => MatchedEntry::by_name(entry.name),
                _ => entry,
            };
            self.queue_entry(entry);
        }
    }

    /// Turn the walk into a stream that ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Record>> + 'a {
        stream::unfold(Some(self), |walk| async move {
            let mut walk = walk?;
            match walk.next_record().await {
                Ok(Some(record)) => Some((Ok(record), Some(walk))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
