//! Parallel crawl over several browsing contexts.
//!
//! The letter range is cut into contiguous slices, one per engine. Every engine
//! walks its slice in its own browsing context; the walks run concurrently and
//! their reports are merged here, in slice order, through one accumulator.

use crate::engine::EnumerationEngine;
use crate::error::ScanError;
use crate::report::{Accumulator, CrawlInterrupted, CrawlReport};
use futures::stream::{FuturesUnordered, StreamExt};
use roster_core::{CrawlId, Timestamp};

/// Runs one walk per engine and merges the results.
pub struct CrawlOrchestrator {
    engines: Vec<EnumerationEngine>,
}

impl CrawlOrchestrator {
    #[must_use]
    pub fn new(engines: Vec<EnumerationEngine>) -> Self {
        Self { engines }
    }

    #[must_use]
    pub fn engines(&self) -> &[EnumerationEngine] {
        &self.engines
    }

    /// Crawl `start..=end` with every engine working on its own slice.
    ///
    /// All slices run to completion or to their own fatal error. The merged
    /// report keeps slice order; the first fatal error in slice order is the
    /// cause of the returned [`CrawlInterrupted`].
    pub async fn run(
        &self,
        start: char,
        end: char,
        resolve_details: bool,
    ) -> Result<CrawlReport, CrawlInterrupted> {
        let crawl_id = CrawlId::generate();
        let started_at = Timestamp::now();
        let mut merged = CrawlReport::new(crawl_id, started_at);

        let Some(first) = self.engines.first() else {
            return Err(CrawlInterrupted {
                report: merged,
                cause: ScanError::InvalidRequest(roster_core::RosterError::Validation(
                    "no browsing context to crawl with".to_string(),
                )),
            });
        };
        let letters = match first.alphabet().range(start, end) {
            Ok(letters) => letters,
            Err(e) => {
                return Err(CrawlInterrupted {
                    report: merged,
                    cause: e.into(),
                })
            }
        };

        let slices = split_range(letters, self.engines.len());
        tracing::info!(
            "Crawl {} splits {}..{} into {} slices",
            merged.crawl_id,
            start,
            end,
            slices.len()
        );

        let mut futures = FuturesUnordered::new();
        for (index, ((from, to), engine)) in slices.iter().zip(&self.engines).enumerate() {
            futures.push(async move { (index, engine.collect(*from, *to, resolve_details).await) });
        }

        let mut outcomes: Vec<Option<Result<CrawlReport, CrawlInterrupted>>> =
            (0..slices.len()).map(|_| None).collect();
        while let Some((index, outcome)) = futures.next().await {
            match &outcome {
                Ok(report) => tracing::debug!("Slice {} finished with {} records", index, report.records.len()),
                Err(e) => tracing::warn!("Slice {} interrupted: {}", index, e),
            }
            outcomes[index] = Some(outcome);
        }

        let mut accumulator = Accumulator::new();
        let mut first_cause = None;
        for outcome in outcomes.into_iter().flatten() {
            let report = match outcome {
                Ok(report) => report,
                Err(interrupted) => {
                    first_cause.get_or_insert(interrupted.cause);
                    interrupted.report
                }
            };

            merged.stats.merge(&report.stats);
            for record in report.records {
                match accumulator.admit(record) {
                    Ok(record) => merged.records.push(record),
                    Err(duplicate) => {
                        tracing::warn!("{}", duplicate);
                        merged.stats.duplicates += 1;
                    }
                }
            }
        }

        merged.stats.records = u32::try_from(merged.records.len()).unwrap_or(u32::MAX);
        merged.finished_at = Timestamp::now();

        match first_cause {
            None => Ok(merged),
            Some(cause) => Err(CrawlInterrupted { report: merged, cause }),
        }
    }
}

/// Cut `letters` into at most `parts` contiguous, non-empty `(first, last)`
/// slices that together cover every letter once, in order.
#[must_use]
pub fn split_range(letters: &[char], parts: usize) -> Vec<(char, char)> {
    let parts = parts.clamp(1, letters.len().max(1));
    let base = letters.len() / parts;
    let extra = letters.len() % parts;

    let mut slices = Vec::with_capacity(parts);
    let mut offset = 0;
    for part in 0..parts {
        let len = base + usize::from(part < extra);
        if len == 0 {
            break;
        }
        slices.push((letters[offset], letters[offset + len - 1]));
        offset += len;
    }
    slices
}
