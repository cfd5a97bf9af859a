use crate::error::ScanError;
use roster_core::{CrawlId, Prefix, Record, Timestamp};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// Counters of one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    /// Prefix queries issued
    pub queries: u32,
    /// Uncapped prefixes whose listing was taken as complete
    pub leaves: u32,
    /// Prefixes with no matches
    pub empty: u32,
    /// Capped prefixes that were subdivided
    pub subdivisions: u32,
    /// Capped prefixes at the depth bound, kept with their visible results only
    pub truncated: u32,
    /// Pages read without reporting ready
    pub readiness_timeouts: u32,
    /// Records dropped as already emitted
    pub duplicates: u32,
    /// Rows dropped for an empty name
    pub skipped_rows: u32,
    /// Records emitted
    pub records: u32,
    /// Longest prefix queried
    pub deepest_prefix: Option<Prefix>,
}

impl CrawlStats {
    pub(crate) fn note_query(&mut self, prefix: &Prefix) {
        self.queries += 1;
        if self
            .deepest_prefix
            .as_ref()
            .map_or(true, |deepest| prefix.depth() > deepest.depth())
        {
            self.deepest_prefix = Some(prefix.clone());
        }
    }

    /// Add the counters of another walk. Record and duplicate counts are
    /// recomputed by whoever merges the records.
    pub fn merge(&mut self, other: &Self) {
        self.queries += other.queries;
        self.leaves += other.leaves;
        self.empty += other.empty;
        self.subdivisions += other.subdivisions;
        self.truncated += other.truncated;
        self.readiness_timeouts += other.readiness_timeouts;
        self.duplicates += other.duplicates;
        self.skipped_rows += other.skipped_rows;
        if let Some(prefix) = &other.deepest_prefix {
            if self
                .deepest_prefix
                .as_ref()
                .map_or(true, |deepest| prefix.depth() > deepest.depth())
            {
                self.deepest_prefix = Some(prefix.clone());
            }
        }
    }
}

/// Result of a finished crawl.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub crawl_id: CrawlId,
    /// Deduplicated records in emission order
    pub records: Vec<Record>,
    pub stats: CrawlStats,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
}

impl CrawlReport {
    pub(crate) fn new(crawl_id: CrawlId, started_at: Timestamp) -> Self {
        Self {
            crawl_id,
            records: Vec::new(),
            stats: CrawlStats::default(),
            started_at,
            finished_at: started_at,
        }
    }
}

/// A crawl that ended on a fatal error, with everything gathered until then.
#[derive(Debug, Error)]
#[error("crawl interrupted after {} records: {cause}", .report.records.len())]
pub struct CrawlInterrupted {
    pub report: CrawlReport,
    #[source]
    pub cause: ScanError,
}

/// Admits each record at most once, keyed on the internal id.
#[derive(Debug, Default)]
pub struct Accumulator {
    seen: HashSet<String>,
}

impl Accumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit `record`, or report it as a duplicate of one admitted earlier.
    pub fn admit(&mut self, record: Record) -> Result<Record, ScanError> {
        if self.seen.insert(record.dedup_key().to_string()) {
            Ok(record)
        } else {
            Err(ScanError::DuplicateRecord {
                key: record.dedup_key().to_string(),
            })
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, id: &str) -> Record {
        Record {
            name: name.to_string(),
            internal_id: id.to_string(),
            ..Record::default()
        }
    }

    #[test]
    fn test_accumulator_drops_repeated_ids() {
        let mut acc = Accumulator::new();
        assert!(acc.admit(record("Ada Lovelace", "al42")).is_ok());
        assert!(acc.admit(record("Alan Turing", "at1")).is_ok());

        let dup = acc.admit(record("Ada King", "al42")).unwrap_err();
        assert!(matches!(dup, ScanError::DuplicateRecord { ref key } if key == "al42"));
        assert!(!dup.is_fatal());
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn test_accumulator_keys_listing_records_by_name() {
        let mut acc = Accumulator::new();
        assert!(acc.admit(Record::from_listing("Grace Hopper")).is_ok());
        assert!(acc.admit(Record::from_listing("Grace Hopper")).is_err());
        assert!(acc.admit(Record::from_listing("Grace Murray")).is_ok());
    }

    #[test]
    fn test_stats_merge() {
        let mut a = CrawlStats {
            queries: 3,
            leaves: 2,
            deepest_prefix: Some(Prefix::new("ab").expect("valid")),
            ..CrawlStats::default()
        };
        let b = CrawlStats {
            queries: 5,
            subdivisions: 1,
            deepest_prefix: Some(Prefix::new("smi").expect("valid")),
            ..CrawlStats::default()
        };
        a.merge(&b);
        assert_eq!(a.queries, 8);
        assert_eq!(a.leaves, 2);
        assert_eq!(a.subdivisions, 1);
        assert_eq!(a.deepest_prefix.as_ref().map(Prefix::as_str), Some("smi"));
    }

    #[test]
    fn test_note_query_tracks_depth() {
        let mut stats = CrawlStats::default();
        stats.note_query(&Prefix::new("b").expect("valid"));
        stats.note_query(&Prefix::new("bo").expect("valid"));
        stats.note_query(&Prefix::new("c").expect("valid"));
        assert_eq!(stats.queries, 3);
        assert_eq!(stats.deepest_prefix.as_ref().map(Prefix::as_str), Some("bo"));
    }

    #[test]
    fn test_report_serializes_record_columns() {
        let mut report = CrawlReport::new(CrawlId::generate(), Timestamp::now());
        report.records.push(record("Ada Lovelace", "al42"));
        report.stats.records = 1;

        let json = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(json["records"][0]["id"], "al42");
        assert_eq!(json["records"][0]["name"], "Ada Lovelace");
        assert_eq!(json["stats"]["records"], 1);
        assert!(json["crawl_id"].is_string());
    }
}
