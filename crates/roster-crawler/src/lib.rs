//! Roster Crawler - complete enumeration of a capped directory search.
//!
//! The directory answers a last-name prefix query with at most a fixed number
//! of results and flags truncation with a banner. This crate recovers the full
//! result set by subdividing every capped prefix until each query fits under
//! the cap, then optionally opens every entry's detail view.
//!
//! # Features
//!
//! - Readiness polling on the loading indicator, best effort on timeout
//! - Depth-first prefix walk in lexicographic order with a depth bound
//! - Manual login flow with session-expiry detection on detail pages
//! - Deduplication on the directory's internal id
//! - Navigation retries with linear backoff
//! - Parallel walks over contiguous letter slices
//!
//! # Example
//!
//! ```rust,ignore
//! use roster_crawler::{EnumerationEngine, StdinApproval};
//! use std::sync::Arc;
//!
//! let engine = EnumerationEngine::new(Arc::new(browser), &config, cancel)?;
//! engine.session().authenticate(&StdinApproval).await?;
//!
//! let report = engine.collect('a', 'z', true).await?;
//! println!("{} records", report.records.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod engine;
pub mod error;
#[allow(missing_docs)]
pub mod executor;
pub mod orchestrator;
#[allow(missing_docs)]
pub mod parser;
pub mod partition;
#[allow(missing_docs)]
pub mod report;
#[allow(missing_docs)]
pub mod resolver;
pub mod retry;
pub mod session;
#[allow(missing_docs)]
pub mod url_builder;

// Re-export commonly used types
pub use engine::{EnumerationEngine, Walk};
pub use error::{Result, ScanError};
pub use executor::{QueryExecutor, QueryPage};
pub use orchestrator::{split_range, CrawlOrchestrator};
pub use parser::{MissingField, ResultParser};
pub use partition::{Outcome, Partitioner};
pub use report::{Accumulator, CrawlInterrupted, CrawlReport, CrawlStats};
pub use resolver::DetailResolver;
pub use retry::{navigate_with_retry, RetryPolicy};
pub use session::{LoginApproval, NoOperator, SessionManager, StdinApproval};
pub use url_builder::DirectoryUrls;
