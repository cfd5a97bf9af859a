use roster_browser::BrowserError;
use roster_core::RosterError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailure { reason: String },

    #[error("Session expired while loading {url}")]
    SessionExpired { url: String },

    #[error("Page for {context} not ready after {waited:?}, continuing with latest document")]
    ReadinessTimeout { context: String, waited: Duration },

    #[error("Detail view of {entry:?} is missing field {field}")]
    FieldExtraction { entry: String, field: &'static str },

    #[error("Duplicate record {key:?} dropped")]
    DuplicateRecord { key: String },

    #[error("Invalid crawl request: {0}")]
    InvalidRequest(#[from] RosterError),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),
}

impl ScanError {
    /// Whether this error ends the walk.
    ///
    /// Readiness timeouts, incomplete detail views and duplicates are logged
    /// and skipped; everything else aborts with the records gathered so far.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::ReadinessTimeout { .. } | Self::FieldExtraction { .. } | Self::DuplicateRecord { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
