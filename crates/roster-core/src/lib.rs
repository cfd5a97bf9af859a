//! Roster Core - Foundation crate for the roster directory crawler.
//!
//! This crate provides the shared data model, error handling and configuration
//! management that the browser, crawler and CLI crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Domain types (`Prefix`, `Alphabet`, `Record`, `SessionState`, ...)
//!
//! # Example
//!
//! ```rust
//! use roster_core::{Alphabet, AppConfig, Prefix};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.directory.cap, 25);
//!
//! let alphabet = Alphabet::default();
//! let children = Prefix::new("sm")?.children(&alphabet);
//! assert_eq!(children.len(), 26);
//! assert_eq!(children[0].as_str(), "sma");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, AuthConfig, BrowserConfig, CrawlConfig, DetailSelectors, DirectoryConfig,
    SelectorConfig, WaitConfig,
};
pub use error::{ConfigError, ConfigResult, Result, RosterError};
pub use types::{
    Alphabet, CrawlId, DetailRoute, MatchedEntry, Prefix, QuerySummary, Record, SessionState,
    Timestamp,
};
