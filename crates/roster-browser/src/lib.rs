//! Browser automation engine for the directory's JavaScript-rendered pages.
//!
//! Provides the [`BrowserActions`] seam the crawler navigates through, a
//! chromiumoxide-backed [`BrowserEngine`], the bounded readiness poll every
//! navigation waits on, and small DOM helpers shared with the parsers.

pub mod actions;
pub mod dom;
pub mod engine;
pub mod error;
pub mod wait;

pub use actions::BrowserActions;
pub use engine::BrowserEngine;
pub use error::{BrowserError, Result};
pub use wait::{await_departure, await_ready, poll_until, LoadingIndicator, PageSnapshot, WaitPolicy};
