use crate::error::{BrowserError, Result};

/// Browser actions for automation.
///
/// One implementor is one browsing context: it holds a single page state at a
/// time, so callers must issue actions strictly in sequence.
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Current serialized document
    async fn content(&self) -> Result<String>;

    /// URL of the current document
    async fn current_url(&self) -> Result<String>;

    /// Click an element by selector
    async fn click(&self, selector: &str) -> Result<()>;

    /// Go back one entry in the session history
    async fn go_back(&self) -> Result<()>;
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {}", e)))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(|s| s.to_string())
}

/// Whether two URLs point at the same host. Unparseable URLs never match.
pub fn same_host(a: &str, b: &str) -> bool {
    match (extract_domain(a), extract_domain(b)) {
        (Ok(a), Ok(b)) => a.eq_ignore_ascii_case(&b),
        _ => false,
    }
}
