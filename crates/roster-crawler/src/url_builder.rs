use crate::error::Result;
use roster_browser::BrowserError;
use roster_core::{DirectoryConfig, Prefix};
use url::Url;

/// Builds the directory's field-search and term-search URLs.
#[derive(Debug, Clone)]
pub struct DirectoryUrls {
    base: Url,
    title_filter: Option<String>,
}

impl DirectoryUrls {
    pub fn new(config: &DirectoryConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            BrowserError::NavigationError(format!("Invalid directory URL {}: {e}", config.base_url))
        })?;

        Ok(Self {
            base,
            title_filter: config.title_filter.clone(),
        })
    }

    /// Directory home document.
    pub fn home_url(&self) -> &str {
        self.base.as_str()
    }

    /// `?queryType=field[&title=..]&lastname=<prefix>`
    pub fn search_url(&self, prefix: &Prefix) -> String {
        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.clear().append_pair("queryType", "field");
            if let Some(title) = &self.title_filter {
                query.append_pair("title", title);
            }
            query.append_pair("lastname", prefix.as_str());
        }
        url.into()
    }

    /// `?queryType=term&pattern=<name>`
    pub fn term_url(&self, name: &str) -> String {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("queryType", "term")
            .append_pair("pattern", name);
        url.into()
    }

    /// Resolve a possibly relative link against the directory.
    pub fn absolutize(&self, href: &str) -> Option<String> {
        self.base.join(href).ok().map(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(title: Option<&str>) -> DirectoryUrls {
        DirectoryUrls::new(&DirectoryConfig {
            base_url: "https://directory.example.edu/".to_string(),
            title_filter: title.map(str::to_string),
            cap: 25,
        })
        .expect("valid base URL")
    }

    #[test]
    fn test_search_url_with_title() {
        let prefix = Prefix::new("ab").expect("valid prefix");
        assert_eq!(
            urls(Some("Professor")).search_url(&prefix),
            "https://directory.example.edu/?queryType=field&title=Professor&lastname=ab"
        );
    }

    #[test]
    fn test_search_url_without_title_encodes_prefix() {
        let prefix = Prefix::new("o'b").expect("valid prefix");
        assert_eq!(
            urls(None).search_url(&prefix),
            "https://directory.example.edu/?queryType=field&lastname=o%27b"
        );
    }

    #[test]
    fn test_term_url() {
        assert_eq!(
            urls(None).term_url("Ada Lovelace"),
            "https://directory.example.edu/?queryType=term&pattern=Ada+Lovelace"
        );
    }

    #[test]
    fn test_absolutize() {
        let urls = urls(None);
        assert_eq!(
            urls.absolutize("/person/al42").as_deref(),
            Some("https://directory.example.edu/person/al42")
        );
        assert_eq!(
            urls.absolutize("https://other.example.edu/x").as_deref(),
            Some("https://other.example.edu/x")
        );
    }

    #[test]
    fn test_invalid_base() {
        let config = DirectoryConfig {
            base_url: "not a url".to_string(),
            ..DirectoryConfig::default()
        };
        assert!(DirectoryUrls::new(&config).is_err());
    }
}
