use crate::actions::BrowserActions;
use crate::error::{BrowserError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::Page;
use futures_util::stream::StreamExt;
use roster_core::BrowserConfig;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Spaces out navigations of one browsing context.
#[derive(Debug)]
struct Throttle {
    last_navigation: Option<Instant>,
    min_delay: Duration,
}

impl Throttle {
    fn new(min_delay_ms: u64) -> Self {
        Self {
            last_navigation: None,
            min_delay: Duration::from_millis(min_delay_ms),
        }
    }

    /// How long the next navigation has to wait at `now`.
    fn delay_at(&self, now: Instant) -> Duration {
        match self.last_navigation {
            Some(last) => self.min_delay.saturating_sub(now.duration_since(last)),
            None => Duration::ZERO,
        }
    }

    async fn wait_turn(&mut self) {
        let delay = self.delay_at(Instant::now());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.last_navigation = Some(Instant::now());
    }
}

/// Browser automation engine: one Chromium instance driving one page.
pub struct BrowserEngine {
    browser: Mutex<Browser>,
    page: Page,
    throttle: Mutex<Throttle>,
    navigation_timeout: Duration,
    handler: JoinHandle<()>,
}

impl BrowserEngine {
    /// Launch Chromium with the given settings and open a blank page.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut builder = CdpConfig::builder()
            .no_sandbox()
            .window_size(config.window_width, config.window_height)
            .request_timeout(Duration::from_secs(config.navigation_timeout_secs));
        if !config.headless {
            builder = builder.with_head();
        }
        let cdp_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Spawn browser handler
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("CDP handler event error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        tracing::debug!(
            "Launched browser (headless: {}, min delay: {}ms)",
            config.headless,
            config.min_delay_ms
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            throttle: Mutex::new(Throttle::new(config.min_delay_ms)),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            handler,
        })
    }

    /// Close the browser and stop its event handler.
    pub async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        let result = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::ChromiumError(e.to_string()));
        self.handler.abort();
        result
    }
}

#[async_trait::async_trait]
impl BrowserActions for BrowserEngine {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.throttle.lock().await.wait_turn().await;
        tracing::trace!("Navigating to {}", url);

        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::NavigationError(format!("{url}: {e}"))),
            Err(_) => Err(BrowserError::Timeout(format!(
                "navigation to {url} exceeded {:?}",
                self.navigation_timeout
            ))),
        }
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }

    async fn current_url(&self) -> Result<String> {
        match self.page.url().await {
            Ok(Some(url)) => Ok(url),
            Ok(None) => Ok("about:blank".to_string()),
            Err(e) => Err(BrowserError::ChromiumError(e.to_string())),
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }

    async fn go_back(&self) -> Result<()> {
        self.throttle.lock().await.wait_turn().await;
        self.page
            .evaluate("window.history.back()")
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::NavigationError(format!("history back: {e}")))
    }
}
