//! Authenticated browsing context.
//!
//! Login goes through the institution's central authentication service and may
//! involve a second factor, so the operator completes it by hand in the visible
//! browser. The session manager only opens the login page, waits for the
//! operator (or for the browser to land back on the directory), and then checks
//! the directory's login control for the logged-in label.

use crate::error::{Result, ScanError};
use crate::parser::ResultParser;
use crate::retry::{navigate_with_retry, RetryPolicy};
use crate::url_builder::DirectoryUrls;
use roster_browser::actions::same_host;
use roster_browser::{poll_until, BrowserActions, WaitPolicy};
use roster_core::{AppConfig, AuthConfig, SessionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Signal that the operator finished the manual login.
#[async_trait::async_trait]
pub trait LoginApproval: Send + Sync {
    /// Resolves once the operator reports the login as done.
    async fn wait_for_operator(&self);
}

/// Asks on stderr and waits for a line on stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinApproval;

#[async_trait::async_trait]
impl LoginApproval for StdinApproval {
    async fn wait_for_operator(&self) {
        eprintln!("Complete the login in the browser window, then press Enter here.");
        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        if let Err(e) = stdin.read_line(&mut line).await {
            tracing::warn!("Could not read operator confirmation: {}", e);
        }
    }
}

/// No operator: rely on the browser returning to the directory on its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOperator;

#[async_trait::async_trait]
impl LoginApproval for NoOperator {
    async fn wait_for_operator(&self) {
        std::future::pending::<()>().await;
    }
}

/// Owns the session state of one browsing context.
pub struct SessionManager {
    browser: Arc<dyn BrowserActions>,
    parser: Arc<ResultParser>,
    state: RwLock<SessionState>,
    auth: AuthConfig,
    login_control: String,
    home_url: String,
    poll_interval: Duration,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        browser: Arc<dyn BrowserActions>,
        parser: Arc<ResultParser>,
        urls: &DirectoryUrls,
        config: &AppConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            browser,
            parser,
            state: RwLock::new(SessionState::Unauthenticated),
            auth: config.auth.clone(),
            login_control: config.selectors.login_control.clone(),
            home_url: urls.home_url().to_string(),
            poll_interval: config.wait.poll_interval(),
            retry: RetryPolicy::from(&config.crawl),
            cancel,
        }
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    async fn set_state(&self, state: SessionState) {
        let mut current = self.state.write().await;
        if *current != state {
            tracing::debug!("Session state {} -> {}", *current, state);
            *current = state;
        }
    }

    /// Establish an authenticated session.
    ///
    /// Opens the login page and waits, bounded by the approval timeout, until
    /// either the operator confirms or the browser is back on the directory.
    /// Then loads the directory and requires the login control to read the
    /// logged-in label, clicking it once if it still offers a login.
    pub async fn authenticate(&self, approval: &dyn LoginApproval) -> Result<SessionState> {
        self.set_state(SessionState::AwaitingManualApproval).await;
        tracing::info!("Waiting for manual login at {}", self.auth.login_url);

        match self.complete_login(approval).await {
            Ok(()) => {
                self.set_state(SessionState::Authenticated).await;
                tracing::info!("Authenticated session established");
                Ok(SessionState::Authenticated)
            }
            Err(e) => {
                self.set_state(SessionState::Unauthenticated).await;
                Err(e)
            }
        }
    }

    async fn complete_login(&self, approval: &dyn LoginApproval) -> Result<()> {
        navigate_with_retry(self.browser.as_ref(), &self.auth.login_url, self.retry, &self.cancel).await?;

        let back_on_directory = poll_until(
            || self.browser.current_url(),
            |url| same_host(url, &self.home_url),
            WaitPolicy::new(self.auth.approval_timeout(), self.poll_interval),
            &self.cancel,
        );

        tokio::select! {
            () = approval.wait_for_operator() => {
                tracing::debug!("Operator confirmed the login");
            }
            snapshot = back_on_directory => {
                if snapshot?.timed_out {
                    return Err(ScanError::AuthenticationFailure {
                        reason: format!(
                            "login was not completed within {:?}",
                            self.auth.approval_timeout()
                        ),
                    });
                }
            }
        }

        navigate_with_retry(self.browser.as_ref(), &self.home_url, self.retry, &self.cancel).await?;
        let label = self.await_login_label(|_| true).await?;

        if label.as_deref() == Some(self.auth.login_label.as_str()) {
            tracing::debug!("Directory still offers a login, following it");
            self.browser.click(&self.login_control).await?;
        }

        let label = self
            .await_login_label(|label| label == self.auth.logout_label)
            .await?;

        match label {
            Some(label) if label == self.auth.logout_label => Ok(()),
            other => Err(ScanError::AuthenticationFailure {
                reason: format!(
                    "login control reads {:?}, expected {:?}",
                    other.unwrap_or_default(),
                    self.auth.logout_label
                ),
            }),
        }
    }

    /// Poll the directory until the login control exists and `accept` likes it.
    async fn await_login_label<P>(&self, accept: P) -> Result<Option<String>>
    where
        P: Fn(&str) -> bool,
    {
        let snapshot = poll_until(
            || self.browser.content(),
            |html| self.parser.login_label(html).is_some_and(|label| accept(label.as_str())),
            WaitPolicy::new(self.auth.marker_timeout(), self.poll_interval),
            &self.cancel,
        )
        .await?;
        Ok(self.parser.login_label(&snapshot.html))
    }

    /// Fail unless the session is authenticated.
    pub async fn require_authenticated(&self) -> Result<()> {
        match self.state().await {
            SessionState::Authenticated => Ok(()),
            SessionState::Expired => Err(ScanError::SessionExpired {
                url: self.home_url.clone(),
            }),
            state => Err(ScanError::AuthenticationFailure {
                reason: format!("detail views need an authenticated session, session is {state}"),
            }),
        }
    }

    /// Fail if the session was seen expiring. Unauthenticated listing walks pass.
    pub async fn ensure_active(&self) -> Result<()> {
        if self.state().await == SessionState::Expired {
            return Err(ScanError::SessionExpired {
                url: self.home_url.clone(),
            });
        }
        Ok(())
    }

    /// Inspect a privileged page for signs of a lost session.
    ///
    /// Landing on the login host, or a login control offering a login again,
    /// marks the session expired.
    pub async fn observe_privileged(&self, url: &str, html: &str) -> Result<()> {
        let redirected = !same_host(url, &self.home_url) && same_host(url, &self.auth.login_url);
        let logged_out = self.parser.login_label(html).as_deref() == Some(self.auth.login_label.as_str());

        if redirected || logged_out {
            tracing::warn!("Session expired (landed on {})", url);
            self.set_state(SessionState::Expired).await;
            return Err(ScanError::SessionExpired {
                url: url.to_string(),
            });
        }
        Ok(())
    }

    /// Adopt a session established outside this manager.
    pub async fn mark_authenticated(&self) {
        self.set_state(SessionState::Authenticated).await;
    }
}
