//! Synthetic directory behind the `BrowserActions` seam.
//!
//! Serves listing, detail, home and login documents shaped like the real
//! directory's, caps listings, and can simulate a stuck loading indicator,
//! session expiry and click-only listings.

#![allow(dead_code)]

use roster_browser::{BrowserActions, BrowserError, Result};
use roster_core::AppConfig;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use url::Url;

pub const HOME: &str = "https://directory.test/";
pub const LOGIN: &str = "https://login.test/cas/login";

/// One person in the synthetic population.
#[derive(Debug, Clone)]
pub struct Person {
    pub first: String,
    pub last: String,
    pub id: String,
    /// Second last name the search also matches
    pub alias: Option<String>,
}

impl Person {
    pub fn new(first: &str, last: &str, id: &str) -> Self {
        Self {
            first: first.to_string(),
            last: last.to_string(),
            id: id.to_string(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first, self.last)
    }

    fn matches(&self, prefix: &str) -> bool {
        self.last.to_lowercase().starts_with(prefix)
            || self
                .alias
                .as_ref()
                .is_some_and(|alias| alias.to_lowercase().starts_with(prefix))
    }
}

/// `count` people whose last names are `stem` plus a distinct two-letter tail.
pub fn block(stem: &str, count: usize) -> Vec<Person> {
    (0..count)
        .map(|i| {
            let tail: String = [b'a' + (i / 26) as u8, b'a' + (i % 26) as u8]
                .iter()
                .map(|&b| b as char)
                .collect();
            let last = format!("{stem}{tail}");
            let id = format!("{}{i:03}", stem.to_lowercase());
            Person::new("Pat", &last, &id)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Page {
    Blank,
    Home,
    Login,
    Listing(String),
    Detail(usize),
}

struct State {
    page: Page,
    url: String,
    history: Vec<(Page, String)>,
    logged_in: bool,
    detail_views: u32,
    queries: Vec<String>,
    back_pending: bool,
    failures_left: u32,
}

pub struct MockDirectory {
    people: Vec<Person>,
    cap: usize,
    click_routes: bool,
    auto_login: bool,
    lagging_history: bool,
    expire_after: Option<u32>,
    stuck: HashSet<String>,
    state: Mutex<State>,
}

impl MockDirectory {
    pub fn new(people: Vec<Person>) -> Self {
        Self {
            people,
            cap: 25,
            click_routes: false,
            auto_login: false,
            lagging_history: false,
            expire_after: None,
            stuck: HashSet::new(),
            state: Mutex::new(State {
                page: Page::Blank,
                url: "about:blank".to_string(),
                history: Vec::new(),
                logged_in: false,
                detail_views: 0,
                queries: Vec::new(),
                back_pending: false,
                failures_left: 0,
            }),
        }
    }

    /// Listing names carry no link; detail views open in place.
    pub fn with_click_routes(mut self) -> Self {
        self.click_routes = true;
        self
    }

    /// Visiting the login page signs in and returns to the directory at once.
    pub fn with_auto_login(mut self) -> Self {
        self.auto_login = true;
        self
    }

    /// The next `count` navigations fail with a transient error.
    pub fn failing_navigations(self, count: u32) -> Self {
        self.state.lock().expect("state lock").failures_left = count;
        self
    }

    /// History back only takes effect once the URL is read again.
    pub fn with_lagging_history(mut self) -> Self {
        self.lagging_history = true;
        self
    }

    /// The session dies after `views` detail views.
    pub fn expiring_after(mut self, views: u32) -> Self {
        self.expire_after = Some(views);
        self
    }

    /// The loading indicator never clears on this prefix's listing.
    pub fn stuck_on(mut self, prefix: &str) -> Self {
        self.stuck.insert(prefix.to_string());
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn set_logged_in(&self, logged_in: bool) {
        self.state.lock().expect("state lock").logged_in = logged_in;
    }

    /// Listing prefixes queried so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.state.lock().expect("state lock").queries.clone()
    }

    /// A history back was issued but has not landed yet.
    pub fn history_pending(&self) -> bool {
        self.state.lock().expect("state lock").back_pending
    }

    pub fn detail_views(&self) -> u32 {
        self.state.lock().expect("state lock").detail_views
    }

    fn matching(&self, prefix: &str) -> Vec<usize> {
        let mut hits: Vec<usize> = (0..self.people.len())
            .filter(|&i| self.people[i].matches(prefix))
            .collect();
        hits.sort_by_key(|&i| (self.people[i].last.to_lowercase(), self.people[i].display_name()));
        hits
    }

    fn settle_history(state: &mut State) {
        if std::mem::take(&mut state.back_pending) {
            if let Some((page, url)) = state.history.pop() {
                state.page = page;
                state.url = url;
            }
        }
    }

    fn show(state: &mut State, page: Page, url: String) {
        let previous_page = std::mem::replace(&mut state.page, page);
        let previous_url = std::mem::replace(&mut state.url, url);
        state.history.push((previous_page, previous_url));
    }

    fn open(&self, state: &mut State, page: Page, url: String) {
        if let Page::Detail(_) = page {
            if !state.logged_in {
                Self::show(state, Page::Login, LOGIN.to_string());
                return;
            }
            if self.expire_after.is_some_and(|limit| state.detail_views >= limit) {
                state.logged_in = false;
                Self::show(state, Page::Login, LOGIN.to_string());
                return;
            }
            state.detail_views += 1;
        }
        Self::show(state, page, url);
    }

    fn login(&self, state: &mut State) {
        if self.auto_login {
            state.logged_in = true;
            Self::show(state, Page::Home, HOME.to_string());
        } else {
            Self::show(state, Page::Login, LOGIN.to_string());
        }
    }

    fn login_control(logged_in: bool) -> &'static str {
        if logged_in {
            r##"<a id="bps-login" href="#">LOG OUT</a>"##
        } else {
            r##"<a id="bps-login" href="#">LOG IN</a>"##
        }
    }

    fn indicator(busy: bool) -> String {
        format!(
            r#"<div id="loading-indicator" style="display: {};"></div>"#,
            if busy { "inline" } else { "none" }
        )
    }

    fn article(person: &Person) -> String {
        format!(
            r#"<article id="bpa-final-result-article">
                <h3 id="bps-final-name">{name}</h3>
                <span id="bps-final-netid">{id}</span>
                <p id="bps-final-title">Professor of {last} Studies</p>
                <a id="bps-final-email-anchor" href="mailto:{id}@directory.test">{id}@directory.test</a>
                <p id="bps-final-upi">9{id}</p>
                <p id="bps-final-org">Faculty of Arts and Sciences</p>
                <p id="bps-final-org-unit">{last} Department</p>
                <p id="bps-final-office-addr">1 {last} Hall</p>
                <p id="bps-final-location">{last} Hall</p>
                <p id="bps-final-mailing-addr">PO Box 100</p>
            </article>"#,
            name = person.display_name(),
            id = person.id,
            last = person.last,
        )
    }

    fn listing(&self, prefix: &str, logged_in: bool) -> String {
        let hits = self.matching(prefix);
        let busy = self.stuck.contains(prefix);

        let (header, region, banner, items, inline) = match hits.len() {
            0 => ("No results found".to_string(), "block", "none", String::new(), String::new()),
            1 => (
                "Search results".to_string(),
                "none",
                "none",
                String::new(),
                Self::article(&self.people[hits[0]]),
            ),
            n => {
                let shown = n.min(self.cap);
                let items = hits[..shown]
                    .iter()
                    .map(|&i| {
                        let person = &self.people[i];
                        if self.click_routes {
                            format!(
                                r##"<article class="directory_item"><span class="bps-result-name"><a href="#">{}</a></span></article>"##,
                                person.display_name()
                            )
                        } else {
                            format!(
                                r#"<article class="directory_item"><a class="bps-result-name" href="/person/{}">{}</a></article>"#,
                                person.id,
                                person.display_name()
                            )
                        }
                    })
                    .collect::<String>();
                let banner = if n > self.cap { "block" } else { "none" };
                (format!("{shown} results"), "block", banner, items, String::new())
            }
        };

        format!(
            r#"<html><body>
                {indicator}
                {control}
                <h2 id="results-people-header">{header}</h2>
                <div id="bps-result-region" style="display: {region};">
                    <div class="directory_results_warning" style="display: {banner};">Your search returned too many results.</div>
                    {items}
                </div>
                {inline}
            </body></html>"#,
            indicator = Self::indicator(busy),
            control = Self::login_control(logged_in),
        )
    }
}

fn nth_of_type(selector: &str) -> Option<usize> {
    let start = selector.find(":nth-of-type(")? + ":nth-of-type(".len();
    let end = start + selector[start..].find(')')?;
    selector[start..end].parse().ok()
}

#[async_trait::async_trait]
impl BrowserActions for MockDirectory {
    async fn navigate(&self, url: &str) -> Result<()> {
        let parsed = Url::parse(url).map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
        let mut state = self.state.lock().expect("state lock");
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(BrowserError::NavigationError(format!("{url}: connection reset")));
        }
        Self::settle_history(&mut state);

        match parsed.host_str() {
            Some("login.test") => self.login(&mut state),
            Some("directory.test") => {
                let query: HashMap<String, String> = parsed.query_pairs().into_owned().collect();
                let page = if let Some(id) = parsed.path().strip_prefix("/person/") {
                    self.people
                        .iter()
                        .position(|p| p.id == id)
                        .map_or(Page::Home, Page::Detail)
                } else {
                    match query.get("queryType").map(String::as_str) {
                        Some("field") => {
                            let prefix = query.get("lastname").cloned().unwrap_or_default();
                            state.queries.push(prefix.clone());
                            Page::Listing(prefix)
                        }
                        Some("term") => {
                            let pattern = query.get("pattern").cloned().unwrap_or_default();
                            self.people
                                .iter()
                                .position(|p| p.display_name() == pattern)
                                .map_or(Page::Home, Page::Detail)
                        }
                        _ => Page::Home,
                    }
                };
                self.open(&mut state, page, url.to_string());
            }
            _ => return Err(BrowserError::NavigationError(format!("unreachable host: {url}"))),
        }
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        let state = self.state.lock().expect("state lock");
        let html = match &state.page {
            Page::Blank => "<html><body></body></html>".to_string(),
            Page::Login => r#"<html><body><form id="cas"><input name="username"></form></body></html>"#.to_string(),
            Page::Home => format!(
                "<html><body>{}{}</body></html>",
                Self::indicator(false),
                Self::login_control(state.logged_in)
            ),
            Page::Listing(prefix) => self.listing(prefix, state.logged_in),
            Page::Detail(index) => format!(
                r##"<html><body>{}{}<a class="go-back" href="#">Back</a>{}</body></html>"##,
                Self::indicator(false),
                Self::login_control(state.logged_in),
                Self::article(&self.people[*index])
            ),
        };
        Ok(html)
    }

    async fn current_url(&self) -> Result<String> {
        let mut state = self.state.lock().expect("state lock");
        Self::settle_history(&mut state);
        Ok(state.url.clone())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.state.lock().expect("state lock");

        if selector == "#bps-login" {
            if !state.logged_in {
                self.login(&mut state);
            }
            return Ok(());
        }

        if selector == ".go-back" {
            if !matches!(state.page, Page::Detail(_)) {
                return Err(BrowserError::SelectorNotFound(selector.to_string()));
            }
            if let Some((page, url)) = state.history.pop() {
                state.page = page;
                state.url = url;
            }
            return Ok(());
        }

        if let (true, Some(n), Page::Listing(prefix)) = (self.click_routes, nth_of_type(selector), state.page.clone()) {
            if let Some(&index) = self.matching(&prefix).get(n.saturating_sub(1)) {
                let url = state.url.clone();
                self.open(&mut state, Page::Detail(index), url);
                return Ok(());
            }
        }

        Err(BrowserError::SelectorNotFound(selector.to_string()))
    }

    async fn go_back(&self) -> Result<()> {
        let mut state = self.state.lock().expect("state lock");
        if self.lagging_history {
            state.back_pending = true;
            return Ok(());
        }
        if let Some((page, url)) = state.history.pop() {
            state.page = page;
            state.url = url;
        }
        Ok(())
    }
}

/// Configuration pointing at the synthetic directory with short timeouts.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.directory.base_url = HOME.to_string();
    config.directory.title_filter = None;
    config.auth.login_url = LOGIN.to_string();
    config.auth.approval_timeout_secs = 1;
    config.auth.marker_timeout_ms = 50;
    config.wait.max_wait_ms = 40;
    config.wait.poll_interval_ms = 5;
    config.crawl.retry_delay_ms = 1;
    config
}
