use crate::url_builder::DirectoryUrls;
use roster_browser::dom::{element_text, has_style_token, is_hidden, parse_selector};
use roster_browser::Result;
use roster_core::{DetailRoute, MatchedEntry, Prefix, QuerySummary, Record, SelectorConfig};
use scraper::{ElementRef, Html, Selector};

/// A detail view lacked a required field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingField(pub &'static str);

struct DetailFields {
    article: Selector,
    name: Selector,
    internal_id: Selector,
    title: Selector,
    email: Selector,
    user_principal_id: Selector,
    unit: Selector,
    department: Selector,
    office_location: Selector,
    building_name: Selector,
    mailing_address: Selector,
}

/// Reads the directory's listing and detail documents.
///
/// Selectors are compiled once from [`SelectorConfig`]; every method parses the
/// document it is given and drops it before returning.
pub struct ResultParser {
    results_header: Selector,
    result_region: Selector,
    surplus_warning: Selector,
    result_item: Selector,
    result_name: Selector,
    anchor: Selector,
    login_control: Selector,
    detail: DetailFields,
    item_selector: String,
    name_selector: String,
    urls: DirectoryUrls,
}

impl ResultParser {
    pub fn new(selectors: &SelectorConfig, urls: DirectoryUrls) -> Result<Self> {
        let detail = &selectors.detail;
        Ok(Self {
            results_header: parse_selector(&selectors.results_header)?,
            result_region: parse_selector(&selectors.result_region)?,
            surplus_warning: parse_selector(&selectors.surplus_warning)?,
            result_item: parse_selector(&selectors.result_item)?,
            result_name: parse_selector(&selectors.result_name)?,
            anchor: parse_selector("a[href]")?,
            login_control: parse_selector(&selectors.login_control)?,
            detail: DetailFields {
                article: parse_selector(&detail.article)?,
                name: parse_selector(&detail.name)?,
                internal_id: parse_selector(&detail.internal_id)?,
                title: parse_selector(&detail.title)?,
                email: parse_selector(&detail.email)?,
                user_principal_id: parse_selector(&detail.user_principal_id)?,
                unit: parse_selector(&detail.unit)?,
                department: parse_selector(&detail.department)?,
                office_location: parse_selector(&detail.office_location)?,
                building_name: parse_selector(&detail.building_name)?,
                mailing_address: parse_selector(&detail.mailing_address)?,
            },
            item_selector: selectors.result_item.clone(),
            name_selector: selectors.result_name.clone(),
            urls,
        })
    }

    /// Summarize a results page.
    ///
    /// The header carries a literal count when there are several matches. When
    /// its first word is not a number the results region decides: visible means
    /// nothing matched, hidden or missing means the single match is rendered
    /// inline. The surplus banner marks the count as capped, except for a
    /// single match.
    pub fn parse_summary(&self, prefix: &Prefix, html: &str, cap: u32) -> QuerySummary {
        let document = Html::parse_document(html);

        let header = document
            .select(&self.results_header)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default();
        let region = document.select(&self.result_region).next();

        let (match_count, is_empty_region) = match leading_count(&header) {
            Some(count) => (count, false),
            None => single_or_none(region.as_ref()),
        };

        let banner_visible = region
            .and_then(|r| r.select(&self.surplus_warning).next())
            .is_some_and(|warning| has_style_token(&warning, "display: block"));
        let is_capped = match_count != 1 && banner_visible;

        if match_count >= cap {
            if is_capped {
                tracing::debug!("Searching {:?}... found {} results (capped)", prefix.as_str(), match_count);
            } else {
                tracing::warn!(
                    "Prefix {:?} reports {} results without a surplus banner; potentially capped",
                    prefix.as_str(),
                    match_count
                );
            }
        }

        QuerySummary {
            prefix: prefix.clone(),
            match_count,
            is_capped,
            is_empty_region,
        }
    }

    /// Listing entries on a results page, at most `limit` of them.
    pub fn parse_entries(&self, html: &str, limit: usize) -> Vec<MatchedEntry> {
        let document = Html::parse_document(html);
        let mut entries = Vec::new();

        for (index, item) in document.select(&self.result_item).take(limit).enumerate() {
            let Some(name_el) = item.select(&self.result_name).next() else {
                tracing::debug!("Listing entry {} has no name element, skipping", index + 1);
                continue;
            };
            let name = element_text(&name_el);
            if name.is_empty() {
                continue;
            }

            let route = self
                .entry_link(&item, &name_el)
                .map_or_else(|| self.click_route(index), DetailRoute::Link);
            entries.push(MatchedEntry { name, route });
        }

        entries
    }

    /// The detail view embedded in the page, if the page shows one.
    pub fn inline_record(&self, html: &str) -> Option<Record> {
        let document = Html::parse_document(html);
        let article = document.select(&self.detail.article).next()?;
        self.record_from(&article).ok()
    }

    /// Extract the ten detail fields.
    ///
    /// Name and internal id are required; the other fields default to empty
    /// when the view omits them.
    pub fn extract_record(&self, html: &str) -> std::result::Result<Record, MissingField> {
        let document = Html::parse_document(html);
        let article = document
            .select(&self.detail.article)
            .next()
            .ok_or(MissingField("article"))?;
        self.record_from(&article)
    }

    /// Lowercased label of the login/logout control, if present.
    pub fn login_label(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        document
            .select(&self.login_control)
            .next()
            .map(|el| element_text(&el).to_lowercase())
    }

    fn record_from(&self, article: &ElementRef<'_>) -> std::result::Result<Record, MissingField> {
        let field = |selector: &Selector| article.select(selector).next().map(|el| element_text(&el));
        let fields = &self.detail;

        Ok(Record {
            name: field(&fields.name).ok_or(MissingField("name"))?,
            internal_id: field(&fields.internal_id).ok_or(MissingField("internal_id"))?,
            title: field(&fields.title).unwrap_or_default(),
            email: field(&fields.email).unwrap_or_default(),
            user_principal_id: field(&fields.user_principal_id).unwrap_or_default(),
            unit: field(&fields.unit).unwrap_or_default(),
            department: field(&fields.department).unwrap_or_default(),
            office_location: field(&fields.office_location).unwrap_or_default(),
            building_name: field(&fields.building_name).unwrap_or_default(),
            mailing_address: field(&fields.mailing_address).unwrap_or_default(),
        })
    }

    fn entry_link(&self, item: &ElementRef<'_>, name_el: &ElementRef<'_>) -> Option<String> {
        let href = if name_el.value().name() == "a" {
            name_el.value().attr("href")
        } else {
            name_el
                .select(&self.anchor)
                .next()
                .or_else(|| item.select(&self.anchor).next())
                .and_then(|a| a.value().attr("href"))
        }?;

        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return None;
        }
        self.urls.absolutize(href)
    }

    fn click_route(&self, index: usize) -> DetailRoute {
        DetailRoute::Click {
            selector: format!(
                "{}:nth-of-type({}) {}",
                self.item_selector,
                index + 1,
                self.name_selector
            ),
        }
    }
}

/// First word of the header as a count, e.g. `"17 results"`.
fn leading_count(header: &str) -> Option<u32> {
    header
        .split_whitespace()
        .next()
        .filter(|word| word.chars().all(|c| c.is_ascii_digit()))
        .and_then(|word| word.parse().ok())
}

/// Non-numeric header: a visible results region means zero matches, anything
/// else means one match rendered inline. Returns `(count, is_empty_region)`.
fn single_or_none(region: Option<&ElementRef<'_>>) -> (u32, bool) {
    match region {
        Some(region) if !is_hidden(region) => (0, true),
        _ => (1, false),
    }
}
