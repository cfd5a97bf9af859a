//! Shared types used across the roster crawler.
//!
//! This module defines the domain model the crawler passes between its
//! components: the search prefixes, the query summaries, the matched listing
//! entries and the fully resolved records.

use crate::error::RosterError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Characters a prefix may contain besides `a-z`.
const EXTRA_NAME_CHARS: &[char] = &[' ', '-', '\''];

fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || EXTRA_NAME_CHARS.contains(&c)
}

/// Ordered set of characters the partitioner appends when subdividing a prefix.
///
/// The default is the 26 lowercase ASCII letters in alphabetical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Alphabet(Vec<char>);

impl Alphabet {
    /// Build an alphabet from a string of characters, keeping their order.
    ///
    /// # Errors
    /// Returns error if the string is empty, repeats a character, or contains
    /// a character a last name cannot start with.
    pub fn new(chars: &str) -> Result<Self, RosterError> {
        if chars.is_empty() {
            return Err(RosterError::Validation(
                "alphabet must contain at least one character".to_string(),
            ));
        }

        let mut seen = Vec::with_capacity(chars.len());
        for c in chars.chars() {
            if !is_name_char(c) {
                return Err(RosterError::Validation(format!(
                    "invalid alphabet character {c:?}: expected a-z, space, hyphen or apostrophe"
                )));
            }
            if seen.contains(&c) {
                return Err(RosterError::Validation(format!(
                    "alphabet repeats character {c:?}"
                )));
            }
            seen.push(c);
        }

        Ok(Self(seen))
    }

    /// Characters in traversal order.
    #[must_use]
    pub fn chars(&self) -> &[char] {
        &self.0
    }

    /// Number of characters (the fan-out of one subdivision).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated alphabet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The inclusive slice `[start, end]` of this alphabet.
    ///
    /// # Errors
    /// Returns error if either bound is not in the alphabet or `start` comes
    /// after `end`.
    pub fn range(&self, start: char, end: char) -> Result<&[char], RosterError> {
        let position = |c: char| {
            self.0.iter().position(|&x| x == c).ok_or_else(|| {
                RosterError::Validation(format!("{c:?} is not part of the alphabet"))
            })
        };
        let from = position(start)?;
        let to = position(end)?;

        if from > to {
            return Err(RosterError::Validation(format!(
                "range start {start:?} comes after end {end:?}"
            )));
        }

        Ok(&self.0[from..=to])
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self(('a'..='z').collect())
    }
}

impl TryFrom<String> for Alphabet {
    type Error = RosterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Alphabet> for String {
    fn from(alphabet: Alphabet) -> Self {
        alphabet.0.into_iter().collect()
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.0 {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// A partial last name used as the directory's `lastname` filter.
///
/// Prefixes are lowercase; the empty prefix is the root of the prefix tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Prefix(String);

impl Prefix {
    /// Create a prefix, lowercasing the input.
    ///
    /// # Errors
    /// Returns error if the prefix contains characters other than letters,
    /// spaces, hyphens and apostrophes.
    pub fn new(prefix: impl Into<String>) -> Result<Self, RosterError> {
        let prefix = prefix.into().to_lowercase();
        Self::validate(&prefix)?;
        Ok(Self(prefix))
    }

    /// The empty prefix every walk descends from.
    #[must_use]
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Depth in the prefix tree (number of characters).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.chars().count()
    }

    /// Whether this is the empty root prefix.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// This prefix extended by one character.
    #[must_use]
    pub fn child(&self, c: char) -> Self {
        let mut next = self.0.clone();
        next.push(c);
        Self(next)
    }

    /// One child per alphabet character, in alphabet order.
    #[must_use]
    pub fn children(&self, alphabet: &Alphabet) -> Vec<Self> {
        alphabet.chars().iter().map(|&c| self.child(c)).collect()
    }

    /// Whether `name` (a last name) falls under this prefix.
    #[must_use]
    pub fn covers(&self, last_name: &str) -> bool {
        last_name.to_lowercase().starts_with(&self.0)
    }

    fn validate(prefix: &str) -> Result<(), RosterError> {
        static PREFIX_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = PREFIX_REGEX.get_or_init(|| Regex::new(r"^[a-z '\-]*$").expect("valid regex"));

        if regex.is_match(prefix) {
            Ok(())
        } else {
            Err(RosterError::Validation(format!(
                "invalid prefix '{prefix}': only letters, spaces, hyphens and apostrophes are allowed"
            )))
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parsed outcome of a single prefix query. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySummary {
    /// The prefix that was queried
    pub prefix: Prefix,
    /// Match count as reported (or inferred) from the results page
    pub match_count: u32,
    /// The surplus-results banner was visible: the true count is unknown
    pub is_capped: bool,
    /// The results region was visible without a numeric header
    pub is_empty_region: bool,
}

/// How the detail view of a listing entry can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailRoute {
    /// Absolute URL of the detail view
    Link(String),
    /// CSS selector of the in-page control that opens the detail view
    Click {
        /// Selector of the clickable name element on the listing page
        selector: String,
    },
    /// No link on the listing; look the entry up through the term search
    TermSearch,
}

/// Lightweight handle to one person on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedEntry {
    /// Display name as rendered on the listing
    pub name: String,
    /// Route to the detail view
    pub route: DetailRoute,
}

impl MatchedEntry {
    /// Create an entry that can only be resolved through the term search.
    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            route: DetailRoute::TermSearch,
        }
    }
}

/// A fully resolved directory entry.
///
/// Field names serialize to the column names downstream collaborators expect
/// (`name, id, title, email, upi, unit, department, location, building, mailing`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Display name; empty marks a row to skip
    pub name: String,
    /// Directory-internal identifier, the deduplication key
    #[serde(rename = "id")]
    pub internal_id: String,
    /// Job title
    pub title: String,
    /// Email address
    pub email: String,
    /// University principal identifier
    #[serde(rename = "upi")]
    pub user_principal_id: String,
    /// Organizational unit
    pub unit: String,
    /// Department within the unit
    pub department: String,
    /// Office address
    #[serde(rename = "location")]
    pub office_location: String,
    /// Building name
    #[serde(rename = "building")]
    pub building_name: String,
    /// Mailing address
    #[serde(rename = "mailing")]
    pub mailing_address: String,
}

impl Record {
    /// The empty-name sentinel for a row that failed extraction.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// A record known only by its listing name (no detail resolution).
    #[must_use]
    pub fn from_listing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether this is the skip-row sentinel.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.name.trim().is_empty()
    }

    /// Key used for deduplication: the internal id, or the display name for
    /// records that were never resolved.
    #[must_use]
    pub fn dedup_key(&self) -> &str {
        if self.internal_id.is_empty() {
            &self.name
        } else {
            &self.internal_id
        }
    }
}

/// Lifecycle state of the authenticated browsing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No login has been attempted or it failed
    Unauthenticated,
    /// The login portal is open and waiting for the operator
    AwaitingManualApproval,
    /// Privileged pages are reachable
    Authenticated,
    /// A privileged navigation bounced back to the login portal
    Expired,
}

impl SessionState {
    /// Whether privileged navigations are allowed.
    #[must_use]
    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::AwaitingManualApproval => "awaiting manual approval",
            Self::Authenticated => "authenticated",
            Self::Expired => "expired",
        };
        f.write_str(label)
    }
}

/// Identifier of one crawl invocation, attached to logs and reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrawlId(String);

impl CrawlId {
    /// Create a new random `CrawlId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CrawlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for report timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_alphabet() {
        let alphabet = Alphabet::default();
        assert_eq!(alphabet.len(), 26);
        assert_eq!(alphabet.chars()[0], 'a');
        assert_eq!(alphabet.chars()[25], 'z');
        assert_eq!(alphabet.to_string(), "abcdefghijklmnopqrstuvwxyz");
    }

    #[test]
    fn test_alphabet_invalid() {
        assert!(Alphabet::new("").is_err());
        assert!(Alphabet::new("abca").is_err());
        assert!(Alphabet::new("abC").is_err());
        assert!(Alphabet::new("ab9").is_err());
        assert!(Alphabet::new("abc -'").is_ok());
    }

    #[test]
    fn test_alphabet_range() {
        let alphabet = Alphabet::default();
        assert_eq!(alphabet.range('a', 'a').expect("single letter"), &['a']);
        assert_eq!(alphabet.range('x', 'z').expect("tail"), &['x', 'y', 'z']);
        assert!(alphabet.range('z', 'a').is_err());
        assert!(alphabet.range('a', '-').is_err());
    }

    #[test]
    fn test_alphabet_serde_as_string() {
        let alphabet = Alphabet::new("abc").expect("valid alphabet");
        let json = serde_json::to_string(&alphabet).expect("serialize alphabet");
        assert_eq!(json, "\"abc\"");

        let parsed: Result<Alphabet, _> = serde_json::from_str("\"aa\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_prefix_valid() {
        let prefix = Prefix::new("Smi").expect("valid prefix");
        assert_eq!(prefix.as_str(), "smi");
        assert_eq!(prefix.depth(), 3);
        assert!(Prefix::new("o'b").is_ok());
        assert!(Prefix::new("de la").is_ok());
        assert!(Prefix::new("").expect("root").is_root());
    }

    #[test]
    fn test_prefix_invalid() {
        for bad in ["a1", "smith!", "é", "a_b"] {
            assert!(Prefix::new(bad).is_err(), "Should fail for: {bad}");
        }
    }

    #[test]
    fn test_prefix_children_are_ordered_and_disjoint() {
        let alphabet = Alphabet::default();
        let parent = Prefix::new("ab").expect("valid prefix");
        let children = parent.children(&alphabet);

        assert_eq!(children.len(), 26);
        assert_eq!(children.first().map(Prefix::as_str), Some("aba"));
        assert_eq!(children.last().map(Prefix::as_str), Some("abz"));

        let mut sorted = children.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, children);

        for name in ["abbott", "abel", "abzug"] {
            let covering = children.iter().filter(|c| c.covers(name)).count();
            assert_eq!(covering, 1, "{name} must fall under exactly one child");
            assert!(parent.covers(name));
        }
    }

    #[test]
    fn test_record_sentinel_and_key() {
        assert!(Record::placeholder().is_placeholder());

        let listed = Record::from_listing("Ada Lovelace");
        assert!(!listed.is_placeholder());
        assert_eq!(listed.dedup_key(), "Ada Lovelace");

        let resolved = Record {
            name: "Ada Lovelace".to_string(),
            internal_id: "al42".to_string(),
            ..Record::default()
        };
        assert_eq!(resolved.dedup_key(), "al42");
    }

    #[test]
    fn test_record_serializes_collaborator_columns() {
        let record = Record {
            name: "Ada Lovelace".to_string(),
            internal_id: "al42".to_string(),
            user_principal_id: "10001".to_string(),
            office_location: "17 Hillhouse".to_string(),
            ..Record::default()
        };

        let json = serde_json::to_value(&record).expect("serialize record");
        assert_eq!(json["id"], "al42");
        assert_eq!(json["upi"], "10001");
        assert_eq!(json["location"], "17 Hillhouse");
        assert!(json.get("internal_id").is_none());
    }

    #[test]
    fn test_session_state() {
        assert!(SessionState::Authenticated.is_authenticated());
        assert!(!SessionState::Expired.is_authenticated());
        assert_eq!(SessionState::AwaitingManualApproval.to_string(), "awaiting manual approval");
    }

    #[test]
    fn test_crawl_id_generate() {
        assert_ne!(CrawlId::generate(), CrawlId::generate());
    }
}
