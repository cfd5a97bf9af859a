//! Prefix subdivision.
//!
//! A capped query hides an unknown number of matches. Its children (the prefix
//! extended by every alphabet character) partition its match set exactly, so
//! descending into all of them and unioning their results recovers the full
//! set. Uncapped queries are leaves whose listing is complete.

use roster_core::{Alphabet, Prefix, QuerySummary};

/// What the walk does with one summarized prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing matched
    Empty,
    /// The listing is complete with this many entries
    Leaf(u32),
    /// Capped; query these children instead
    Recurse(Vec<Prefix>),
}

/// Decides between leaf and subdivision.
#[derive(Debug, Clone)]
pub struct Partitioner {
    alphabet: Alphabet,
    max_depth: usize,
}

impl Partitioner {
    #[must_use]
    pub fn new(alphabet: Alphabet, max_depth: usize) -> Self {
        Self { alphabet, max_depth }
    }

    #[must_use]
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Classify a summary. A zero count is empty even when other signals are set.
    #[must_use]
    pub fn partition(&self, summary: &QuerySummary) -> Outcome {
        if summary.match_count == 0 {
            Outcome::Empty
        } else if summary.is_capped {
            Outcome::Recurse(summary.prefix.children(&self.alphabet))
        } else {
            Outcome::Leaf(summary.match_count)
        }
    }

    /// Whether the children of `prefix` stay within the depth bound.
    #[must_use]
    pub fn may_subdivide(&self, prefix: &Prefix) -> bool {
        prefix.depth() < self.max_depth
    }
}
