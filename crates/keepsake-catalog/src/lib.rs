//! # keepsake-catalog
//!
//! The search/filter/sort view over a capsule snapshot.
//!
//! Filtering is total and pure: predicates are conjunctive, matching never
//! mutates the underlying set, and the result follows `order_index`
//! ascending with a stable tie-break on id.

use keepsake_types::{Capsule, ContentKind};
use serde::{Deserialize, Serialize};

/// Unlock-status predicate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Unlocked,
    Locked,
}

impl StatusFilter {
    fn matches(self, capsule: &Capsule) -> bool {
        match self {
            Self::All => true,
            Self::Unlocked => capsule.is_unlocked,
            Self::Locked => !capsule.is_unlocked,
        }
    }
}

/// The viewer's current catalog filter.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct CatalogFilter {
    /// Free-text query, matched case-insensitively against title and
    /// description substrings. Empty matches everything.
    #[serde(default)]
    pub query: String,
    /// Restrict to one content variant.
    #[serde(default)]
    pub kind: Option<ContentKind>,
    /// Restrict by unlock status.
    #[serde(default)]
    pub status: StatusFilter,
}

impl CatalogFilter {
    /// Whether one capsule passes every predicate.
    pub fn matches(&self, capsule: &Capsule) -> bool {
        if !self.status.matches(capsule) {
            return false;
        }
        if let Some(kind) = self.kind {
            if capsule.content.kind() != kind {
                return false;
            }
        }
        let query = self.query.trim();
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();
        capsule.title.to_lowercase().contains(&query)
            || capsule.content.title().to_lowercase().contains(&query)
            || capsule.content.description().to_lowercase().contains(&query)
    }

    /// Filter a snapshot into an ordered list.
    pub fn apply(&self, capsules: &[Capsule]) -> Vec<Capsule> {
        let mut matched: Vec<Capsule> = capsules
            .iter()
            .filter(|capsule| self.matches(capsule))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.order_index.cmp(&b.order_index).then(a.id.cmp(&b.id)));
        matched
    }
}
