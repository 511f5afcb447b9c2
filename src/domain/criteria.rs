//! Filter criteria and the pagination mode derived from them

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::post::ContentKind;

/// How the feed is currently being browsed.
///
/// Always derived from [`FilterCriteria::mode`], never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum PaginationMode {
    Unfiltered,
    Filtered,
    Search,
    Combined,
}

impl PaginationMode {
    /// Whether pages are cut from a locally filtered working set
    pub fn is_filtering(self) -> bool {
        !matches!(self, PaginationMode::Unfiltered)
    }
}

/// Structured filter fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentFilters {
    #[serde(default)]
    pub kinds: BTreeSet<ContentKind>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub min_likes: Option<u64>,
}

impl ContentFilters {
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
            && self.author.is_none()
            && self.tags.is_empty()
            && self.min_likes.is_none()
    }
}

/// Immutable search + filter value object.
///
/// Two criteria are equal iff every field matches. Search text is stored
/// trimmed, so whitespace-only edits compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterCriteria {
    search: String,
    filters: ContentFilters,
}

impl FilterCriteria {
    pub fn new(search: impl AsRef<str>, filters: ContentFilters) -> Self {
        Self {
            search: search.as_ref().trim().to_string(),
            filters: normalize(filters),
        }
    }

    /// Criteria with search text only
    pub fn search(text: impl AsRef<str>) -> Self {
        Self::new(text, ContentFilters::default())
    }

    /// Criteria with structured filters only
    pub fn filtered(filters: ContentFilters) -> Self {
        Self::new("", filters)
    }

    pub fn with_search(&self, text: impl AsRef<str>) -> Self {
        Self::new(text, self.filters.clone())
    }

    pub fn with_kind(&self, kind: ContentKind) -> Self {
        let mut filters = self.filters.clone();
        filters.kinds.insert(kind);
        Self::new(&self.search, filters)
    }

    pub fn with_tag(&self, tag: impl AsRef<str>) -> Self {
        let mut filters = self.filters.clone();
        filters.tags.insert(tag.as_ref().to_string());
        Self::new(&self.search, filters)
    }

    pub fn with_author(&self, author: impl Into<String>) -> Self {
        let mut filters = self.filters.clone();
        filters.author = Some(author.into());
        Self::new(&self.search, filters)
    }

    pub fn with_min_likes(&self, min_likes: u64) -> Self {
        let mut filters = self.filters.clone();
        filters.min_likes = Some(min_likes);
        Self::new(&self.search, filters)
    }

    pub fn search_text(&self) -> &str {
        &self.search
    }

    pub fn filters(&self) -> &ContentFilters {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.filters.is_empty()
    }

    /// Derive the pagination mode from the current criteria
    pub fn mode(&self) -> PaginationMode {
        match (self.search.is_empty(), self.filters.is_empty()) {
            (true, true) => PaginationMode::Unfiltered,
            (true, false) => PaginationMode::Filtered,
            (false, true) => PaginationMode::Search,
            (false, false) => PaginationMode::Combined,
        }
    }

    /// Stable-within-process hash used as part of cache keys
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

fn normalize(mut filters: ContentFilters) -> ContentFilters {
    filters.tags = filters
        .tags
        .into_iter()
        .map(|t| t.trim().trim_start_matches('#').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    filters.author = filters
        .author
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());
    filters
}
