//! Filter engine: the working set as a pure function of (store, criteria)

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use super::store::PostBatchStore;
use crate::domain::{FilterCriteria, Post};

lazy_static! {
    static ref HASHTAG: Regex = Regex::new(r"#([\p{L}\p{N}_]+)").expect("valid hashtag regex");
}

/// External predicate deciding whether a post matches the criteria.
///
/// Implementations must be pure: the same post and criteria always give the
/// same answer.
pub trait PostMatcher: Send + Sync {
    fn matches(&self, post: &Post, criteria: &FilterCriteria) -> bool;
}

impl<F> PostMatcher for F
where
    F: Fn(&Post, &FilterCriteria) -> bool + Send + Sync,
{
    fn matches(&self, post: &Post, criteria: &FilterCriteria) -> bool {
        self(post, criteria)
    }
}

/// Default matcher.
///
/// Structured filters match exactly. In the search text, `#hashtag` tokens
/// must match a tag and every remaining term must occur (case-insensitively)
/// in the title, body, author or tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct CriteriaMatcher;

impl CriteriaMatcher {
    fn matches_filters(post: &Post, criteria: &FilterCriteria) -> bool {
        let filters = criteria.filters();
        (filters.kinds.is_empty() || filters.kinds.contains(&post.kind))
            && filters
                .author
                .as_deref()
                .map_or(true, |author| post.author.eq_ignore_ascii_case(author))
            && filters.tags.iter().all(|tag| post.has_tag(tag))
            && filters.min_likes.map_or(true, |min| post.likes >= min)
    }

    fn matches_search(post: &Post, search: &str) -> bool {
        if search.is_empty() {
            return true;
        }

        let hashtags_match = HASHTAG
            .captures_iter(search)
            .all(|caps| post.has_tag(&caps[1]));
        if !hashtags_match {
            return false;
        }

        let haystack = format!(
            "{}\n{}\n{}\n{}",
            post.title,
            post.body,
            post.author,
            post.tags.join(" ")
        )
        .to_lowercase();
        HASHTAG
            .replace_all(search, " ")
            .split_whitespace()
            .all(|term| haystack.contains(&term.to_lowercase()))
    }
}

impl PostMatcher for CriteriaMatcher {
    fn matches(&self, post: &Post, criteria: &FilterCriteria) -> bool {
        Self::matches_filters(post, criteria) && Self::matches_search(post, criteria.search_text())
    }
}

/// Applies a [`PostMatcher`] to the store
#[derive(Clone)]
pub struct FilterEngine {
    matcher: Arc<dyn PostMatcher>,
}

impl FilterEngine {
    pub fn new(matcher: Arc<dyn PostMatcher>) -> Self {
        Self { matcher }
    }

    /// The working set: matching posts in store order.
    ///
    /// Empty criteria match everything without consulting the matcher.
    pub fn apply<'a>(&self, store: &'a PostBatchStore, criteria: &FilterCriteria) -> Vec<&'a Post> {
        if criteria.is_empty() {
            return store.iter().collect();
        }
        store
            .iter()
            .filter(|post| self.matcher.matches(post, criteria))
            .collect()
    }

    /// Number of matches in `posts`, without materialising them
    pub fn count_matches<'a, I>(&self, posts: I, criteria: &FilterCriteria) -> usize
    where
        I: IntoIterator<Item = &'a Post>,
    {
        if criteria.is_empty() {
            return posts.into_iter().count();
        }
        posts
            .into_iter()
            .filter(|post| self.matcher.matches(post, criteria))
            .count()
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(Arc::new(CriteriaMatcher))
    }
}

impl std::fmt::Debug for FilterEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterEngine").finish_non_exhaustive()
    }
}
