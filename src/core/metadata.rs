//! Per-session pagination counters

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters describing how far a session has paginated.
///
/// Owned and mutated by the coordinator only; readers get a copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaginationMetadata {
    /// Items received from the server so far (evicted ones included)
    pub total_loaded: usize,
    /// Items among the currently stored ones that match the criteria
    pub loaded_matching: usize,
    /// Matching items overall, once knowable
    pub total_matching: Option<usize>,
    /// Number of working-set items currently visible
    pub display_cursor: usize,
    /// Total reported by the server, if any
    pub server_total: Option<usize>,
    /// The server returned a short or empty page
    pub end_of_source: bool,
    pub batches_fetched: usize,
    pub last_fetch_at: Option<DateTime<Utc>>,
}

impl PaginationMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the server has nothing left to give
    pub fn server_exhausted(&self) -> bool {
        self.end_of_source
            || self
                .server_total
                .is_some_and(|total| self.total_loaded >= total)
    }

    /// Loaded matches not yet revealed
    pub fn unseen(&self) -> usize {
        self.loaded_matching.saturating_sub(self.display_cursor)
    }

    pub fn has_more(&self) -> bool {
        self.unseen() > 0 || !self.server_exhausted()
    }

    /// Record a server page of `received` items out of `requested`
    pub fn record_fetch(&mut self, received: usize, requested: usize, server_total: Option<usize>) {
        self.total_loaded += received;
        self.batches_fetched += 1;
        self.last_fetch_at = Some(Utc::now());
        if server_total.is_some() {
            self.server_total = server_total;
        }
        if received < requested {
            self.end_of_source = true;
        }
    }

    /// Reveal up to `page_size` more items. Returns how many were revealed.
    pub fn advance_cursor(&mut self, page_size: usize) -> usize {
        let step = self.unseen().min(page_size);
        self.display_cursor += step;
        step
    }

    /// Forget the cursor and match counts, keeping what is known about the server
    pub fn reset_for_criteria(&mut self) {
        self.display_cursor = 0;
        self.loaded_matching = 0;
        self.total_matching = None;
    }
}
