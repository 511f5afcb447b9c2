//! Strategy selection for the next load-more

use strum::Display;

use super::metadata::PaginationMetadata;
use crate::domain::PaginationMode;

/// How the next page is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Strategy {
    /// Grow the store with a network page, then re-slice
    ServerFetch { page_size: usize },
    /// Reveal already-loaded matches without touching the network
    ClientPaginate { page_size: usize },
}

impl Strategy {
    pub fn page_size(self) -> usize {
        match self {
            Strategy::ServerFetch { page_size } | Strategy::ClientPaginate { page_size } => page_size,
        }
    }
}

/// Chooses between server-fetch and client-paginate.
///
/// Holds no state besides the page size, so nothing survives a criteria change.
#[derive(Debug, Clone, Copy)]
pub struct StrategySelector {
    page_size: usize,
}

impl StrategySelector {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Filtering modes always slice the working set. A short slice, even an
    /// empty one, hands its shortfall to auto-fetch, whose rounds are the
    /// server fetches that grow the store.
    pub fn determine_strategy(&self, mode: PaginationMode, _metadata: &PaginationMetadata) -> Strategy {
        let page_size = self.page_size;
        if !mode.is_filtering() {
            return Strategy::ServerFetch { page_size };
        }

        Strategy::ClientPaginate { page_size }
    }
}
