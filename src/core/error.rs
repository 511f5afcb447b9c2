//! Error taxonomy of the pagination engine

use std::time::Duration;

use thiserror::Error;

use super::state_machine::LoadMoreState;

/// Failures reported by the backend collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("backend unavailable")]
    Unavailable,
}

/// Errors raised by [`PaginationCoordinator`](super::coordinator::PaginationCoordinator)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// A load-more was requested while another one is still in flight
    #[error("a load-more request is already in progress")]
    ConcurrentRequest,

    /// The backend kept failing after all retries
    #[error("failed to load posts after {attempts} attempts: {source}")]
    Network {
        attempts: u32,
        #[source]
        source: SourceError,
    },

    /// A response arrived for a generation that is no longer current
    #[error("stale response from generation {response} (current {current})")]
    StaleResponse { response: u64, current: u64 },

    /// Pagination bookkeeping disagreed with the loaded data; the session was reset
    #[error("pagination state was inconsistent ({0}), please retry")]
    InconsistentState(String),

    #[error("invalid load-more transition {from} -> {to}")]
    InvalidTransition {
        from: LoadMoreState,
        to: LoadMoreState,
    },
}

impl PaginationError {
    /// Whether the error should interrupt the user's browsing flow
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            PaginationError::Network { .. } | PaginationError::InconsistentState(_)
        )
    }

    /// Whether calling `load_more()` again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaginationError::Network { .. } | PaginationError::InconsistentState(_)
        )
    }
}
