//! Pagination engine
//!
//! This module contains the pieces the coordinator drives:
//! - The load-more state machine and generation counter
//! - Batch store, filter engine and strategy selection
//! - Auto-fetch, retry/recovery, response cache and metrics

pub mod auto_fetch;
pub mod cache;
pub mod coordinator;
pub mod error;
pub mod filter;
pub mod generation;
pub mod metadata;
pub mod monitor;
pub mod recovery;
pub mod state_machine;
pub mod store;
pub mod strategy;

pub use coordinator::{LoadMoreOutcome, PageUpdate, PaginationCoordinator};
pub use error::{PaginationError, SourceError};
pub use metadata::PaginationMetadata;
pub use state_machine::LoadMoreState;
pub use strategy::Strategy;
