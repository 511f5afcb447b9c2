//! # Feedpager
//!
//! A pagination engine for social content feeds. One coordinator serves
//! unfiltered browsing, structured filters, free-text search and their
//! combination behind a single "load more" operation.
//!
//! ## Example
//!
//! ```rust
//! use feedpager::core::PaginationCoordinator;
//! use feedpager::domain::FilterCriteria;
//! use feedpager::infrastructure::{config::PaginationConfig, memory_source::InMemorySource};
//! use feedpager::test_helpers::make_posts;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(async {
//!     let source = InMemorySource::new(make_posts(40));
//!     let pager = PaginationCoordinator::new(source, PaginationConfig::default());
//!
//!     pager.load_more().await.unwrap();
//!     assert_eq!(pager.visible_page().len(), 15);
//!
//!     pager.apply_filters(FilterCriteria::search("beat"));
//!     assert!(pager.visible_page().is_empty());
//! });
//! ```
//!
//! ## Modules
//!
//! - [`core`] - State machine, store, filtering, strategies and the coordinator
//! - [`domain`] - Feed items and filter criteria
//! - [`infrastructure`] - Backend trait, in-memory backend, config and CLI
//! - [`utils`] - Logging, panic handling and paths

pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod test_helpers;
pub mod utils;

pub use crate::core::{LoadMoreOutcome, PaginationCoordinator, PaginationError};
pub use domain::{FilterCriteria, Post};

/// Result type used throughout the binary
pub type Result<T> = color_eyre::eyre::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
