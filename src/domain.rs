//! Domain types
//!
//! This module contains the values the pagination engine moves around:
//! - Feed items and interaction counters
//! - Search/filter criteria and the pagination mode derived from them

pub mod criteria;
pub mod post;

pub use criteria::{ContentFilters, FilterCriteria, PaginationMode};
pub use post::{ContentKind, Interaction, Post, PostId};
