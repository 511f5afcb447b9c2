//! Fixtures shared by unit tests, integration tests and benches

use chrono::{DateTime, TimeZone, Utc};

use crate::core::store::PostBatchStore;
use crate::domain::Post;
use crate::infrastructure::config::PaginationConfig;
use crate::infrastructure::memory_source::synthetic_feed;

/// Fixed reference time so fixtures are reproducible
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// `post-1` .. `post-n`, newest first, no likes
pub fn make_posts(n: usize) -> Vec<Post> {
    synthetic_feed(n, epoch())
        .into_iter()
        .map(|post| post.with_likes(0))
        .collect()
}

/// A store holding `make_posts(n)` as a single batch
pub fn make_store(n: usize) -> PostBatchStore {
    let mut store = PostBatchStore::new();
    store.append_batch(make_posts(n), Some(n));
    store
}

/// Default tunables with a short retry backoff
pub fn test_config() -> PaginationConfig {
    PaginationConfig {
        retry_base_delay_ms: 10,
        ..PaginationConfig::default()
    }
}
