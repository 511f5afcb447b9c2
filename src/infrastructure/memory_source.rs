//! In-process backend used by the demo binary and the tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};

use super::source::{PageRequest, PageResponse, PostSource, SortOrder};
use crate::core::error::SourceError;
use crate::domain::{ContentKind, Post};

const KINDS: [ContentKind; 4] = [
    ContentKind::Post,
    ContentKind::Track,
    ContentKind::Album,
    ContentKind::Playlist,
];
const AUTHORS: [&str; 5] = ["alice", "bob", "carol", "dave", "erin"];
const TAGS: [&[&str]; 3] = [&["lofi", "chill"], &["synthwave"], &["jazz", "live"]];

/// A deterministic feed of `count` posts, `post-1` being the newest.
///
/// Every third title mentions "beat", kinds and authors rotate.
pub fn synthetic_feed(count: usize, newest_at: DateTime<Utc>) -> Vec<Post> {
    (1..=count)
        .map(|i| {
            let kind = KINDS[(i - 1) % KINDS.len()];
            let mood = if i % 3 == 0 { "beat" } else { "vibes" };
            let created_at = newest_at - ChronoDuration::minutes(i as i64 - 1);
            Post::new(
                format!("post-{i}"),
                kind,
                AUTHORS[(i - 1) % AUTHORS.len()],
                format!("{kind} {mood} #{i}"),
                created_at,
            )
            .with_body(format!("Sample {kind} number {i}"))
            .with_tags(TAGS[i % TAGS.len()].iter().copied())
            .with_likes(((i * 7) % 50) as u64)
        })
        .collect()
}

/// Scripted behaviour for the next call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    /// Fail immediately with the given error
    Fail(SourceError),
    /// Answer normally, but only after the given delay
    Delay(Duration),
}

/// A fixed list of posts served page by page.
///
/// Calls consume scripted behaviours first (failures, delays) and fall back
/// to the configured latency afterwards. Every call is counted, and the
/// maximum number of simultaneously running calls is tracked.
#[derive(Debug)]
pub struct InMemorySource {
    posts: Vec<Post>,
    latency: Duration,
    report_total: bool,
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<PageRequest>>,
}

impl InMemorySource {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            posts,
            latency: Duration::ZERO,
            report_total: true,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Stop reporting `total_count`, like backends that cannot count cheaply
    pub fn without_total(mut self) -> Self {
        self.report_total = false;
        self
    }

    /// Queue behaviour for upcoming calls, in order
    pub fn script(&self, steps: impl IntoIterator<Item = Scripted>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(steps);
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn sorted(&self, sort: SortOrder) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self.posts.iter().collect();
        match sort {
            SortOrder::Newest => posts.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::Oldest => posts.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::Trending => posts.sort_by(|a, b| {
                b.likes
                    .cmp(&a.likes)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            }),
        }
        posts
    }

    fn page(&self, request: PageRequest) -> PageResponse {
        let items = self
            .sorted(request.sort)
            .into_iter()
            .skip(request.offset)
            .take(request.page_size)
            .cloned()
            .collect();
        PageResponse {
            items,
            total_count: self.report_total.then_some(self.posts.len()),
        }
    }
}

/// Decrements the in-flight counter even when the call is dropped by a timeout
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PostSource for InMemorySource {
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResponse, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let step = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let delay = match step {
            Some(Scripted::Fail(err)) => {
                log::debug!("InMemorySource: scripted failure for {request:?}: {err}");
                return Err(err);
            }
            Some(Scripted::Delay(delay)) => delay,
            None => self.latency,
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Ok(self.page(request))
    }
}
