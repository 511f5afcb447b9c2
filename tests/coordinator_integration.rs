use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use pretty_assertions::assert_eq;

use feedpager::{
    core::{
        metadata::PaginationMetadata, LoadMoreOutcome, LoadMoreState, PageUpdate,
        PaginationCoordinator, PaginationError, SourceError, Strategy,
    },
    domain::{FilterCriteria, Post},
    infrastructure::{
        config::PaginationConfig,
        memory_source::{InMemorySource, Scripted},
    },
    test_helpers::{make_posts, test_config},
};

type Pager = PaginationCoordinator<Arc<InMemorySource>>;

fn pager_over(posts: Vec<Post>, config: PaginationConfig) -> (Pager, Arc<InMemorySource>) {
    let source = Arc::new(InMemorySource::new(posts));
    (PaginationCoordinator::new(Arc::clone(&source), config), source)
}

fn loaded(outcome: LoadMoreOutcome) -> PageUpdate {
    match outcome {
        LoadMoreOutcome::Loaded(update) => update,
        LoadMoreOutcome::Superseded => panic!("load was superseded"),
    }
}

/// `make_posts(n)` with the tag "rare" on the given 1-based positions
fn posts_tagged_rare(n: usize, rare: &[usize]) -> Vec<Post> {
    make_posts(n)
        .into_iter()
        .enumerate()
        .map(|(i, post)| {
            if rare.contains(&(i + 1)) {
                post.with_tags(["rare"])
            } else {
                post
            }
        })
        .collect()
}

fn visible_ids(pager: &Pager) -> Vec<String> {
    pager
        .visible_page()
        .iter()
        .map(|p| p.id.to_string())
        .collect()
}

#[tokio::test]
async fn test_unfiltered_pages_until_source_ends() {
    let (pager, source) = pager_over(make_posts(20), test_config());

    let first = loaded(pager.load_more().await.expect("page 1"));
    assert_eq!(first.revealed, 15);
    assert!(first.has_more);
    assert_eq!(first.strategy, Strategy::ServerFetch { page_size: 15 });
    assert_eq!(visible_ids(&pager).first().map(String::as_str), Some("post-1"));
    assert_eq!(pager.metadata().total_matching, Some(20));

    let second = loaded(pager.load_more().await.expect("page 2"));
    assert_eq!(second.revealed, 5);
    assert!(!second.has_more);
    assert!(!pager.has_more());

    let ids = visible_ids(&pager);
    let expected: Vec<String> = (1..=20).map(|i| format!("post-{i}")).collect();
    assert_eq!(ids, expected);
    assert_eq!(pager.load_more_state(), LoadMoreState::Idle);
    assert_eq!(source.calls(), 2);

    let requests = source.requests();
    assert_eq!(requests[0].offset, 0);
    assert_eq!(requests[1].offset, 15);
}

#[tokio::test]
async fn test_load_more_after_end_does_not_hit_backend() {
    let (pager, source) = pager_over(make_posts(20), test_config());
    pager.load_more().await.expect("page 1");
    pager.load_more().await.expect("page 2");

    let update = loaded(pager.load_more().await.expect("page 3"));
    assert_eq!(update.revealed, 0);
    assert!(!update.has_more);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_filtered_slice_from_exhausted_server_never_suspends() {
    let (pager, source) = pager_over(posts_tagged_rare(30, &[2, 9, 14, 21, 28]), test_config());
    pager.load_more().await.expect("page 1");
    pager.load_more().await.expect("page 2");
    assert!(pager.metadata().server_exhausted());

    assert!(pager.apply_filters(FilterCriteria::default().with_tag("rare")));
    assert!(pager.visible_page().is_empty());
    assert_eq!(pager.metadata().loaded_matching, 5);

    let outcome = pager
        .load_more()
        .now_or_never()
        .expect("client slice completes without suspending")
        .expect("client slice");
    let update = loaded(outcome);
    assert_eq!(update.strategy, Strategy::ClientPaginate { page_size: 15 });
    assert_eq!(update.revealed, 5);
    assert!(!update.has_more);
    assert_eq!(update.auto_fetch_rounds, 0);
    assert_eq!(
        visible_ids(&pager),
        vec!["post-2", "post-9", "post-14", "post-21", "post-28"]
    );
    assert_eq!(pager.metadata().total_matching, Some(5));
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_thin_filtered_page_auto_fetches_within_budget() {
    let (pager, source) =
        pager_over(posts_tagged_rare(100, &[2, 9, 14, 21, 28, 40, 70]), test_config());
    pager.load_more().await.expect("page 1");
    pager.load_more().await.expect("page 2");

    pager.apply_filters(FilterCriteria::default().with_tag("rare"));
    let update = loaded(pager.load_more().await.expect("filtered page"));

    assert_eq!(update.strategy, Strategy::ClientPaginate { page_size: 15 });
    assert_eq!(update.auto_fetch_rounds, 3);
    assert_eq!(update.revealed, 7);
    assert!(update.incomplete);
    assert!(update.has_more);
    assert_eq!(source.calls(), 5);
    assert_eq!(pager.loaded_items(), 75);
    assert_eq!(pager.load_more_state(), LoadMoreState::Idle);
    assert_eq!(pager.metrics().auto_fetch_rounds, 3);
    assert_eq!(pager.metadata().total_matching, None);

    let offsets: Vec<usize> = source.requests().iter().map(|r| r.offset).collect();
    assert_eq!(offsets, vec![0, 15, 30, 45, 60]);
}

#[tokio::test]
async fn test_auto_fetch_stops_once_page_is_full() {
    let rare: Vec<usize> = (1..=60).filter(|i| i % 4 == 0).collect();
    let (pager, source) = pager_over(posts_tagged_rare(60, &rare), test_config());
    pager.load_more().await.expect("page 1");

    pager.apply_filters(FilterCriteria::default().with_tag("rare"));
    let update = loaded(pager.load_more().await.expect("filtered page"));

    // 3 matches loaded, 4 more per supplemental page
    assert_eq!(update.revealed, 15);
    assert_eq!(update.auto_fetch_rounds, 3);
    assert!(!update.incomplete);
    assert_eq!(source.calls(), 4);
}

#[tokio::test]
async fn test_filtered_mode_with_nothing_loaded_auto_fetches() {
    let (pager, source) = pager_over(posts_tagged_rare(100, &[2, 20, 40, 70]), test_config());
    pager.apply_filters(FilterCriteria::default().with_tag("rare"));

    let first = loaded(pager.load_more().await.expect("filtered page"));
    assert_eq!(first.strategy, Strategy::ClientPaginate { page_size: 15 });
    assert_eq!(first.auto_fetch_rounds, 3);
    assert_eq!(first.revealed, 3);
    assert!(first.incomplete);
    assert!(first.has_more);
    assert_eq!(source.calls(), 3);

    // nothing unseen is left, so the next press grows the store again
    let second = loaded(pager.load_more().await.expect("next filtered page"));
    assert_eq!(second.strategy, Strategy::ClientPaginate { page_size: 15 });
    assert_eq!(second.auto_fetch_rounds, 3);
    assert_eq!(second.revealed, 1);
    assert_eq!(source.calls(), 6);
    assert_eq!(
        visible_ids(&pager),
        vec!["post-2", "post-20", "post-40", "post-70"]
    );

    let offsets: Vec<usize> = source.requests().iter().map(|r| r.offset).collect();
    assert_eq!(offsets, vec![0, 15, 30, 45, 60, 75]);
}

#[tokio::test(start_paused = true)]
async fn test_two_timeouts_then_success() {
    let config = PaginationConfig::default();
    let (pager, source) = pager_over(make_posts(40), config);
    source.script([
        Scripted::Delay(Duration::from_secs(5)),
        Scripted::Delay(Duration::from_secs(5)),
    ]);

    let started = tokio::time::Instant::now();
    let update = loaded(pager.load_more().await.expect("third attempt succeeds"));

    assert_eq!(update.revealed, 15);
    assert_eq!(pager.load_more_state(), LoadMoreState::Idle);
    assert_eq!(pager.visible_page().len(), 15);
    assert_eq!(source.calls(), 3);

    let metrics = pager.metrics();
    assert_eq!(metrics.retries, 2);
    assert_eq!(metrics.fetch_failures, 2);
    // 2s + 500ms + 2s + 1000ms
    assert!(started.elapsed() >= Duration::from_millis(5_500));

    let history = pager.transition_history();
    let states: Vec<LoadMoreState> = history.iter().map(|r| r.to).collect();
    assert_eq!(
        states,
        vec![
            LoadMoreState::LoadingServer,
            LoadMoreState::Complete,
            LoadMoreState::Idle
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_surface_error_then_retry_recovers() {
    let (pager, source) = pager_over(make_posts(40), test_config());
    source.script(std::iter::repeat(Scripted::Fail(SourceError::Network(String::from("down")))).take(4));

    let err = pager.load_more().await.unwrap_err();
    assert!(matches!(err, PaginationError::Network { attempts: 4, .. }));
    assert!(err.is_user_visible());
    assert_eq!(pager.load_more_state(), LoadMoreState::Error);
    assert!(pager.visible_page().is_empty());

    let update = loaded(pager.load_more().await.expect("manual retry"));
    assert_eq!(update.revealed, 15);
    assert_eq!(pager.load_more_state(), LoadMoreState::Idle);
    assert_eq!(source.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_load_more_is_rejected() {
    let source = Arc::new(InMemorySource::new(make_posts(40)).with_latency(Duration::from_millis(100)));
    let pager = PaginationCoordinator::new(Arc::clone(&source), test_config());

    let (first, second, third) = tokio::join!(pager.load_more(), pager.load_more(), pager.load_more());

    assert!(matches!(first, Ok(LoadMoreOutcome::Loaded(_))));
    assert!(matches!(second, Err(PaginationError::ConcurrentRequest)));
    assert!(matches!(third, Err(PaginationError::ConcurrentRequest)));
    assert!(!PaginationError::ConcurrentRequest.is_user_visible());
    assert_eq!(source.calls(), 1);
    assert_eq!(source.max_in_flight(), 1);
    assert_eq!(pager.metrics().rejected_requests, 2);
    assert_eq!(pager.visible_page().len(), 15);
}

#[tokio::test(start_paused = true)]
async fn test_criteria_change_mid_fetch_discards_old_response() {
    let source = Arc::new(InMemorySource::new(make_posts(40)).with_latency(Duration::from_millis(100)));
    let pager = PaginationCoordinator::new(Arc::clone(&source), test_config());

    let (old, new) = tokio::join!(pager.load_more(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(pager.apply_filters(FilterCriteria::search("beat")));
        pager.load_more().await
    });

    assert_eq!(old.expect("stale call resolves"), LoadMoreOutcome::Superseded);
    let update = loaded(new.expect("new fetch"));
    // every third post mentions "beat": 5 + 5 + 3 over three rounds
    assert_eq!(update.strategy, Strategy::ClientPaginate { page_size: 15 });
    assert_eq!(update.auto_fetch_rounds, 3);
    assert_eq!(update.revealed, 13);
    assert!(!update.has_more);
    assert_eq!(pager.loaded_items(), 40);
    assert_eq!(pager.metadata().total_loaded, 40);
    assert_eq!(pager.metadata().batches_fetched, 3);
    assert_eq!(pager.metrics().stale_discards, 1);
    assert_eq!(source.calls(), 4);
    assert!(pager
        .visible_page()
        .iter()
        .all(|p| p.title.contains("beat")));
}

#[tokio::test(start_paused = true)]
async fn test_reset_mid_fetch_leaves_fresh_session() {
    let source = Arc::new(InMemorySource::new(make_posts(40)).with_latency(Duration::from_millis(100)));
    let pager = PaginationCoordinator::new(Arc::clone(&source), test_config());

    let (outcome, ()) = tokio::join!(pager.load_more(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        pager.reset();
    });

    assert_eq!(outcome.expect("stale call resolves"), LoadMoreOutcome::Superseded);
    assert_eq!(pager.metadata(), PaginationMetadata::default());
    assert_eq!(pager.loaded_items(), 0);
    assert_eq!(pager.load_more_state(), LoadMoreState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_criteria_change_between_auto_fetch_rounds() {
    let source = Arc::new(
        InMemorySource::new(posts_tagged_rare(100, &[70])).with_latency(Duration::from_millis(100)),
    );
    let pager = PaginationCoordinator::new(Arc::clone(&source), test_config());
    pager.load_more().await.expect("page 1");
    pager.apply_filters(FilterCriteria::default().with_tag("rare"));

    // round 1 lands at 100ms, the criteria change at 150ms, round 2 at 200ms
    let (outcome, loaded_at_change) = tokio::join!(pager.load_more(), async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(pager.apply_filters(FilterCriteria::search("beat")));
        pager.loaded_items()
    });

    assert_eq!(outcome.expect("stale call resolves"), LoadMoreOutcome::Superseded);
    assert_eq!(loaded_at_change, 30);
    assert_eq!(pager.loaded_items(), 30);
    assert_eq!(pager.metrics().stale_discards, 1);
    assert_eq!(source.calls(), 3);
    assert_eq!(pager.load_more_state(), LoadMoreState::Idle);
    assert!(pager.visible_page().is_empty());

    // 10 matches already loaded, one round supplies the other 5
    let update = loaded(pager.load_more().await.expect("new criteria page"));
    assert_eq!(update.revealed, 15);
    assert_eq!(update.auto_fetch_rounds, 1);
    assert!(!update.incomplete);
    assert_eq!(source.calls(), 4);
    assert!(pager
        .visible_page()
        .iter()
        .all(|p| p.title.contains("beat")));
}

#[tokio::test(start_paused = true)]
async fn test_reset_between_auto_fetch_rounds_leaves_fresh_session() {
    let source = Arc::new(
        InMemorySource::new(posts_tagged_rare(100, &[70])).with_latency(Duration::from_millis(100)),
    );
    let pager = PaginationCoordinator::new(Arc::clone(&source), test_config());
    pager.apply_filters(FilterCriteria::default().with_tag("rare"));

    let (outcome, ()) = tokio::join!(pager.load_more(), async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        pager.reset();
    });

    assert_eq!(outcome.expect("stale call resolves"), LoadMoreOutcome::Superseded);
    assert_eq!(source.calls(), 2);
    assert_eq!(pager.metadata(), PaginationMetadata::default());
    assert_eq!(pager.loaded_items(), 0);
    assert_eq!(pager.criteria(), FilterCriteria::default());
    assert_eq!(pager.load_more_state(), LoadMoreState::Idle);
}

#[tokio::test]
async fn test_apply_same_criteria_twice_is_noop() {
    let (pager, source) = pager_over(make_posts(40), test_config());
    let criteria = FilterCriteria::search("beat");

    assert!(pager.apply_filters(criteria.clone()));
    pager.load_more().await.expect("filtered page");
    let metadata = pager.metadata();
    let generation = pager.generation();
    let calls = source.calls();

    assert!(!pager.apply_filters(criteria));
    assert_eq!(pager.metadata(), metadata);
    assert_eq!(pager.generation(), generation);
    assert_eq!(source.calls(), calls);
}

#[tokio::test]
async fn test_apply_filters_restarts_from_first_page_without_fetching() {
    let (pager, source) = pager_over(make_posts(40), test_config());
    pager.load_more().await.expect("page 1");
    pager.load_more().await.expect("page 2");

    pager.apply_filters(FilterCriteria::search("beat"));
    assert!(pager.visible_page().is_empty());
    assert_eq!(pager.metadata().display_cursor, 0);
    assert_eq!(pager.metadata().loaded_matching, 10);
    assert_eq!(source.calls(), 2);

    // back to unfiltered: 30 loaded items cover two pages without the network
    pager.apply_filters(FilterCriteria::default());
    let update = loaded(pager.load_more().await.expect("unfiltered page"));
    assert_eq!(update.revealed, 15);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_reset_restores_initial_metadata() {
    let (pager, _source) = pager_over(make_posts(40), test_config());
    pager.apply_filters(FilterCriteria::search("vibes"));
    pager.load_more().await.expect("page");

    pager.reset();
    assert_eq!(pager.metadata(), PaginationMetadata::default());
    assert_eq!(pager.criteria(), FilterCriteria::default());
    assert_eq!(pager.load_more_state(), LoadMoreState::Idle);
    assert!(pager.visible_page().is_empty());
}

#[tokio::test]
async fn test_long_session_stays_within_bounds() {
    let config = PaginationConfig {
        store_capacity: 45,
        cache_capacity: 4,
        ..test_config()
    };
    let (pager, source) = pager_over(make_posts(300), config);

    for _ in 0..15 {
        pager.load_more().await.expect("page");
        assert!(pager.loaded_items() <= 45);
        assert!(pager.cached_pages() <= 4);
        let metadata = pager.metadata();
        assert!(metadata.display_cursor <= metadata.loaded_matching);
    }

    let metadata = pager.metadata();
    assert_eq!(metadata.total_loaded, 225);
    assert_eq!(source.calls(), 15);
    assert!(pager.metrics().evicted_items > 0);
    // the server offset keeps counting past evicted batches
    assert_eq!(source.requests().last().map(|r| r.offset), Some(210));
}
