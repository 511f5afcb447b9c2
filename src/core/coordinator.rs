//! Pagination coordinator
//!
//! Receives "load more", "filters changed" and "reset" events, drives the
//! state machine, picks a strategy and keeps store and metadata in step.
//!
//! All bookkeeping happens in synchronous sections under the session lock.
//! The lock is never held across an `.await`, so the only suspension points
//! are the backend fetches (and their retry backoff). A response is applied
//! only if its generation is still current.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

use super::auto_fetch::{AutoFetchController, AutoFetchRequest, AutoFetchStop, RoundVerdict};
use super::cache::{CacheKey, ResponseCache};
use super::error::PaginationError;
use super::filter::{FilterEngine, PostMatcher};
use super::generation::Generation;
use super::metadata::PaginationMetadata;
use super::monitor::{MetricsSnapshot, PerformanceMonitor};
use super::recovery::ErrorRecoveryManager;
use super::state_machine::{LoadMoreState, LoadMoreStateMachine, TransitionRecord};
use super::store::PostBatchStore;
use super::strategy::{Strategy, StrategySelector};
use crate::domain::{FilterCriteria, Interaction, PaginationMode, Post, PostId};
use crate::infrastructure::config::PaginationConfig;
use crate::infrastructure::source::{PageRequest, PageResponse, PostSource};

/// Result of a finished `load_more()` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUpdate {
    pub strategy: Strategy,
    /// Items newly made visible by this call
    pub revealed: usize,
    pub has_more: bool,
    /// Auto-fetch gave up before filling the page
    pub incomplete: bool,
    pub from_cache: bool,
    pub auto_fetch_rounds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadMoreOutcome {
    Loaded(PageUpdate),
    /// Criteria changed or the session was reset while the call was in flight
    Superseded,
}

impl LoadMoreOutcome {
    pub fn update(&self) -> Option<&PageUpdate> {
        match self {
            LoadMoreOutcome::Loaded(update) => Some(update),
            LoadMoreOutcome::Superseded => None,
        }
    }
}

/// Everything mutable about one pagination session
#[derive(Debug)]
struct Session {
    criteria: FilterCriteria,
    store: PostBatchStore,
    metadata: PaginationMetadata,
    machine: LoadMoreStateMachine,
    generation: Generation,
    cache: ResponseCache,
    monitor: PerformanceMonitor,
}

impl Session {
    /// Recount matches after the store or the criteria changed
    fn refresh_matching(&mut self, filter: &FilterEngine) {
        let matching = filter.apply(&self.store, &self.criteria).len();
        let metadata = &mut self.metadata;
        metadata.loaded_matching = matching;
        metadata.display_cursor = metadata.display_cursor.min(matching);
        metadata.total_matching = if metadata.server_exhausted() {
            Some(matching)
        } else if self.criteria.mode().is_filtering() {
            None
        } else {
            metadata
                .server_total
                .map(|total| total.saturating_sub(self.store.evicted()))
        };
    }

    fn append_page(&mut self, response: PageResponse, requested: usize, filter: &FilterEngine) {
        let received = response.items.len();
        self.store.append_batch(response.items, response.total_count);
        self.metadata
            .record_fetch(received, requested, response.total_count);
        self.refresh_matching(filter);
        self.monitor.record_store_len(self.store.len(), 0);
    }

    fn cache_key(&self, page_index: usize) -> CacheKey {
        CacheKey {
            mode: self.criteria.mode(),
            fingerprint: self.criteria.fingerprint(),
            page_index,
        }
    }

    /// Drop all per-session state; the generation keeps counting up
    fn reset(&mut self, context: &str) {
        self.generation = self.generation.next();
        self.criteria = FilterCriteria::default();
        self.store.clear();
        self.metadata = PaginationMetadata::default();
        self.machine.reset(context);
    }
}

/// Work left to do once the synchronous part of `load_more()` is over
enum Plan {
    Done(LoadMoreOutcome),
    Fetch {
        generation: Generation,
        request: PageRequest,
        cache_key: CacheKey,
    },
    AutoFetch {
        generation: Generation,
        request: AutoFetchRequest,
        revealed: usize,
    },
}

/// Orchestrates pagination for one browsing session.
pub struct PaginationCoordinator<S> {
    source: S,
    config: PaginationConfig,
    selector: StrategySelector,
    filter: FilterEngine,
    auto_fetch: AutoFetchController,
    recovery: ErrorRecoveryManager,
    session: Mutex<Session>,
}

impl<S: PostSource> PaginationCoordinator<S> {
    pub fn new(source: S, config: PaginationConfig) -> Self {
        let session = Session {
            criteria: FilterCriteria::default(),
            store: PostBatchStore::new(),
            metadata: PaginationMetadata::new(),
            machine: LoadMoreStateMachine::new(),
            generation: Generation::default(),
            cache: ResponseCache::new(config.cache_capacity, config.cache_ttl()),
            monitor: PerformanceMonitor::new(config.client_slice_timeout()),
        };
        Self {
            source,
            selector: StrategySelector::new(config.page_size),
            filter: FilterEngine::default(),
            auto_fetch: AutoFetchController::new(
                config.auto_fetch_max_rounds,
                config.server_fetch_timeout(),
            ),
            recovery: ErrorRecoveryManager::new(
                config.max_retries,
                config.retry_base_delay(),
                config.server_fetch_timeout(),
            ),
            config,
            session: Mutex::new(session),
        }
    }

    /// Replace the default search/filter predicate
    pub fn with_matcher(mut self, matcher: Arc<dyn PostMatcher>) -> Self {
        self.filter = FilterEngine::new(matcher);
        self
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reveal the next page.
    ///
    /// Fails with [`PaginationError::ConcurrentRequest`] while another call is
    /// in flight. Calling it in the `error` state retries.
    pub async fn load_more(&self) -> Result<LoadMoreOutcome, PaginationError> {
        match self.begin_load()? {
            Plan::Done(outcome) => Ok(outcome),
            Plan::Fetch {
                generation,
                request,
                cache_key,
            } => self.fetch_from_server(generation, request, cache_key).await,
            Plan::AutoFetch {
                generation,
                request,
                revealed,
            } => self.run_auto_fetch(generation, request, revealed).await,
        }
    }

    /// Synchronous part of `load_more()`: validation, strategy, slicing, cache
    fn begin_load(&self) -> Result<Plan, PaginationError> {
        let mut session = self.session();

        match session.machine.state() {
            state if state.is_busy() => {
                tracing::debug!(%state, "load-more ignored, request already in flight");
                session.monitor.record_rejected_request();
                return Err(PaginationError::ConcurrentRequest);
            }
            LoadMoreState::Complete => {
                session.machine.transition(LoadMoreState::Idle, "new user action")?;
            }
            LoadMoreState::Error => {
                session.machine.transition(LoadMoreState::Idle, "retry")?;
            }
            _ => {}
        }

        let working_set_len = self.filter.apply(&session.store, &session.criteria).len();
        if let Err(err) = self.recovery.validate_state_consistency(
            &session.store,
            &session.metadata,
            working_set_len,
        ) {
            tracing::warn!(%err, "forcing pagination reset");
            session.reset("inconsistent state");
            return Err(err);
        }

        let mode = session.criteria.mode();
        let strategy = self.selector.determine_strategy(mode, &session.metadata);
        let page_size = strategy.page_size();
        tracing::debug!(%mode, %strategy, metadata = ?session.metadata, "load-more");

        match strategy {
            Strategy::ServerFetch { .. } => {
                session
                    .machine
                    .transition(LoadMoreState::LoadingServer, "server fetch")?;

                // Enough is already loaded (e.g. after clearing filters), or nothing is left
                if session.metadata.unseen() >= page_size || session.metadata.server_exhausted() {
                    let revealed = session.metadata.advance_cursor(page_size);
                    return self
                        .finish(&mut session, strategy, revealed, false, false, 0)
                        .map(Plan::Done);
                }

                let request = PageRequest::new(
                    session.store.server_offset(),
                    page_size,
                    self.config.sort,
                );
                let cache_key = session.cache_key(request.page_index());
                let cached = session.cache.get(&cache_key).map(|entry| entry.to_response());
                session.monitor.record_cache_lookup(cached.is_some());
                if let Some(response) = cached {
                    tracing::debug!(?cache_key, "serving page from cache");
                    session.append_page(response, page_size, &self.filter);
                    let revealed = session.metadata.advance_cursor(page_size);
                    return self
                        .finish(&mut session, strategy, revealed, false, true, 0)
                        .map(Plan::Done);
                }

                Ok(Plan::Fetch {
                    generation: session.generation,
                    request,
                    cache_key,
                })
            }
            Strategy::ClientPaginate { .. } => {
                session
                    .machine
                    .transition(LoadMoreState::LoadingClient, "client slice")?;

                let started = Instant::now();
                let revealed = session.metadata.advance_cursor(page_size);
                session.monitor.record_slice(started.elapsed());

                let exhausted = session.metadata.server_exhausted();
                if !self.auto_fetch.should_auto_fetch(revealed, page_size, exhausted) {
                    return self
                        .finish(&mut session, strategy, revealed, false, false, 0)
                        .map(Plan::Done);
                }

                session
                    .machine
                    .transition(LoadMoreState::AutoFetching, "filtered page too thin")?;
                Ok(Plan::AutoFetch {
                    generation: session.generation,
                    request: AutoFetchRequest {
                        offset: session.store.server_offset(),
                        page_size,
                        sort: self.config.sort,
                        target_count: page_size - revealed,
                    },
                    revealed,
                })
            }
        }
    }

    async fn fetch_from_server(
        &self,
        generation: Generation,
        request: PageRequest,
        cache_key: CacheKey,
    ) -> Result<LoadMoreOutcome, PaginationError> {
        let started = Instant::now();
        let report = self
            .recovery
            .fetch_with_retry(|| self.source.fetch_page(request))
            .await;

        let mut session = self.session();
        if generation.is_stale(session.generation) {
            self.discard_stale(&mut session, generation);
            return Ok(LoadMoreOutcome::Superseded);
        }

        for _ in &report.delays {
            session.monitor.record_retry();
        }
        let failed_attempts = report.attempts - u32::from(report.result.is_ok());
        for _ in 0..failed_attempts {
            session.monitor.record_fetch_failure();
        }

        match report.result {
            Ok(response) => {
                session.monitor.record_fetch(started.elapsed());
                session.cache.insert(cache_key, &response);
                session.append_page(response, request.page_size, &self.filter);
                let revealed = session.metadata.advance_cursor(request.page_size);
                let strategy = Strategy::ServerFetch {
                    page_size: request.page_size,
                };
                self.finish(&mut session, strategy, revealed, false, false, 0)
            }
            Err(err) => {
                session
                    .machine
                    .transition(LoadMoreState::Error, "server fetch failed")?;
                Err(err)
            }
        }
    }

    async fn run_auto_fetch(
        &self,
        generation: Generation,
        request: AutoFetchRequest,
        revealed: usize,
    ) -> Result<LoadMoreOutcome, PaginationError> {
        let report = self
            .auto_fetch
            .fetch_additional_posts(&self.source, request, |response| {
                let mut session = self.session();
                if generation.is_stale(session.generation) {
                    return RoundVerdict::Superseded;
                }
                session.monitor.record_auto_fetch_round();
                let before = session.metadata.loaded_matching;
                session.append_page(response, request.page_size, &self.filter);
                RoundVerdict::Continue {
                    matched: session.metadata.loaded_matching.saturating_sub(before),
                    exhausted: session.metadata.server_exhausted(),
                }
            })
            .await;

        let mut session = self.session();
        if generation.is_stale(session.generation) || report.stop == AutoFetchStop::Superseded {
            self.discard_stale(&mut session, generation);
            return Ok(LoadMoreOutcome::Superseded);
        }

        let revealed = revealed + session.metadata.advance_cursor(request.target_count);
        if let AutoFetchStop::Failed(source) = &report.stop {
            if revealed == 0 {
                session
                    .machine
                    .transition(LoadMoreState::Error, "auto-fetch failed")?;
                return Err(PaginationError::Network {
                    attempts: report.rounds,
                    source: source.clone(),
                });
            }
        }

        tracing::debug!(?report, revealed, "auto-fetch finished");
        let strategy = Strategy::ClientPaginate {
            page_size: request.page_size,
        };
        self.finish(
            &mut session,
            strategy,
            revealed,
            report.incomplete(),
            false,
            report.rounds,
        )
    }

    fn discard_stale(&self, session: &mut Session, generation: Generation) {
        let err = PaginationError::StaleResponse {
            response: *generation,
            current: *session.generation,
        };
        tracing::debug!(%err, "discarding response");
        session.monitor.record_stale_discard();
    }

    /// `loading-* -> complete -> idle`, with opportunistic cleanup on the way to idle
    fn finish(
        &self,
        session: &mut Session,
        strategy: Strategy,
        revealed: usize,
        incomplete: bool,
        from_cache: bool,
        auto_fetch_rounds: u32,
    ) -> Result<LoadMoreOutcome, PaginationError> {
        session
            .machine
            .transition(LoadMoreState::Complete, "page ready")?;
        session.machine.transition(LoadMoreState::Idle, "settle")?;
        self.cleanup(session);

        Ok(LoadMoreOutcome::Loaded(PageUpdate {
            strategy,
            revealed,
            has_more: session.metadata.has_more(),
            incomplete,
            from_cache,
            auto_fetch_rounds,
        }))
    }

    /// Bound memory: expire cache entries and evict the oldest store batches
    fn cleanup(&self, session: &mut Session) {
        let expired = session.cache.sweep_expired();
        if expired > 0 {
            tracing::debug!(expired, "swept expired cache entries");
        }

        let evicted = session
            .store
            .evict_oldest_batches(self.config.store_capacity);
        if evicted.is_empty() {
            return;
        }
        // Evicted matches are a prefix of the working set
        let evicted_matches = self.filter.count_matches(evicted.iter(), &session.criteria);
        session.metadata.display_cursor = session
            .metadata
            .display_cursor
            .saturating_sub(evicted_matches);
        session.refresh_matching(&self.filter);
        session
            .monitor
            .record_store_len(session.store.len(), evicted.len());
    }

    /// Replace the criteria. Returns `false` if they are unchanged.
    ///
    /// A change restarts pagination from the first page without fetching;
    /// any in-flight response becomes stale.
    pub fn apply_filters(&self, criteria: FilterCriteria) -> bool {
        let mut session = self.session();
        if session.criteria == criteria {
            tracing::debug!("criteria unchanged, keeping pagination");
            return false;
        }

        session.generation = session.generation.next();
        session.criteria = criteria;
        session.machine.reset("criteria changed");
        session.metadata.reset_for_criteria();
        session.refresh_matching(&self.filter);
        tracing::debug!(
            mode = %session.criteria.mode(),
            generation = *session.generation,
            matching = session.metadata.loaded_matching,
            "criteria changed"
        );
        true
    }

    /// Back to a brand new session (navigation away, "clear filters")
    pub fn reset(&self) {
        self.session().reset("session reset");
    }

    /// Update like/save counters of a loaded item
    ///
    /// A counter change can move items in or out of a `min_likes` working set.
    /// The visible window keeps ending at the same store position, so nothing
    /// unseen is revealed and nothing seen is hidden by the recount.
    pub fn record_interaction(&self, id: &PostId, interaction: Interaction) -> bool {
        let mut session = self.session();
        let last_visible = session.metadata.display_cursor.checked_sub(1).and_then(|last| {
            let visible = self.filter.apply(&session.store, &session.criteria);
            let post = visible.get(last)?;
            session.store.iter().position(|p| p.id == post.id)
        });

        let updated = session.store.record_interaction(id, interaction);
        if updated {
            let cursor = last_visible.map_or(0, |position| {
                self.filter
                    .count_matches(session.store.iter().take(position + 1), &session.criteria)
            });
            session.metadata.display_cursor = cursor;
            session.refresh_matching(&self.filter);
        }
        updated
    }

    /// The items currently visible, in display order
    pub fn visible_page(&self) -> Vec<Post> {
        let session = self.session();
        self.filter
            .apply(&session.store, &session.criteria)
            .into_iter()
            .take(session.metadata.display_cursor)
            .cloned()
            .collect()
    }

    pub fn load_more_state(&self) -> LoadMoreState {
        self.session().machine.state()
    }

    pub fn metadata(&self) -> PaginationMetadata {
        self.session().metadata.clone()
    }

    pub fn has_more(&self) -> bool {
        self.session().metadata.has_more()
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.session().criteria.clone()
    }

    pub fn mode(&self) -> PaginationMode {
        self.session().criteria.mode()
    }

    pub fn generation(&self) -> Generation {
        self.session().generation
    }

    /// Items currently held in memory
    pub fn loaded_items(&self) -> usize {
        self.session().store.len()
    }

    pub fn cached_pages(&self) -> usize {
        self.session().cache.len()
    }

    pub fn transition_history(&self) -> Vec<TransitionRecord> {
        self.session().machine.history().cloned().collect()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.session().monitor.snapshot()
    }
}
