//! Supplemental fetching when filtering leaves too few visible items

use std::time::Duration;

use super::error::SourceError;
use crate::infrastructure::source::{PageRequest, PageResponse, PostSource, SortOrder};

/// Where the supplemental rounds start and how many new matches they need
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoFetchRequest {
    pub offset: usize,
    pub page_size: usize,
    pub sort: SortOrder,
    pub target_count: usize,
}

/// What the coordinator made of one supplemental page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundVerdict {
    Continue { matched: usize, exhausted: bool },
    /// The session moved on while the round was in flight
    Superseded,
}

/// Why auto-fetch stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoFetchStop {
    TargetReached,
    Exhausted,
    BudgetSpent,
    TimedOut,
    Failed(SourceError),
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoFetchReport {
    pub rounds: u32,
    /// New matching items produced by the rounds
    pub matched: usize,
    /// Items appended to the store by the rounds
    pub appended: usize,
    pub stop: AutoFetchStop,
}

impl AutoFetchReport {
    /// The page is short and more might have been available
    pub fn incomplete(&self) -> bool {
        matches!(
            self.stop,
            AutoFetchStop::BudgetSpent | AutoFetchStop::TimedOut | AutoFetchStop::Failed(_)
        )
    }
}

/// Decides whether to auto-fetch and runs the bounded rounds
#[derive(Debug, Clone)]
pub struct AutoFetchController {
    max_rounds: u32,
    round_timeout: Duration,
}

impl AutoFetchController {
    pub fn new(max_rounds: u32, round_timeout: Duration) -> Self {
        Self {
            max_rounds,
            round_timeout,
        }
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn should_auto_fetch(
        &self,
        filtered_count: usize,
        target_page_size: usize,
        server_exhausted: bool,
    ) -> bool {
        self.max_rounds > 0 && filtered_count < target_page_size && !server_exhausted
    }

    /// Fetch up to `max_rounds` further pages, handing each to `on_page`.
    ///
    /// Running out of rounds, a round timeout or a failed round end the
    /// rounds with a partial (incomplete) report rather than an error.
    pub async fn fetch_additional_posts<S, F>(
        &self,
        source: &S,
        request: AutoFetchRequest,
        mut on_page: F,
    ) -> AutoFetchReport
    where
        S: PostSource + ?Sized,
        F: FnMut(PageResponse) -> RoundVerdict,
    {
        let mut report = AutoFetchReport {
            rounds: 0,
            matched: 0,
            appended: 0,
            stop: AutoFetchStop::BudgetSpent,
        };

        while report.matched < request.target_count {
            if report.rounds >= self.max_rounds {
                report.stop = AutoFetchStop::BudgetSpent;
                break;
            }
            report.rounds += 1;

            let page = PageRequest::new(
                request.offset + report.appended,
                request.page_size,
                request.sort,
            );
            let response = match tokio::time::timeout(self.round_timeout, source.fetch_page(page)).await {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => {
                    tracing::warn!(round = report.rounds, %err, "auto-fetch round failed");
                    report.stop = AutoFetchStop::Failed(err);
                    break;
                }
                Err(_) => {
                    tracing::warn!(round = report.rounds, timeout = ?self.round_timeout, "auto-fetch round timed out");
                    report.stop = AutoFetchStop::TimedOut;
                    break;
                }
            };

            let received = response.items.len();
            match on_page(response) {
                RoundVerdict::Superseded => {
                    report.stop = AutoFetchStop::Superseded;
                    break;
                }
                RoundVerdict::Continue { matched, exhausted } => {
                    report.appended += received;
                    report.matched += matched;
                    tracing::debug!(
                        round = report.rounds,
                        received,
                        matched,
                        total_matched = report.matched,
                        "auto-fetch round"
                    );
                    if exhausted {
                        report.stop = AutoFetchStop::Exhausted;
                        return report;
                    }
                }
            }
        }

        if report.matched >= request.target_count && report.stop == AutoFetchStop::BudgetSpent {
            report.stop = AutoFetchStop::TargetReached;
        }
        report
    }
}
