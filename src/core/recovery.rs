//! Retry/backoff for server fetches and state-consistency validation

use std::future::Future;
use std::time::Duration;

use super::error::{PaginationError, SourceError};
use super::metadata::PaginationMetadata;
use super::store::PostBatchStore;

/// Outcome of [`ErrorRecoveryManager::fetch_with_retry`]
#[derive(Debug)]
pub struct RetryReport<T> {
    pub result: Result<T, PaginationError>,
    pub attempts: u32,
    /// Backoff delays actually waited, in order
    pub delays: Vec<Duration>,
}

/// Wraps network and consistency failures.
#[derive(Debug, Clone)]
pub struct ErrorRecoveryManager {
    max_retries: u32,
    base_delay: Duration,
    attempt_timeout: Duration,
}

impl ErrorRecoveryManager {
    pub fn new(max_retries: u32, base_delay: Duration, attempt_timeout: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            attempt_timeout,
        }
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Delay before retry number `retry` (0-based): base, 2*base, 4*base...
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry))
    }

    /// Run `op` with a per-attempt timeout, retrying failures with exponential backoff.
    pub async fn fetch_with_retry<T, F, Fut>(&self, mut op: F) -> RetryReport<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut delays = Vec::new();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let error = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(Ok(value)) => {
                    return RetryReport {
                        result: Ok(value),
                        attempts,
                        delays,
                    }
                }
                Ok(Err(err)) => err,
                Err(_) => SourceError::Timeout(self.attempt_timeout),
            };

            let retry = attempts - 1;
            if retry >= self.max_retries {
                tracing::warn!(attempts, %error, "giving up on server fetch");
                return RetryReport {
                    result: Err(PaginationError::Network {
                        attempts,
                        source: error,
                    }),
                    attempts,
                    delays,
                };
            }

            let delay = self.backoff_delay(retry);
            tracing::warn!(attempt = attempts, ?delay, %error, "server fetch failed, retrying");
            tokio::time::sleep(delay).await;
            delays.push(delay);
        }
    }

    /// Check pagination bookkeeping against the loaded data.
    ///
    /// Runs before every transition into a loading state.
    pub fn validate_state_consistency(
        &self,
        store: &PostBatchStore,
        metadata: &PaginationMetadata,
        working_set_len: usize,
    ) -> Result<(), PaginationError> {
        let inconsistent = |reason: String| Err(PaginationError::InconsistentState(reason));

        if metadata.total_loaded != store.server_offset() {
            return inconsistent(format!(
                "metadata counts {} loaded items but the store holds {}",
                metadata.total_loaded,
                store.server_offset()
            ));
        }
        if metadata.loaded_matching != working_set_len {
            return inconsistent(format!(
                "metadata counts {} matches but the working set has {working_set_len}",
                metadata.loaded_matching
            ));
        }
        if metadata.display_cursor > working_set_len {
            return inconsistent(format!(
                "display cursor {} is past the working set ({working_set_len})",
                metadata.display_cursor
            ));
        }
        if metadata.batches_fetched < store.batch_count() {
            return inconsistent(format!(
                "store has {} batches but only {} fetches were recorded",
                store.batch_count(),
                metadata.batches_fetched
            ));
        }
        if !store.is_well_ordered() {
            return inconsistent(String::from("store batches are out of order"));
        }
        Ok(())
    }
}
