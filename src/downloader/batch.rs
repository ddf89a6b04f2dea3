// SPDX-License-Identifier: GPL-3.0-only
//! Concurrent fan-out of single-resource fetches.
//!
//! Every identifier gets its own task and its own result slot. Slots are only
//! read after all tasks have joined, so the outcome never depends on which
//! response arrived first.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{self, Category};
use crate::downloader::traits::Fetcher;
use crate::error::{BatchError, ErrorKind, ResourceError};

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Knobs for a [`BatchFetcher`]
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Upper bound on fetches in flight at once
    pub max_concurrency: usize,
    /// Cancel outstanding siblings as soon as one fetch fails
    pub fail_fast: bool,
    /// Abort whatever is still running after this long
    pub deadline: Option<Duration>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            fail_fast: false,
            deadline: None,
        }
    }
}

pub struct BatchFetcher {
    fetcher: Arc<dyn Fetcher>,
    options: BatchOptions,
}

impl BatchFetcher {
    pub fn new(fetcher: Arc<dyn Fetcher>, options: BatchOptions) -> Self {
        Self { fetcher, options }
    }

    /// Fetch every identifier concurrently
    ///
    /// On success `result[i]` holds the bytes of `ids[i]`. On failure the
    /// returned error names the first failing identifier in input order and no
    /// bytes from the batch are handed back.
    pub async fn fetch_all<S>(
        &self,
        ids: &[S],
        category: Category,
    ) -> Result<Vec<Vec<u8>>, BatchError>
    where
        S: AsRef<str>,
    {
        self.fetch_all_with_cancel(ids, category, CancellationToken::new())
            .await
    }

    /// Same as [`fetch_all`](Self::fetch_all), aborting early once `cancel` fires
    pub async fn fetch_all_with_cancel<S>(
        &self,
        ids: &[S],
        category: Category,
        cancel: CancellationToken,
    ) -> Result<Vec<Vec<u8>>, BatchError>
    where
        S: AsRef<str>,
    {
        let ids: Vec<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let unknown: Vec<ResourceError> = ids
            .iter()
            .filter(|id| !catalog::is_valid(id, category))
            .map(|id| ResourceError::Validation {
                id: id.clone(),
                category,
            })
            .collect();
        if !unknown.is_empty() {
            warn!(%category, count = unknown.len(), "Rejecting batch with unknown identifiers");
            return Err(BatchError::new(category, unknown));
        }

        info!(%category, count = ids.len(), "Starting batch fetch");

        let permits = self.options.max_concurrency.clamp(1, Semaphore::MAX_PERMITS);
        let semaphore = Arc::new(Semaphore::new(permits));
        let token = cancel.child_token();

        let handles: Vec<_> = ids
            .iter()
            .map(|id| {
                let fetcher = Arc::clone(&self.fetcher);
                let semaphore = Arc::clone(&semaphore);
                let token = token.clone();
                let fail_fast = self.options.fail_fast;
                let id = id.clone();

                tokio::spawn(async move {
                    let work = async {
                        let _permit = semaphore.acquire().await.map_err(|e| {
                            ResourceError::TaskFailed {
                                id: id.clone(),
                                message: e.to_string(),
                            }
                        })?;
                        fetcher.fetch(&id, category).await
                    };

                    let outcome = tokio::select! {
                        biased;
                        _ = token.cancelled() => Err(ResourceError::Cancelled { id: id.clone() }),
                        outcome = work => outcome,
                    };

                    if let Err(e) = &outcome {
                        if fail_fast && e.kind() != ErrorKind::Cancelled {
                            debug!(id = %id, "Cancelling sibling fetches");
                            token.cancel();
                        }
                    }
                    outcome
                })
            })
            .collect();

        let joined = join_all(handles);
        tokio::pin!(joined);

        let mut timed_out = None;
        let results = match self.options.deadline {
            Some(deadline) => match tokio::time::timeout(deadline, &mut joined).await {
                Ok(results) => results,
                Err(_) => {
                    warn!(
                        %category,
                        ?deadline,
                        "Batch deadline elapsed, cancelling outstanding fetches"
                    );
                    timed_out = Some(deadline);
                    token.cancel();
                    joined.await
                }
            },
            None => joined.await,
        };

        let outcomes: Vec<Result<Vec<u8>, ResourceError>> = results
            .into_iter()
            .zip(&ids)
            .map(|(joined, id)| {
                let outcome = joined.unwrap_or_else(|e| {
                    Err(ResourceError::TaskFailed {
                        id: id.clone(),
                        message: e.to_string(),
                    })
                });
                match (outcome, timed_out) {
                    (Err(ResourceError::Cancelled { id }), Some(after)) => {
                        Err(ResourceError::DeadlineElapsed { id, after })
                    }
                    (outcome, _) => outcome,
                }
            })
            .collect();

        let payloads = reduce(outcomes).map_err(|failure| {
            warn!(%category, error = %failure, "Batch fetch failed");
            BatchError::single(category, failure)
        })?;

        info!(%category, count = payloads.len(), "Batch fetch completed");
        Ok(payloads)
    }
}

/// Collapse per-slot outcomes into the ordered payloads or the first failure
///
/// A sibling's cancellation is only reported when no slot holds a real failure.
fn reduce(outcomes: Vec<Result<Vec<u8>, ResourceError>>) -> Result<Vec<Vec<u8>>, ResourceError> {
    let mut payloads = Vec::with_capacity(outcomes.len());
    let mut cancelled = None;

    for outcome in outcomes {
        match outcome {
            Ok(bytes) => payloads.push(bytes),
            Err(e) if e.kind() == ErrorKind::Cancelled => {
                cancelled.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }
    }

    match cancelled {
        Some(e) => Err(e),
        None => Ok(payloads),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::StubFetcher;
    use std::sync::atomic::Ordering;

    fn langs() -> Vec<&'static str> {
        vec!["en", "de", "fr", "jp", "kr"]
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        // Earlier identifiers take longer, so completion order is reversed
        let stub = StubFetcher::new()
            .with_body("en", r#"{"lang":"en"}"#, Duration::from_millis(80))
            .with_body("de", r#"{"lang":"de"}"#, Duration::from_millis(60))
            .with_body("fr", r#"{"lang":"fr"}"#, Duration::from_millis(40))
            .with_body("jp", r#"{"lang":"jp"}"#, Duration::from_millis(20))
            .with_body("kr", r#"{"lang":"kr"}"#, Duration::ZERO);
        let batch = BatchFetcher::new(Arc::new(stub), BatchOptions::default());

        let results = batch.fetch_all(&langs(), Category::LanguageFile).await.unwrap();

        assert_eq!(results.len(), 5);
        for (id, bytes) in langs().iter().zip(&results) {
            assert_eq!(bytes, format!(r#"{{"lang":"{}"}}"#, id).as_bytes());
        }
    }

    #[tokio::test]
    async fn test_unknown_identifier_rejected_before_fetching() {
        let stub = Arc::new(StubFetcher::new().with_body("en", "{}", Duration::ZERO));
        let batch = BatchFetcher::new(stub.clone(), BatchOptions::default());

        let err = batch
            .fetch_all(&["en", "xx", "yy"], Category::LanguageFile)
            .await
            .unwrap_err();

        assert_eq!(err.identifiers(), vec!["xx", "yy"]);
        assert!(err.failures.iter().all(|e| e.kind() == ErrorKind::Validation));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_transport_failure_fails_batch() {
        let stub = StubFetcher::new()
            .with_body("en", "{}", Duration::ZERO)
            .with_body("de", "{}", Duration::from_millis(10))
            .with_status("fr", reqwest::StatusCode::INTERNAL_SERVER_ERROR)
            .with_body("jp", "{}", Duration::from_millis(10))
            .with_body("kr", "{}", Duration::ZERO);
        let stub = Arc::new(stub);
        let batch = BatchFetcher::new(stub.clone(), BatchOptions::default());

        let err = batch.fetch_all(&langs(), Category::LanguageFile).await.unwrap_err();

        assert_eq!(err.identifiers(), vec!["fr"]);
        assert_eq!(err.primary().unwrap().kind(), ErrorKind::Transport);
        // Without fail-fast every sibling still runs to completion
        assert_eq!(stub.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_first_failure_in_input_order_wins() {
        let stub = StubFetcher::new()
            .with_body("en", "{}", Duration::ZERO)
            .with_delayed_status("de", reqwest::StatusCode::NOT_FOUND, Duration::from_millis(50))
            .with_status("fr", reqwest::StatusCode::BAD_GATEWAY);
        let batch = BatchFetcher::new(Arc::new(stub), BatchOptions::default());

        let err = batch
            .fetch_all(&["en", "de", "fr"], Category::LanguageFile)
            .await
            .unwrap_err();

        assert_eq!(err.identifiers(), vec!["de"]);
    }

    #[tokio::test]
    async fn test_fail_fast_cancels_siblings() {
        let stub = StubFetcher::new()
            .with_body("en", "{}", Duration::from_secs(5))
            .with_body("de", "{}", Duration::from_secs(5))
            .with_status("fr", reqwest::StatusCode::NOT_FOUND);
        let options = BatchOptions {
            fail_fast: true,
            ..BatchOptions::default()
        };
        let batch = BatchFetcher::new(Arc::new(stub), options);

        let started = std::time::Instant::now();
        let err = batch
            .fetch_all(&["en", "de", "fr"], Category::LanguageFile)
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(err.identifiers(), vec!["fr"]);
        assert_eq!(err.primary().unwrap().kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_deadline_aborts_slow_fetches() {
        let stub = StubFetcher::new()
            .with_body("en", "{}", Duration::ZERO)
            .with_body("de", "{}", Duration::from_secs(5));
        let options = BatchOptions {
            deadline: Some(Duration::from_millis(100)),
            ..BatchOptions::default()
        };
        let batch = BatchFetcher::new(Arc::new(stub), options);

        let err = batch
            .fetch_all(&["en", "de"], Category::LanguageFile)
            .await
            .unwrap_err();

        assert_eq!(err.identifiers(), vec!["de"]);
        assert!(matches!(err.primary().unwrap(), ResourceError::DeadlineElapsed { .. }));
    }

    #[tokio::test]
    async fn test_external_cancellation() {
        let stub = StubFetcher::new().with_body("en", "{}", Duration::from_secs(5));
        let batch = BatchFetcher::new(Arc::new(stub), BatchOptions::default());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = batch
            .fetch_all_with_cancel(&["en"], Category::LanguageFile, cancel)
            .await
            .unwrap_err();

        assert_eq!(err.primary().unwrap().kind(), ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let ids = catalog::all_identifiers(Category::LanguageFile);
        let mut stub = StubFetcher::new();
        for id in &ids {
            stub = stub.with_body(id, "{}", Duration::from_millis(20));
        }
        let stub = Arc::new(stub);
        let options = BatchOptions {
            max_concurrency: 3,
            ..BatchOptions::default()
        };
        let batch = BatchFetcher::new(stub.clone(), options);

        let results = batch.fetch_all(&ids, Category::LanguageFile).await.unwrap();

        assert_eq!(results.len(), ids.len());
        assert!(stub.peak_in_flight.load(Ordering::SeqCst) <= 3);
        assert_eq!(stub.calls.load(Ordering::SeqCst), ids.len());
    }

    #[tokio::test]
    async fn test_oversized_concurrency_limit_is_clamped() {
        let stub = StubFetcher::new()
            .with_body("en", "{}", Duration::ZERO)
            .with_body("de", "{}", Duration::ZERO);
        let options = BatchOptions {
            max_concurrency: usize::MAX,
            ..BatchOptions::default()
        };
        let batch = BatchFetcher::new(Arc::new(stub), options);

        let results = batch.fetch_all(&["en", "de"], Category::LanguageFile).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let batch = BatchFetcher::new(Arc::new(StubFetcher::new()), BatchOptions::default());
        let ids: [&str; 0] = [];
        let results = batch.fetch_all(&ids, Category::DataFile).await.unwrap();
        assert!(results.is_empty());
    }
}
