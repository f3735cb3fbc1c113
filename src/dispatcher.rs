//! Concurrent batch dispatch
//!
//! Every batch is queued up front. A semaphore caps the number of requests in
//! flight; each worker calls the service and reconciles the reply into
//! per-file records. Completed batches are drained from one `JoinSet`, which
//! is the only place the shared [`SearchResult`] is written.

use crate::aggregator::SearchResult;
use crate::batcher::Batch;
use crate::client::MatchingService;
use crate::error::{Result, VibegrepError};
use crate::reconciler::{reconcile, BatchMatches};
use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// A batch whose request failed permanently
#[derive(Debug)]
pub struct BatchFailure {
    /// Labels of the chunks the batch carried
    pub labels: Vec<String>,
    /// Why the request failed
    pub error: VibegrepError,
}

impl std::fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error searching {}: {}", self.labels.join(", "), self.error)
    }
}

/// Everything a dispatch run produced
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Merged matches from all successful batches
    pub result: SearchResult,
    /// Batches that failed, in completion order
    pub failures: Vec<BatchFailure>,
    /// Number of batches that got an answer
    pub completed: usize,
}

/// Runs batches against a matching service with bounded concurrency
pub struct Dispatcher<S: MatchingService + 'static> {
    service: Arc<S>,
    workers: usize,
    progress: ProgressBar,
}

impl<S: MatchingService + 'static> Dispatcher<S> {
    /// Create a dispatcher allowing `workers` requests in flight
    pub fn new(service: Arc<S>, workers: usize) -> Self {
        Self {
            service,
            workers: workers.max(1),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report each finished batch on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Send every batch and merge the reconciled replies
    ///
    /// A failing batch is recorded in the report and never stops the others.
    pub async fn dispatch(&self, query: &str, batches: Vec<Batch>) -> DispatchReport {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let query: Arc<str> = Arc::from(query);
        let mut tasks = JoinSet::new();

        self.progress.set_length(batches.len() as u64);

        for (index, batch) in batches.into_iter().enumerate() {
            let service = Arc::clone(&self.service);
            let semaphore = Arc::clone(&semaphore);
            let query = Arc::clone(&query);

            tasks.spawn(async move {
                let labels = batch.labels();
                // A panicking worker surfaces as a JoinError here, so the labels survive
                let worker = tokio::spawn(async move {
                    run_batch(service.as_ref(), &semaphore, &query, &batch).await
                });
                let outcome = match worker.await {
                    Ok(outcome) => outcome,
                    Err(join_err) => Err(VibegrepError::Task(join_err.to_string())),
                };
                (index, labels, outcome)
            });
        }

        let mut report = DispatchReport::default();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(matches))) => {
                    debug!("Batch {} returned matches in {} files", index, matches.len());
                    report.result.merge(matches);
                    report.completed += 1;
                }
                Ok((index, labels, Err(error))) => {
                    warn!("Batch {} failed: {}", index, error);
                    report.failures.push(BatchFailure { labels, error });
                }
                Err(join_err) => {
                    warn!("Dispatch worker failed: {}", join_err);
                    report.failures.push(BatchFailure {
                        labels: Vec::new(),
                        error: VibegrepError::Task(join_err.to_string()),
                    });
                }
            }
            self.progress.inc(1);
        }

        self.progress.finish_and_clear();
        report
    }
}

async fn run_batch<S: MatchingService + ?Sized>(
    service: &S,
    semaphore: &Semaphore,
    query: &str,
    batch: &Batch,
) -> Result<BatchMatches> {
    let _permit = semaphore
        .acquire()
        .await
        .map_err(|e| VibegrepError::Task(e.to_string()))?;

    let output = service.find_matches(query, batch).await?;
    Ok(reconcile(&output, batch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::SourceChunk;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers from a fixed table keyed by the first chunk's label
    struct FakeService {
        replies: HashMap<String, std::result::Result<String, u16>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeService {
        fn new(replies: &[(&str, std::result::Result<&str, u16>)]) -> Self {
            Self {
                replies: replies
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
                    .collect(),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MatchingService for FakeService {
        async fn find_matches(&self, _query: &str, batch: &Batch) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.replies.get(&batch.chunks[0].label) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(status)) => Err(VibegrepError::RetriesExhausted {
                    attempts: 3,
                    status: *status,
                }),
                None => Ok(String::new()),
            }
        }
    }

    fn batch(label: &str, text: &str) -> Batch {
        Batch {
            chunks: vec![SourceChunk {
                label: label.to_string(),
                path: label.to_string(),
                text: text.to_string(),
                line_offset: 0,
            }],
        }
    }

    #[tokio::test]
    async fn test_failure_isolated() {
        let service = Arc::new(FakeService::new(&[
            ("a.rs", Err(503)),
            ("b.rs", Ok("let token = 1;")),
        ]));
        let dispatcher = Dispatcher::new(service, 4);
        let report = dispatcher
            .dispatch(
                "tokens",
                vec![
                    batch("a.rs", "let token = 0;\n"),
                    batch("b.rs", "fn b() {}\nlet token = 1;\n"),
                ],
            )
            .await;

        assert_eq!(report.completed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].labels, vec!["a.rs"]);
        assert!(report.failures[0].to_string().starts_with("Error searching a.rs:"));
        assert_eq!(report.result.matches_for("b.rs").unwrap()[0].line_number, 2);
        assert!(report.result.matches_for("a.rs").is_none());
    }

    #[tokio::test]
    async fn test_only_batch_fails() {
        let service = Arc::new(FakeService::new(&[("a.rs", Err(429))]));
        let report = Dispatcher::new(service, 2)
            .dispatch("q", vec![batch("a.rs", "x\n")])
            .await;

        assert!(report.result.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.completed, 0);
    }

    #[tokio::test]
    async fn test_empty_reply_contributes_nothing() {
        let service = Arc::new(FakeService::new(&[]));
        let report = Dispatcher::new(service, 2)
            .dispatch("q", vec![batch("a.rs", "x\n"), batch("b.rs", "y\n")])
            .await;

        assert!(report.result.is_empty());
        assert!(report.failures.is_empty());
        assert_eq!(report.completed, 2);
    }

    #[tokio::test]
    async fn test_concurrency_bounded() {
        let labels: Vec<String> = (0..12).map(|i| format!("f{i}.txt")).collect();
        let replies: Vec<(&str, std::result::Result<&str, u16>)> =
            labels.iter().map(|l| (l.as_str(), Ok("hit"))).collect();
        let service = Arc::new(FakeService::new(&replies));
        let batches = labels.iter().map(|l| batch(l, "miss\nhit\n")).collect();

        let report = Dispatcher::new(Arc::clone(&service), 3)
            .dispatch("q", batches)
            .await;

        assert!(service.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(report.completed, 12);
        assert_eq!(report.result.file_count(), 12);
        assert_eq!(report.result.match_count(), 12);
    }

    struct PanicsOn(&'static str);

    #[async_trait]
    impl MatchingService for PanicsOn {
        async fn find_matches(&self, _query: &str, batch: &Batch) -> Result<String> {
            if batch.chunks[0].label == self.0 {
                panic!("worker blew up");
            }
            Ok(batch.chunks[0].text.clone())
        }
    }

    #[tokio::test]
    async fn test_panicking_worker_keeps_labels() {
        let service = Arc::new(PanicsOn("bad.rs"));
        let report = Dispatcher::new(service, 2)
            .dispatch("q", vec![batch("bad.rs", "x\n"), batch("good.rs", "y\n")])
            .await;

        assert_eq!(report.completed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].labels, vec!["bad.rs"]);
        assert!(matches!(report.failures[0].error, VibegrepError::Task(_)));
        assert!(report.failures[0].to_string().starts_with("Error searching bad.rs:"));
        assert_eq!(report.result.matches_for("good.rs").unwrap()[0].text, "y");
    }
}
