//! Parallel batch orchestration.
//!
//! Each query owns one pre-sized result slot, so results come back in input
//! order however the workers interleave. Queries never share mutable state;
//! the only cross-thread traffic is the progress counter and the
//! cancellation flag.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};

use lei_match::Resolver;
use lei_model::{Classification, MatchConfig, MatchResult, Query};

use crate::error::Result;

/// Shared flag for stopping a running batch.
///
/// Cancelling stops new queries from starting; queries already running
/// finish normally.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Receives progress while a batch runs.
///
/// Called from worker threads, possibly concurrently.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, processed: usize, total: usize);
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn on_progress(&self, processed: usize, total: usize) {
        self(processed, total);
    }
}

/// Run-time controls of one batch.
#[derive(Clone, Copy, Default)]
pub struct BatchControl<'a> {
    pub cancellation: Option<&'a CancellationToken>,
    pub observer: Option<&'a dyn ProgressObserver>,
    /// Worker threads; `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

impl<'a> BatchControl<'a> {
    #[must_use]
    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.is_some_and(CancellationToken::is_cancelled)
    }
}

impl std::fmt::Debug for BatchControl<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchControl")
            .field("cancellation", &self.cancellation)
            .field("observer", &self.observer.is_some())
            .field("threads", &self.threads)
            .finish()
    }
}

/// Results of one batch, in input order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub results: Vec<MatchResult>,
    /// True if at least one query was not started because of cancellation.
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn count(&self, classification: Classification) -> usize {
        self.results
            .iter()
            .filter(|result| result.classification == classification)
            .count()
    }
}

/// Returns a diagnostic when `text` cannot be a usable entity name.
pub fn malformed_reason(text: &str) -> Option<String> {
    if text.contains('\u{fffd}') {
        return Some("query contains invalid UTF-8".to_string());
    }
    text.chars()
        .find(|ch| ch.is_control() && !ch.is_whitespace())
        .map(|ch| format!("query contains control character U+{:04X}", u32::from(ch)))
}

/// Resolves one query, turning malformed input and panics into `Error` rows.
pub fn resolve_isolated(resolver: &Resolver<'_>, query: &Query, config: &MatchConfig) -> MatchResult {
    if let Some(reason) = malformed_reason(&query.name) {
        debug!(reason = %reason, "rejecting malformed query");
        return MatchResult::error(&query.name, reason).with_query(query);
    }
    isolate(&query.name, || resolver.resolve(query, config)).with_query(query)
}

/// Runs `resolve`, converting a panic into an `Error` result for `input`.
pub fn isolate<F>(input: &str, resolve: F) -> MatchResult
where
    F: FnOnce() -> MatchResult,
{
    match catch_unwind(AssertUnwindSafe(resolve)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(error = %message, "query resolution panicked");
            MatchResult::error(input, format!("internal error while resolving: {message}"))
        }
    }
}

pub(crate) fn run_batch(
    resolver: &Resolver<'_>,
    queries: &[Query],
    config: &MatchConfig,
    control: &BatchControl<'_>,
) -> Result<BatchReport> {
    let span = info_span!("batch", queries = queries.len());
    let _guard = span.enter();
    let start = Instant::now();
    let total = queries.len();
    let processed = AtomicUsize::new(0);
    let mut slots: Vec<Option<MatchResult>> = vec![None; total];

    let work = |slots: &mut [Option<MatchResult>]| {
        slots
            .par_iter_mut()
            .zip(queries.par_iter())
            .for_each(|(slot, query)| {
                if control.is_cancelled() {
                    return;
                }
                *slot = Some(resolve_isolated(resolver, query, config));
                let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(observer) = control.observer {
                    observer.on_progress(done, total);
                }
            });
    };

    match control.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()?;
            pool.install(|| work(&mut slots));
        }
        None => work(&mut slots),
    }

    let mut cancelled = false;
    let results: Vec<MatchResult> = slots
        .into_iter()
        .zip(queries)
        .map(|(slot, query)| {
            slot.unwrap_or_else(|| {
                cancelled = true;
                MatchResult::cancelled(&query.name).with_query(query)
            })
        })
        .collect();

    let report = BatchReport {
        results,
        cancelled,
        elapsed: start.elapsed(),
    };
    info!(
        auto = report.count(Classification::AutoMatched),
        review = report.count(Classification::NeedsReview),
        none = report.count(Classification::NoMatch),
        errors = report.count(Classification::Error),
        cancelled = report.count(Classification::Cancelled),
        duration_ms = report.elapsed.as_millis(),
        "batch complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_reason() {
        assert!(malformed_reason("Acme Corp").is_none());
        assert!(malformed_reason("Acme\tCorp").is_none());
        assert!(malformed_reason("Ac\u{fffd}me").is_some());
        assert_eq!(
            malformed_reason("Acme\u{0}").as_deref(),
            Some("query contains control character U+0000")
        );
    }

    #[test]
    fn test_isolate_converts_panics() {
        let result = isolate("Acme", || panic!("boom"));
        assert_eq!(result.classification, Classification::Error);
        assert_eq!(result.input, "Acme");
        assert!(result.diagnostic.unwrap().contains("boom"));
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
