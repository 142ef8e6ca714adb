//! Fork-join parallel scan (feature-gated).
//!
//! `solve` splits a range at its midpoint and runs both halves through
//! `rayon::join` until a range is shorter than the leaf length; each leaf is a
//! [`SequentialScanner`] with its own scan state. Leaves share the evaluator
//! and the listener, so listener callbacks arrive from several worker threads
//! and are only ordered within a leaf.
//!
//! A listener error aborts the leaf that raised it. Siblings that are already
//! running finish their own ranges, then the first error in range order is
//! returned from [`ParallelScanner::compute`].

use crate::image::{ImageView, Rgb};
use crate::search::cancel::CancelToken;
use crate::search::evaluator::{MatchEvaluator, PositionEvaluator};
use crate::search::listener::SearchListener;
use crate::search::position::SearchRange;
use crate::search::sequential::SequentialScanner;
use crate::search::{cancel_via, ScanSummary, SearchConfig, SearchOutcome, Searcher};
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::PixelSeekResult;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Recursive divide-and-conquer scanner.
#[derive(Debug)]
pub struct ParallelScanner<E> {
    evaluator: E,
    range: SearchRange,
    update_interval: usize,
    leaf_len: usize,
    cancel: Option<CancelToken>,
    attempted: AtomicUsize,
}

impl<'a> ParallelScanner<MatchEvaluator<'a>> {
    /// Parallel scanner over `range` of `target`, looking for `reference`.
    pub fn new(
        target: ImageView<'a, Rgb>,
        reference: ImageView<'a, Rgb>,
        range: SearchRange,
        config: &SearchConfig,
    ) -> PixelSeekResult<Self> {
        let evaluator = MatchEvaluator::new(target, reference, config.threshold)?;
        Self::with_evaluator(evaluator, range, config)
    }

    /// Parallel scanner over every position of `target`.
    pub fn full(
        target: ImageView<'a, Rgb>,
        reference: ImageView<'a, Rgb>,
        config: &SearchConfig,
    ) -> PixelSeekResult<Self> {
        let evaluator = MatchEvaluator::new(target, reference, config.threshold)?;
        let range = evaluator.space().full_range();
        Self::with_evaluator(evaluator, range, config)
    }
}

impl<E: PositionEvaluator + Sync> ParallelScanner<E> {
    /// Parallel scanner driven by a custom evaluator.
    pub fn with_evaluator(
        evaluator: E,
        range: SearchRange,
        config: &SearchConfig,
    ) -> PixelSeekResult<Self> {
        config.validate()?;
        let space = evaluator.space();
        let range = range.check_within(&space)?;
        Ok(Self {
            leaf_len: config.resolved_leaf_len(space.len()),
            evaluator,
            range,
            update_interval: config.update_interval,
            cancel: None,
            attempted: AtomicUsize::new(0),
        })
    }

    /// Attaches a cancel token checked at every fork and inside every leaf.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Range this scanner covers.
    pub fn range(&self) -> SearchRange {
        self.range
    }

    /// Ranges shorter than this are scanned sequentially.
    pub fn leaf_len(&self) -> usize {
        self.leaf_len
    }

    /// Scans the whole range on the current rayon pool.
    pub fn compute(&self, listener: &dyn SearchListener) -> PixelSeekResult<SearchOutcome> {
        self.attempted.store(0, Ordering::Relaxed);
        let _span = trace_span!(
            "parallel_scan",
            first = self.range.first(),
            end = self.range.end(),
            leaf_len = self.leaf_len
        )
        .entered();
        let outcome = self.solve(self.range, listener)?;
        trace_event!(
            "parallel_scan_done",
            attempted = outcome.summary().attempted,
            hits = outcome.summary().hits
        );
        Ok(outcome)
    }

    /// Scans the whole range on a caller-provided pool.
    pub fn compute_in(
        &self,
        pool: &rayon::ThreadPool,
        listener: &dyn SearchListener,
    ) -> PixelSeekResult<SearchOutcome> {
        pool.install(|| self.compute(listener))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    fn is_leaf(&self, range: SearchRange) -> bool {
        range.len() < self.leaf_len || range.len() < 2
    }

    fn solve(
        &self,
        range: SearchRange,
        listener: &dyn SearchListener,
    ) -> PixelSeekResult<SearchOutcome> {
        if self.is_cancelled() {
            return Ok(SearchOutcome::Cancelled(ScanSummary::default()));
        }
        if self.is_leaf(range) {
            let mut leaf = SequentialScanner::from_parts(
                &self.evaluator,
                range,
                self.update_interval,
                self.cancel.clone(),
            );
            let outcome = leaf.run(listener);
            self.attempted
                .fetch_add(leaf.state().counter(), Ordering::Relaxed);
            return outcome;
        }

        let (left, right) = range.split();
        trace_debug!(
            "fork",
            first = range.first(),
            mid = left.end(),
            end = range.end()
        );
        let (left, right) = rayon::join(
            || self.solve(left, listener),
            || self.solve(right, listener),
        );
        Ok(left?.merge(right?))
    }
}

impl<E: PositionEvaluator + Sync> Searcher for ParallelScanner<E> {
    fn positions_to_try(&self) -> usize {
        self.range.len()
    }

    /// Sum over finished leaves; grows leaf by leaf while a scan runs.
    fn positions_tried(&self) -> usize {
        self.attempted.load(Ordering::Relaxed)
    }

    fn reset(&mut self) {
        self.attempted.store(0, Ordering::Relaxed);
    }

    fn cancel(&self) -> PixelSeekResult<()> {
        cancel_via(self.cancel.as_ref())
    }

    fn run_search(&mut self, listener: &dyn SearchListener) -> PixelSeekResult<SearchOutcome> {
        self.compute(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::ParallelScanner;
    use crate::search::listener::{CollectingListener, ListenerResult, ScanReport, SearchEvent};
    use crate::search::position::{PositionSpace, SearchRange};
    use crate::search::sequential::SEARCH_STARTED;
    use crate::search::{CancelToken, PositionEvaluator, SearchConfig, SearchListener, Searcher};
    use crate::util::{ListenerError, PixelSeekError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Every position divisible by `step` is a hit; counts evaluations.
    struct EveryNth {
        space: PositionSpace,
        step: usize,
        calls: AtomicUsize,
    }

    impl EveryNth {
        fn new(len: usize, step: usize) -> Self {
            Self {
                space: PositionSpace::new(len, 1).unwrap(),
                step,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PositionEvaluator for EveryNth {
        fn space(&self) -> PositionSpace {
            self.space
        }

        fn try_position(&self, position: usize) -> bool {
            self.calls.fetch_add(1, Ordering::Relaxed);
            position % self.step == 0
        }
    }

    fn config(leaf_len: usize) -> SearchConfig {
        SearchConfig {
            leaf_len: Some(leaf_len),
            ..SearchConfig::default()
        }
    }

    fn leaf_count(listener: &CollectingListener) -> usize {
        listener
            .events()
            .iter()
            .filter(|e| **e == SearchEvent::Information(SEARCH_STARTED.to_owned()))
            .count()
    }

    #[test]
    fn default_leaf_len_splits_full_range_once() {
        let evaluator = EveryNth::new(1000, 7);
        let scanner = ParallelScanner::with_evaluator(
            &evaluator,
            evaluator.space().full_range(),
            &SearchConfig::default(),
        )
        .unwrap();
        let listener = CollectingListener::new();

        let outcome = scanner.compute(&listener).unwrap();

        assert_eq!(leaf_count(&listener), 2);
        assert_eq!(outcome.summary().attempted, 1000);
        assert_eq!(outcome.summary().hits, (0..1000).filter(|p| p % 7 == 0).count());
        assert_eq!(scanner.positions_tried(), 1000);
    }

    #[test]
    fn offset_range_stays_inside_bounds() {
        let evaluator = EveryNth::new(1000, 3);
        let range = SearchRange::new(600, 1000).unwrap();
        let scanner = ParallelScanner::with_evaluator(&evaluator, range, &config(50)).unwrap();
        let listener = CollectingListener::new();

        scanner.compute(&listener).unwrap();

        let mut hits = listener.hits();
        hits.sort_unstable();
        let expected: Vec<_> = (600..1000).filter(|p| p % 3 == 0).collect();
        assert_eq!(hits, expected);
        assert_eq!(evaluator.calls.load(Ordering::Relaxed), 400);
    }

    #[test]
    fn leaf_len_of_one_terminates() {
        let evaluator = EveryNth::new(37, 2);
        let scanner = ParallelScanner::with_evaluator(
            &evaluator,
            evaluator.space().full_range(),
            &config(1),
        )
        .unwrap();
        let listener = CollectingListener::new();

        let outcome = scanner.compute(&listener).unwrap();

        assert_eq!(outcome.summary().attempted, 37);
        assert_eq!(leaf_count(&listener), 37);
    }

    #[test]
    fn runs_on_a_dedicated_pool() {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(3)
            .build()
            .unwrap();
        let evaluator = EveryNth::new(5000, 11);
        let scanner = ParallelScanner::with_evaluator(
            &evaluator,
            evaluator.space().full_range(),
            &config(256),
        )
        .unwrap();
        let listener = CollectingListener::new();

        let outcome = scanner.compute_in(&pool, &listener).unwrap();

        assert_eq!(outcome.summary().hits, (0..5000).filter(|p| p % 11 == 0).count());
    }

    #[test]
    fn pre_cancelled_scan_does_no_work() {
        let evaluator = EveryNth::new(4096, 5);
        let token = CancelToken::new();
        let scanner = ParallelScanner::with_evaluator(
            &evaluator,
            evaluator.space().full_range(),
            &config(64),
        )
        .unwrap()
        .with_cancel_token(token.clone());
        scanner.cancel().unwrap();

        let outcome = scanner.compute(&CollectingListener::new()).unwrap();

        assert!(outcome.is_cancelled());
        assert_eq!(outcome.summary().attempted, 0);
        assert_eq!(evaluator.calls.load(Ordering::Relaxed), 0);
    }

    /// Fails on one specific hit position.
    struct FailAt {
        position: usize,
        inner: CollectingListener,
    }

    impl SearchListener for FailAt {
        fn possible_match(&self, report: &ScanReport) -> ListenerResult {
            if report.position == self.position {
                return Err(ListenerError::new("rejected"));
            }
            self.inner.possible_match(report)
        }
    }

    #[test]
    fn listener_failure_aborts_only_its_leaf() {
        let evaluator = EveryNth::new(400, 10);
        let scanner = ParallelScanner::with_evaluator(
            &evaluator,
            evaluator.space().full_range(),
            &config(100),
        )
        .unwrap();
        let listener = FailAt {
            position: 120,
            inner: CollectingListener::new(),
        };

        let err = scanner.compute(&listener).unwrap_err();

        assert_eq!(err, PixelSeekError::Listener(ListenerError::new("rejected")));
        let mut hits = listener.inner.hits();
        hits.sort_unstable();
        let expected: Vec<_> = (0..400)
            .filter(|p| p % 10 == 0)
            .filter(|p| !(120..150).contains(p))
            .collect();
        assert_eq!(hits, expected);
    }

    #[test]
    fn cancel_without_token_is_unsupported() {
        let evaluator = EveryNth::new(10, 2);
        let scanner = ParallelScanner::with_evaluator(
            &evaluator,
            evaluator.space().full_range(),
            &SearchConfig::default(),
        )
        .unwrap();
        assert_eq!(
            scanner.cancel().unwrap_err(),
            PixelSeekError::Unsupported("cancellation")
        );
    }
}
