//! Sequential scan over one position range.
//!
//! The scanner tries every position of its range in increasing order on the
//! calling thread. Hits are reported as they are found and the scan carries
//! on to the end of the range; non-matching positions produce a progress
//! update every `update_interval` attempts.

use crate::image::{ImageView, Rgb};
use crate::search::cancel::CancelToken;
use crate::search::evaluator::{MatchEvaluator, PositionEvaluator};
use crate::search::listener::{ScanReport, SearchListener};
use crate::search::position::SearchRange;
use crate::search::{cancel_via, ScanSummary, SearchConfig, SearchOutcome, Searcher};
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::PixelSeekResult;
use std::time::{Duration, Instant};

/// Message sent through `information` when a scan starts.
pub const SEARCH_STARTED: &str = "SEARCHING...";

/// Progress counters owned by one scan task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanState {
    counter: usize,
    current_position: usize,
}

impl ScanState {
    fn at(first: usize) -> Self {
        Self {
            counter: 0,
            current_position: first,
        }
    }

    /// Positions attempted so far.
    pub fn counter(&self) -> usize {
        self.counter
    }

    /// Next position to try.
    pub fn current_position(&self) -> usize {
        self.current_position
    }
}

/// Single-threaded scanner over a [`SearchRange`].
#[derive(Debug)]
pub struct SequentialScanner<E> {
    evaluator: E,
    range: SearchRange,
    update_interval: usize,
    cancel: Option<CancelToken>,
    state: ScanState,
}

impl<'a> SequentialScanner<MatchEvaluator<'a>> {
    /// Scanner over `range` of `target`, looking for `reference`.
    pub fn new(
        target: ImageView<'a, Rgb>,
        reference: ImageView<'a, Rgb>,
        range: SearchRange,
        config: &SearchConfig,
    ) -> PixelSeekResult<Self> {
        let evaluator = MatchEvaluator::new(target, reference, config.threshold)?;
        Self::with_evaluator(evaluator, range, config)
    }

    /// Scanner over every position of `target`.
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

impl<E: PositionEvaluator> SequentialScanner<E> {
    /// Scanner driven by a custom evaluator; `range` must fit its space.
    pub fn with_evaluator(
        evaluator: E,
        range: SearchRange,
        config: &SearchConfig,
    ) -> PixelSeekResult<Self> {
        config.validate()?;
        let range = range.check_within(&evaluator.space())?;
        Ok(Self::from_parts(
            evaluator,
            range,
            config.update_interval,
            None,
        ))
    }

    /// Leaf constructor for ranges that were already validated.
    pub(crate) fn from_parts(
        evaluator: E,
        range: SearchRange,
        update_interval: usize,
        cancel: Option<CancelToken>,
    ) -> Self {
        Self {
            evaluator,
            range,
            update_interval,
            cancel,
            state: ScanState::at(range.first()),
        }
    }

    /// Attaches a cancel token checked before every position.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Range this scanner walks.
    pub fn range(&self) -> SearchRange {
        self.range
    }

    /// Current scan counters.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// The evaluator used for each position.
    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Rewinds the counters to the start of the range.
    pub fn reset(&mut self) {
        self.state = ScanState::at(self.range.first());
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    fn report(&self, position: usize, elapsed: Duration) -> ScanReport {
        ScanReport::new(
            self.evaluator.space(),
            position,
            elapsed,
            self.state.counter,
        )
    }

    /// Scans the whole range, resetting first.
    ///
    /// A listener error aborts the scan and is returned as-is.
    pub fn run(&mut self, listener: &dyn SearchListener) -> PixelSeekResult<SearchOutcome> {
        self.reset();
        let _span = trace_span!(
            "sequential_scan",
            first = self.range.first(),
            end = self.range.end()
        )
        .entered();

        listener.information(SEARCH_STARTED)?;
        let start = Instant::now();
        let total = self.range.len();
        let mut hits = 0usize;

        while self.state.counter < total {
            if self.is_cancelled() {
                let summary = ScanSummary {
                    attempted: self.state.counter,
                    hits,
                    elapsed: start.elapsed(),
                };
                trace_event!("scan_cancelled", attempted = summary.attempted);
                listener.information(&format!(
                    "Cancelled at {:.3}s",
                    summary.elapsed.as_secs_f64()
                ))?;
                return Ok(SearchOutcome::Cancelled(summary));
            }

            let position = self.state.current_position;
            let hit = self.evaluator.try_position(position);
            self.state.current_position += 1;
            self.state.counter += 1;

            if hit {
                hits += 1;
                trace_debug!("possible_match", position = position);
                listener.possible_match(&self.report(position, start.elapsed()))?;
            } else if self.update_interval > 0 && self.state.counter % self.update_interval == 0 {
                listener.update(&self.report(position, start.elapsed()))?;
            }
        }

        let elapsed = start.elapsed();
        trace_event!("scan_finished", attempted = total, hits = hits);
        listener.information(&format!("Finished at {:.3}s", elapsed.as_secs_f64()))?;
        Ok(SearchOutcome::completed(ScanSummary {
            attempted: total,
            hits,
            elapsed,
        }))
    }
}

impl<E: PositionEvaluator> Searcher for SequentialScanner<E> {
    fn positions_to_try(&self) -> usize {
        self.range.len()
    }

    fn positions_tried(&self) -> usize {
        self.state.counter
    }

    fn reset(&mut self) {
        SequentialScanner::reset(self);
    }

    fn cancel(&self) -> PixelSeekResult<()> {
        cancel_via(self.cancel.as_ref())
    }

    fn run_search(&mut self, listener: &dyn SearchListener) -> PixelSeekResult<SearchOutcome> {
        self.run(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::{SequentialScanner, SEARCH_STARTED};
    use crate::image::{OwnedImage, Rgb};
    use crate::search::listener::{CollectingListener, ListenerResult, ScanReport, SearchEvent};
    use crate::search::position::{PositionSpace, SearchRange};
    use crate::search::{
        CancelToken, PositionEvaluator, SearchConfig, SearchListener, SearchOutcome, Searcher,
    };
    use crate::util::{ListenerError, PixelSeekError};
    use std::sync::Mutex;

    /// Evaluator that records every position it is asked about.
    struct Recording {
        space: PositionSpace,
        hits: Vec<usize>,
        seen: Mutex<Vec<usize>>,
    }

    impl Recording {
        fn new(len: usize, hits: &[usize]) -> Self {
            Self {
                space: PositionSpace::new(len, 1).unwrap(),
                hits: hits.to_vec(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl PositionEvaluator for Recording {
        fn space(&self) -> PositionSpace {
            self.space
        }

        fn try_position(&self, position: usize) -> bool {
            self.seen.lock().unwrap().push(position);
            self.hits.contains(&position)
        }
    }

    #[test]
    fn tries_every_position_once_in_order() {
        let evaluator = Recording::new(50, &[]);
        let range = SearchRange::new(12, 31).unwrap();
        let mut scanner =
            SequentialScanner::with_evaluator(&evaluator, range, &SearchConfig::default()).unwrap();
        let listener = CollectingListener::new();

        let outcome = scanner.run(&listener).unwrap();

        assert_eq!(*evaluator.seen.lock().unwrap(), (12..31).collect::<Vec<_>>());
        assert_eq!(outcome, SearchOutcome::NotFound(outcome.summary()));
        assert_eq!(outcome.summary().attempted, 19);
        assert_eq!(scanner.positions_tried(), 19);
        assert_eq!(scanner.positions_to_try(), 19);
    }

    #[test]
    fn keeps_scanning_after_a_hit() {
        let evaluator = Recording::new(100, &[3, 40, 99]);
        let mut scanner = SequentialScanner::with_evaluator(
            &evaluator,
            evaluator.space().full_range(),
            &SearchConfig::default(),
        )
        .unwrap();
        let listener = CollectingListener::new();

        let outcome = scanner.run(&listener).unwrap();

        assert_eq!(listener.hits(), vec![3, 40, 99]);
        assert_eq!(outcome.summary().hits, 3);
        assert!(outcome.found_match());
        let attempted: Vec<_> = listener
            .events()
            .iter()
            .filter_map(|e| match e {
                SearchEvent::PossibleMatch(r) => Some(r.attempted),
                _ => None,
            })
            .collect();
        assert_eq!(attempted, vec![4, 41, 100]);
    }

    #[test]
    fn update_cadence_skips_the_tail() {
        let evaluator = Recording::new(2500, &[]);
        let mut scanner = SequentialScanner::with_evaluator(
            &evaluator,
            evaluator.space().full_range(),
            &SearchConfig::default(),
        )
        .unwrap();
        let listener = CollectingListener::new();

        scanner.run(&listener).unwrap();

        let updates = listener.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(
            updates.iter().map(|r| r.attempted).collect::<Vec<_>>(),
            vec![1000, 2000]
        );
        assert_eq!(
            updates.iter().map(|r| r.position).collect::<Vec<_>>(),
            vec![999, 1999]
        );
    }

    #[test]
    fn hit_on_cadence_boundary_replaces_the_update() {
        let evaluator = Recording::new(1500, &[999]);
        let cfg = SearchConfig::default();
        let mut scanner =
            SequentialScanner::with_evaluator(&evaluator, evaluator.space().full_range(), &cfg)
                .unwrap();
        let listener = CollectingListener::new();

        scanner.run(&listener).unwrap();

        assert!(listener.updates().is_empty());
        assert_eq!(listener.hits(), vec![999]);
    }

    #[test]
    fn zero_interval_disables_updates() {
        let evaluator = Recording::new(3000, &[]);
        let cfg = SearchConfig {
            update_interval: 0,
            ..SearchConfig::default()
        };
        let mut scanner =
            SequentialScanner::with_evaluator(&evaluator, evaluator.space().full_range(), &cfg)
                .unwrap();
        let listener = CollectingListener::new();
        scanner.run(&listener).unwrap();
        assert!(listener.updates().is_empty());
    }

    #[test]
    fn brackets_scan_with_information() {
        let evaluator = Recording::new(10, &[]);
        let mut scanner = SequentialScanner::with_evaluator(
            &evaluator,
            evaluator.space().full_range(),
            &SearchConfig::default(),
        )
        .unwrap();
        let listener = CollectingListener::new();
        scanner.run(&listener).unwrap();

        let events = listener.into_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], SearchEvent::Information(SEARCH_STARTED.to_owned()));
        match &events[1] {
            SearchEvent::Information(msg) => assert!(msg.starts_with("Finished at ")),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn rerun_reproduces_hits() {
        let mut target = OwnedImage::filled(30, 20, Rgb::BLACK).unwrap();
        target.fill_rect(4, 2, 3, 3, Rgb::WHITE);
        target.fill_rect(20, 12, 3, 3, Rgb::WHITE);
        let reference = OwnedImage::filled(3, 3, Rgb::WHITE).unwrap();
        let mut scanner =
            SequentialScanner::full(target.view(), reference.view(), &SearchConfig::default())
                .unwrap();

        let first = CollectingListener::new();
        scanner.run(&first).unwrap();
        scanner.reset();
        let second = CollectingListener::new();
        scanner.run(&second).unwrap();

        assert_eq!(first.hits(), vec![2 * 30 + 4, 12 * 30 + 20]);
        assert_eq!(first.hits(), second.hits());
        let attempts = |l: &CollectingListener| -> Vec<usize> {
            l.updates().iter().map(|r| r.attempted).collect()
        };
        assert_eq!(attempts(&first), attempts(&second));
    }

    #[test]
    fn rejects_range_past_the_target() {
        let target = OwnedImage::filled(4, 4, Rgb::BLACK).unwrap();
        let reference = OwnedImage::filled(2, 2, Rgb::BLACK).unwrap();
        let err = SequentialScanner::new(
            target.view(),
            reference.view(),
            SearchRange::new(0, 17).unwrap(),
            &SearchConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, PixelSeekError::RangeOutOfBounds { end: 17, len: 16 });
    }

    struct FailOnHit;

    impl SearchListener for FailOnHit {
        fn possible_match(&self, _report: &ScanReport) -> ListenerResult {
            Err(ListenerError::new("display gone"))
        }
    }

    #[test]
    fn listener_failure_aborts_scan() {
        let evaluator = Recording::new(100, &[10, 20]);
        let mut scanner = SequentialScanner::with_evaluator(
            &evaluator,
            evaluator.space().full_range(),
            &SearchConfig::default(),
        )
        .unwrap();

        let err = scanner.run(&FailOnHit).unwrap_err();

        assert_eq!(err, PixelSeekError::Listener(ListenerError::new("display gone")));
        assert_eq!(scanner.positions_tried(), 11);
        assert_eq!(evaluator.seen.lock().unwrap().len(), 11);
    }

    #[test]
    fn cancel_without_token_is_unsupported() {
        let evaluator = Recording::new(10, &[]);
        let scanner = SequentialScanner::with_evaluator(
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

    /// Cancels its token once the given position is reported.
    struct CancelAt {
        token: CancelToken,
        position: usize,
        inner: CollectingListener,
    }

    impl SearchListener for CancelAt {
        fn information(&self, message: &str) -> ListenerResult {
            self.inner.information(message)
        }

        fn possible_match(&self, report: &ScanReport) -> ListenerResult {
            if report.position == self.position {
                self.token.cancel();
            }
            self.inner.possible_match(report)
        }
    }

    #[test]
    fn cancellation_stops_before_next_position() {
        let evaluator = Recording::new(100, &[5, 50]);
        let token = CancelToken::new();
        let mut scanner = SequentialScanner::with_evaluator(
            &evaluator,
            evaluator.space().full_range(),
            &SearchConfig::default(),
        )
        .unwrap()
        .with_cancel_token(token.clone());
        let listener = CancelAt {
            token,
            position: 5,
            inner: CollectingListener::new(),
        };

        let outcome = scanner.run(&listener).unwrap();

        assert!(outcome.is_cancelled());
        assert_eq!(outcome.summary().attempted, 6);
        assert_eq!(outcome.summary().hits, 1);
        assert_eq!(listener.inner.hits(), vec![5]);
        assert_eq!(evaluator.seen.lock().unwrap().len(), 6);
    }

    #[test]
    fn cancel_through_searcher_trait() {
        let evaluator = Recording::new(10, &[]);
        let mut scanner = SequentialScanner::with_evaluator(
            &evaluator,
            evaluator.space().full_range(),
            &SearchConfig::default(),
        )
        .unwrap()
        .with_cancel_token(CancelToken::new());

        Searcher::cancel(&scanner).unwrap();
        let outcome = scanner.run_search(&CollectingListener::new()).unwrap();

        assert!(outcome.is_cancelled());
        assert_eq!(outcome.summary().attempted, 0);
        assert!(evaluator.seen.lock().unwrap().is_empty());
    }
}
