//! Brute-force position search.
//!
//! Every anchor position in a range of the target is scored by a
//! [`PositionEvaluator`] and reported through a [`SearchListener`]. Two
//! execution strategies share the same per-range loop:
//!
//! - [`SequentialScanner`] walks one range on the calling thread.
//! - [`ParallelScanner`] (feature `rayon`) splits the range in halves with
//!   `rayon::join` until each piece is shorter than the leaf length, then runs
//!   a sequential scan per leaf.
//!
//! Hits never come back as return values; the returned [`SearchOutcome`] only
//! carries counters and whether the search completed or was cancelled.

use crate::image::{ImageView, Rgb};
use crate::util::{PixelSeekError, PixelSeekResult};
use std::time::Duration;

pub mod background;
pub mod cancel;
pub mod evaluator;
pub mod listener;
#[cfg(feature = "rayon")]
pub mod parallel;
pub mod position;
pub mod sequential;

pub use background::SearchHandle;
pub use cancel::CancelToken;
pub use evaluator::{MatchEvaluator, PositionEvaluator};
pub use listener::{
    ChannelListener, CollectingListener, ListenerResult, ScanReport, SearchEvent, SearchListener,
};
#[cfg(feature = "tracing")]
pub use listener::TracingListener;
#[cfg(feature = "rayon")]
pub use parallel::ParallelScanner;
pub use position::{PositionSpace, SearchRange};
pub use sequential::{ScanState, SequentialScanner};

/// Default mean RGB distance below which a position is a hit.
pub const DEFAULT_THRESHOLD: f64 = 10.0;

/// Default number of attempts between progress updates.
pub const DEFAULT_UPDATE_INTERVAL: usize = 1000;

/// Search configuration shared by both strategies.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchConfig {
    /// Mean per-pixel RGB distance below which a position is reported.
    pub threshold: f64,
    /// Attempts between `update` notifications within one scan task; 0 disables them.
    pub update_interval: usize,
    /// Ranges shorter than this are scanned sequentially by the parallel
    /// scanner. `None` uses the target area.
    pub leaf_len: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            leaf_len: None,
        }
    }
}

impl SearchConfig {
    /// Checks parameter domains.
    pub fn validate(&self) -> PixelSeekResult<()> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(PixelSeekError::InvalidConfig(
                "threshold must be finite and positive",
            ));
        }
        if self.leaf_len == Some(0) {
            return Err(PixelSeekError::InvalidConfig("leaf_len must be at least 1"));
        }
        Ok(())
    }

    /// Leaf length for a position space of `area` positions.
    pub fn resolved_leaf_len(&self, area: usize) -> usize {
        self.leaf_len.unwrap_or(area).max(1)
    }
}

/// Counters gathered by a finished or cancelled scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Positions evaluated.
    pub attempted: usize,
    /// Positions reported as possible matches.
    pub hits: usize,
    /// Wall-clock time of the scan; for parallel scans, the longest leaf.
    pub elapsed: Duration,
}

impl ScanSummary {
    fn merge(self, other: ScanSummary) -> ScanSummary {
        ScanSummary {
            attempted: self.attempted + other.attempted,
            hits: self.hits + other.hits,
            elapsed: self.elapsed.max(other.elapsed),
        }
    }
}

/// Terminal state of a search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The whole range was scanned and at least one hit was reported.
    Found(ScanSummary),
    /// The whole range was scanned without a hit.
    NotFound(ScanSummary),
    /// A cancel request stopped the scan before the range was exhausted.
    Cancelled(ScanSummary),
}

impl SearchOutcome {
    pub(crate) fn completed(summary: ScanSummary) -> Self {
        if summary.hits > 0 {
            SearchOutcome::Found(summary)
        } else {
            SearchOutcome::NotFound(summary)
        }
    }

    /// Counters regardless of the terminal state.
    pub fn summary(&self) -> ScanSummary {
        match *self {
            SearchOutcome::Found(s) | SearchOutcome::NotFound(s) | SearchOutcome::Cancelled(s) => s,
        }
    }

    /// Returns `true` if the search was stopped early.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SearchOutcome::Cancelled(_))
    }

    /// Returns `true` if at least one hit was reported.
    pub fn found_match(&self) -> bool {
        self.summary().hits > 0
    }

    /// Combines the outcomes of two disjoint sub-ranges.
    ///
    /// Cancellation wins over completion; otherwise hits decide.
    pub fn merge(self, other: SearchOutcome) -> SearchOutcome {
        let summary = self.summary().merge(other.summary());
        if self.is_cancelled() || other.is_cancelled() {
            SearchOutcome::Cancelled(summary)
        } else {
            SearchOutcome::completed(summary)
        }
    }
}

/// Common surface of the sequential and parallel scanners.
pub trait Searcher {
    /// Number of positions in the scanner's range.
    fn positions_to_try(&self) -> usize;

    /// Positions attempted by the current or last run.
    fn positions_tried(&self) -> usize;

    /// Resets scan state so the next run starts at the range beginning.
    fn reset(&mut self);

    /// Requests cooperative cancellation.
    ///
    /// Fails with [`PixelSeekError::Unsupported`] when the scanner was built
    /// without a [`CancelToken`].
    fn cancel(&self) -> PixelSeekResult<()>;

    /// Scans the whole range, reporting through `listener`.
    fn run_search(&mut self, listener: &dyn SearchListener) -> PixelSeekResult<SearchOutcome>;
}

pub(crate) fn cancel_via(token: Option<&CancelToken>) -> PixelSeekResult<()> {
    match token {
        Some(token) => {
            token.cancel();
            Ok(())
        }
        None => Err(PixelSeekError::Unsupported("cancellation")),
    }
}

/// Execution strategy for [`search`] and [`SearchHandle`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Strategy {
    /// One scan on the calling (or worker) thread.
    #[default]
    Sequential,
    /// Fork-join over the rayon global pool.
    #[cfg(feature = "rayon")]
    Parallel,
}

/// Searches the whole target for `reference` with the chosen strategy.
pub fn search(
    target: ImageView<'_, Rgb>,
    reference: ImageView<'_, Rgb>,
    strategy: Strategy,
    config: &SearchConfig,
    listener: &dyn SearchListener,
) -> PixelSeekResult<SearchOutcome> {
    search_with_cancel(target, reference, strategy, config, None, listener)
}

pub(crate) fn search_with_cancel(
    target: ImageView<'_, Rgb>,
    reference: ImageView<'_, Rgb>,
    strategy: Strategy,
    config: &SearchConfig,
    cancel: Option<CancelToken>,
    listener: &dyn SearchListener,
) -> PixelSeekResult<SearchOutcome> {
    let evaluator = MatchEvaluator::new(target, reference, config.threshold)?;
    let range = evaluator.space().full_range();
    match strategy {
        Strategy::Sequential => {
            let mut scanner = SequentialScanner::with_evaluator(evaluator, range, config)?;
            if let Some(token) = cancel {
                scanner = scanner.with_cancel_token(token);
            }
            scanner.run(listener)
        }
        #[cfg(feature = "rayon")]
        Strategy::Parallel => {
            let mut scanner = ParallelScanner::with_evaluator(evaluator, range, config)?;
            if let Some(token) = cancel {
                scanner = scanner.with_cancel_token(token);
            }
            scanner.compute(listener)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ScanSummary, SearchConfig, SearchOutcome};
    use crate::util::PixelSeekError;
    use std::time::Duration;

    fn summary(attempted: usize, hits: usize, ms: u64) -> ScanSummary {
        ScanSummary {
            attempted,
            hits,
            elapsed: Duration::from_millis(ms),
        }
    }

    #[test]
    fn merge_sums_counters_and_keeps_longest_elapsed() {
        let a = SearchOutcome::NotFound(summary(10, 0, 5));
        let b = SearchOutcome::Found(summary(7, 2, 9));
        let merged = a.merge(b);
        assert_eq!(merged, SearchOutcome::Found(summary(17, 2, 9)));
        assert!(merged.found_match());
    }

    #[test]
    fn merge_prefers_cancelled() {
        let a = SearchOutcome::Found(summary(10, 1, 5));
        let b = SearchOutcome::Cancelled(summary(3, 0, 1));
        let merged = a.merge(b);
        assert!(merged.is_cancelled());
        assert_eq!(merged.summary().attempted, 13);
        assert_eq!(merged.summary().hits, 1);
    }

    #[test]
    fn config_rejects_bad_values() {
        assert!(SearchConfig::default().validate().is_ok());
        let err = SearchConfig {
            threshold: f64::NAN,
            ..SearchConfig::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, PixelSeekError::InvalidConfig(_)));
        let err = SearchConfig {
            leaf_len: Some(0),
            ..SearchConfig::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, PixelSeekError::InvalidConfig(_)));
    }

    #[test]
    fn leaf_len_defaults_to_area() {
        let cfg = SearchConfig::default();
        assert_eq!(cfg.resolved_leaf_len(400), 400);
        let cfg = SearchConfig {
            leaf_len: Some(64),
            ..SearchConfig::default()
        };
        assert_eq!(cfg.resolved_leaf_len(400), 64);
    }
}
