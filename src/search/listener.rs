//! Listener protocol through which scanners report progress and hits.
//!
//! Scanners call a listener synchronously from the thread that is scanning.
//! Under [`ParallelScanner`](crate::search::ParallelScanner) that means many
//! worker threads at once, so every listener must be `Send + Sync` and guard
//! whatever state it mutates. [`ChannelListener`] is the alternative when a
//! single consumer should see the events one at a time.

use crate::search::position::PositionSpace;
use crate::util::ListenerError;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Result of a listener callback; an error aborts the reporting scan task.
pub type ListenerResult = Result<(), ListenerError>;

/// Position and progress metadata attached to `update` and `possible_match`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanReport {
    /// Linear position in the target.
    pub position: usize,
    /// Column of `position`.
    pub x: usize,
    /// Row of `position`.
    pub y: usize,
    /// Time since the reporting scan task started.
    pub elapsed: Duration,
    /// Positions attempted by the reporting task, including this one.
    pub attempted: usize,
}

impl ScanReport {
    /// Builds a report for `position` in `space`.
    pub fn new(space: PositionSpace, position: usize, elapsed: Duration, attempted: usize) -> Self {
        Self {
            position,
            x: position % space.width(),
            y: position / space.width(),
            elapsed,
            attempted,
        }
    }

    /// Elapsed time in whole milliseconds.
    pub fn elapsed_millis(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

/// Receiver of scan notifications.
pub trait SearchListener: Send + Sync {
    /// Free-form status text such as scan start and finish.
    fn information(&self, message: &str) -> ListenerResult {
        let _ = message;
        Ok(())
    }

    /// Periodic heartbeat on a non-matching position.
    fn update(&self, report: &ScanReport) -> ListenerResult {
        let _ = report;
        Ok(())
    }

    /// A position whose mean distance fell below the threshold.
    fn possible_match(&self, report: &ScanReport) -> ListenerResult;
}

impl<L: SearchListener + ?Sized> SearchListener for &L {
    fn information(&self, message: &str) -> ListenerResult {
        (**self).information(message)
    }

    fn update(&self, report: &ScanReport) -> ListenerResult {
        (**self).update(report)
    }

    fn possible_match(&self, report: &ScanReport) -> ListenerResult {
        (**self).possible_match(report)
    }
}

impl<L: SearchListener + ?Sized> SearchListener for Arc<L> {
    fn information(&self, message: &str) -> ListenerResult {
        (**self).information(message)
    }

    fn update(&self, report: &ScanReport) -> ListenerResult {
        (**self).update(report)
    }

    fn possible_match(&self, report: &ScanReport) -> ListenerResult {
        (**self).possible_match(report)
    }
}

impl<L: SearchListener + ?Sized> SearchListener for Box<L> {
    fn information(&self, message: &str) -> ListenerResult {
        (**self).information(message)
    }

    fn update(&self, report: &ScanReport) -> ListenerResult {
        (**self).update(report)
    }

    fn possible_match(&self, report: &ScanReport) -> ListenerResult {
        (**self).possible_match(report)
    }
}

/// One listener notification as a value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchEvent {
    Information(String),
    Update(ScanReport),
    PossibleMatch(ScanReport),
}

impl SearchEvent {
    /// Delivers this event to `listener`.
    pub fn dispatch(&self, listener: &dyn SearchListener) -> ListenerResult {
        match self {
            SearchEvent::Information(message) => listener.information(message),
            SearchEvent::Update(report) => listener.update(report),
            SearchEvent::PossibleMatch(report) => listener.possible_match(report),
        }
    }
}

/// Records every event behind a mutex.
#[derive(Debug, Default)]
pub struct CollectingListener {
    events: Mutex<Vec<SearchEvent>>,
}

impl CollectingListener {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SearchEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of all events in arrival order.
    pub fn events(&self) -> Vec<SearchEvent> {
        self.lock().clone()
    }

    /// Positions of `possible_match` events in arrival order.
    pub fn hits(&self) -> Vec<usize> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                SearchEvent::PossibleMatch(report) => Some(report.position),
                _ => None,
            })
            .collect()
    }

    /// Reports of `update` events in arrival order.
    pub fn updates(&self) -> Vec<ScanReport> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                SearchEvent::Update(report) => Some(*report),
                _ => None,
            })
            .collect()
    }

    /// Consumes the recorder and returns its events.
    pub fn into_events(self) -> Vec<SearchEvent> {
        self.events
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl SearchListener for CollectingListener {
    fn information(&self, message: &str) -> ListenerResult {
        self.lock().push(SearchEvent::Information(message.to_owned()));
        Ok(())
    }

    fn update(&self, report: &ScanReport) -> ListenerResult {
        self.lock().push(SearchEvent::Update(*report));
        Ok(())
    }

    fn possible_match(&self, report: &ScanReport) -> ListenerResult {
        self.lock().push(SearchEvent::PossibleMatch(*report));
        Ok(())
    }
}

/// Forwards events over an mpsc channel to a single consumer.
///
/// Sending fails once the receiver is dropped, which aborts the scan.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: Sender<SearchEvent>,
}

impl ChannelListener {
    /// Creates a listener and the receiving end of its channel.
    pub fn new() -> (Self, Receiver<SearchEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SearchEvent) -> ListenerResult {
        self.tx
            .send(event)
            .map_err(|_| ListenerError::new("event receiver dropped"))
    }
}

impl SearchListener for ChannelListener {
    fn information(&self, message: &str) -> ListenerResult {
        self.send(SearchEvent::Information(message.to_owned()))
    }

    fn update(&self, report: &ScanReport) -> ListenerResult {
        self.send(SearchEvent::Update(*report))
    }

    fn possible_match(&self, report: &ScanReport) -> ListenerResult {
        self.send(SearchEvent::PossibleMatch(*report))
    }
}

/// Emits events as `tracing` records under the `pixelseek` target.
#[cfg(feature = "tracing")]
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

#[cfg(feature = "tracing")]
impl SearchListener for TracingListener {
    fn information(&self, message: &str) -> ListenerResult {
        tracing::info!(target: "pixelseek", "{message}");
        Ok(())
    }

    fn update(&self, report: &ScanReport) -> ListenerResult {
        tracing::debug!(
            target: "pixelseek",
            position = report.position,
            attempted = report.attempted,
            elapsed_ms = report.elapsed_millis() as u64,
            "searching"
        );
        Ok(())
    }

    fn possible_match(&self, report: &ScanReport) -> ListenerResult {
        tracing::info!(
            target: "pixelseek",
            position = report.position,
            x = report.x,
            y = report.y,
            attempted = report.attempted,
            elapsed_ms = report.elapsed_millis() as u64,
            "possible match"
        );
        Ok(())
    }
}
