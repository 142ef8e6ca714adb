//! Searches on a dedicated worker thread.
//!
//! The handle owns shared references to both images, so the caller's thread
//! is free while the scan runs and can cancel it at any time.

use crate::image::{OwnedImage, Rgb};
use crate::search::cancel::CancelToken;
use crate::search::evaluator::MatchEvaluator;
use crate::search::listener::SearchListener;
use crate::search::{search_with_cancel, SearchConfig, SearchOutcome, Strategy};
use crate::util::{PixelSeekError, PixelSeekResult};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A search running on its own thread.
#[derive(Debug)]
pub struct SearchHandle {
    cancel: CancelToken,
    worker: JoinHandle<PixelSeekResult<SearchOutcome>>,
}

impl SearchHandle {
    /// Starts a full-target search on a new thread.
    ///
    /// Configuration errors are reported here, before the thread starts.
    pub fn spawn<L>(
        target: Arc<OwnedImage<Rgb>>,
        reference: Arc<OwnedImage<Rgb>>,
        strategy: Strategy,
        config: SearchConfig,
        listener: L,
    ) -> PixelSeekResult<Self>
    where
        L: SearchListener + 'static,
    {
        config.validate()?;
        MatchEvaluator::new(target.view(), reference.view(), config.threshold)?;

        let cancel = CancelToken::new();
        let token = cancel.clone();
        let worker = thread::spawn(move || {
            search_with_cancel(
                target.view(),
                reference.view(),
                strategy,
                &config,
                Some(token),
                &listener,
            )
        });
        Ok(Self { cancel, worker })
    }

    /// Requests cancellation; the worker stops at its next check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this search when triggered.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Returns `true` once the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Waits for the worker and returns its outcome.
    pub fn join(self) -> PixelSeekResult<SearchOutcome> {
        self.worker
            .join()
            .map_err(|_| PixelSeekError::WorkerPanicked)?
    }
}
