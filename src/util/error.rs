//! Error types for pixelseek.

use thiserror::Error;

/// Result alias for pixelseek operations.
pub type PixelSeekResult<T> = std::result::Result<T, PixelSeekError>;

/// Failure raised by a [`SearchListener`](crate::search::SearchListener) callback.
///
/// Returning this from a callback aborts the scan task that issued it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    /// Creates a listener error with a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message the listener reported.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors that can occur when setting up or running a search.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PixelSeekError {
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the image width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the view requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Search range starts after it ends.
    #[error("reversed range [{first}, {end})")]
    ReversedRange { first: usize, end: usize },
    /// Search range reaches past the last target position.
    #[error("range end {end} exceeds position space of {len}")]
    RangeOutOfBounds { end: usize, len: usize },
    /// A search parameter is out of its valid domain.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    /// The requested operation is not supported by this searcher.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    /// A listener callback failed and aborted the scan.
    #[error("listener failed: {0}")]
    Listener(#[from] ListenerError),
    /// Image decoding failed.
    #[error("image io error: {reason}")]
    ImageIo { reason: String },
    /// A background search thread panicked before finishing.
    #[error("search worker panicked")]
    WorkerPanicked,
}
