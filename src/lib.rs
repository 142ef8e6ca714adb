//! pixelseek is a brute-force template search over RGB images.
//!
//! Every anchor position of a target image is scored by the mean Euclidean
//! RGB distance to a reference image; positions under a threshold are
//! reported as possible matches through a [`SearchListener`]. Scans run
//! sequentially or, with the `rayon` feature (on by default), as a recursive
//! fork-join over halves of the position range.

pub mod image;
pub mod kernel;
pub mod search;
mod trace;
pub mod util;

#[cfg(feature = "image-io")]
pub use image::io;
pub use image::{ImageView, OwnedImage, Rgb};
pub use kernel::{Kernel, Overlap};
pub use util::{ListenerError, PixelSeekError, PixelSeekResult};

#[cfg(feature = "rayon")]
pub use search::ParallelScanner;
pub use search::{
    search, CancelToken, ChannelListener, CollectingListener, ListenerResult, MatchEvaluator,
    PositionEvaluator, PositionSpace, ScanReport, ScanSummary, SearchConfig, SearchEvent,
    SearchHandle, SearchListener, SearchOutcome, SearchRange, Searcher, SequentialScanner,
    Strategy, DEFAULT_THRESHOLD, DEFAULT_UPDATE_INTERVAL,
};
#[cfg(feature = "tracing")]
pub use search::TracingListener;
