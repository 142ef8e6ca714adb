//! Shared utility helpers.

pub mod error;

pub use error::{ListenerError, PixelSeekError, PixelSeekResult};
