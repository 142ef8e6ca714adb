//! Distance kernels evaluated at a single anchor position.
//!
//! A kernel walks the reference image over the target anchored at `(x, y)`
//! and accumulates the per-pixel RGB Euclidean distance. Reference pixels that
//! project outside the target are skipped, so anchors near the right and
//! bottom edges are scored on their partial overlap only.

use crate::image::{ImageView, Rgb};

/// Accumulated distance over the overlapping pixels at one anchor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Overlap {
    /// Sum of per-pixel RGB distances.
    pub sum: f64,
    /// Number of compared pixel pairs.
    pub count: usize,
}

impl Overlap {
    /// Mean per-pixel distance, or `None` when nothing overlapped.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum / self.count as f64)
    }
}

/// Kernel trait for per-anchor distance accumulation.
pub trait Kernel {
    /// Accumulates distances between `reference` and `target` anchored at `(x, y)`.
    fn overlap_at(
        target: ImageView<'_, Rgb>,
        reference: ImageView<'_, Rgb>,
        x: usize,
        y: usize,
    ) -> Overlap;
}

/// Returns the overlapping `(columns, rows)` of the reference at `(x, y)`.
#[inline]
pub(crate) fn overlap_extent(
    target: ImageView<'_, Rgb>,
    reference: ImageView<'_, Rgb>,
    x: usize,
    y: usize,
) -> (usize, usize) {
    if x >= target.width() || y >= target.height() {
        return (0, 0);
    }
    let cols = reference.width().min(target.width() - x);
    let rows = reference.height().min(target.height() - y);
    (cols, rows)
}

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(not(feature = "simd"))]
pub(crate) use scalar::RgbDistanceScalar as ActiveKernel;
#[cfg(feature = "simd")]
pub(crate) use simd::RgbDistanceSimd as ActiveKernel;
