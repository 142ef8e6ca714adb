//! Linear position space over the target image.
//!
//! A position is the row-major index `y * width + x` of an anchor pixel in the
//! target. Scans are handed half-open ranges of positions.

use crate::util::{PixelSeekError, PixelSeekResult};
use std::ops::Range;

/// Row-major enumeration of anchor positions over a `width x height` target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionSpace {
    width: usize,
    height: usize,
}

impl PositionSpace {
    /// Creates a position space; both dimensions must be non-zero.
    pub fn new(width: usize, height: usize) -> PixelSeekResult<Self> {
        if width == 0 || height == 0 || width.checked_mul(height).is_none() {
            return Err(PixelSeekError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Target width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Target height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of positions, `width * height`.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Always false; a position space has at least one position.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns `true` if `position` addresses a target pixel.
    pub fn contains(&self, position: usize) -> bool {
        position < self.len()
    }

    /// Maps a position to `(x, y)`; `None` outside the space.
    pub fn coords(&self, position: usize) -> Option<(usize, usize)> {
        if !self.contains(position) {
            return None;
        }
        Some((position % self.width, position / self.width))
    }

    /// Maps `(x, y)` back to a position; `None` outside the target.
    pub fn position(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    /// The range covering every position.
    pub fn full_range(&self) -> SearchRange {
        SearchRange {
            first: 0,
            end: self.len(),
        }
    }

    /// Validates `[first, end)` against this space.
    pub fn range(&self, first: usize, end: usize) -> PixelSeekResult<SearchRange> {
        SearchRange::new(first, end).and_then(|range| range.check_within(self))
    }
}

/// Half-open interval `[first, end)` of positions owned by one scan task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchRange {
    first: usize,
    end: usize,
}

impl SearchRange {
    /// Creates a range; fails if `first > end`.
    pub fn new(first: usize, end: usize) -> PixelSeekResult<Self> {
        if first > end {
            return Err(PixelSeekError::ReversedRange { first, end });
        }
        Ok(Self { first, end })
    }

    /// First position in the range.
    pub fn first(&self) -> usize {
        self.first
    }

    /// One past the last position in the range.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of positions in the range.
    pub fn len(&self) -> usize {
        self.end - self.first
    }

    /// Returns `true` for an empty range.
    pub fn is_empty(&self) -> bool {
        self.first == self.end
    }

    /// Fails unless `end <= space.len()`.
    pub fn check_within(self, space: &PositionSpace) -> PixelSeekResult<Self> {
        if self.end > space.len() {
            return Err(PixelSeekError::RangeOutOfBounds {
                end: self.end,
                len: space.len(),
            });
        }
        Ok(self)
    }

    /// Splits at the midpoint of the range into `[first, mid)` and `[mid, end)`.
    ///
    /// The midpoint is `first + len / 2`, so both halves stay inside the
    /// parent for ranges that do not start at zero.
    pub fn split(&self) -> (SearchRange, SearchRange) {
        let mid = self.first + self.len() / 2;
        (
            SearchRange {
                first: self.first,
                end: mid,
            },
            SearchRange {
                first: mid,
                end: self.end,
            },
        )
    }

    /// Returns the positions as a `Range<usize>`.
    pub fn positions(&self) -> Range<usize> {
        self.first..self.end
    }
}
