//! Hit predicate for a single anchor position.

use crate::image::{ImageView, Rgb};
use crate::kernel::{ActiveKernel, Kernel, Overlap};
use crate::search::position::PositionSpace;
use crate::util::{PixelSeekError, PixelSeekResult};

/// Decides whether a position is a hit.
///
/// Scanners only see positions through this trait, so tests and callers can
/// substitute their own predicate. Implementations must be pure: the answer
/// for a position may not change between calls.
pub trait PositionEvaluator {
    /// Position space the evaluator is defined over.
    fn space(&self) -> PositionSpace;

    /// Returns `true` if `position` is a hit.
    fn try_position(&self, position: usize) -> bool;
}

impl<E: PositionEvaluator + ?Sized> PositionEvaluator for &E {
    fn space(&self) -> PositionSpace {
        (**self).space()
    }

    fn try_position(&self, position: usize) -> bool {
        (**self).try_position(position)
    }
}

/// Mean-RGB-distance evaluator over a target and a reference image.
#[derive(Clone, Copy, Debug)]
pub struct MatchEvaluator<'a> {
    target: ImageView<'a, Rgb>,
    reference: ImageView<'a, Rgb>,
    space: PositionSpace,
    threshold: f64,
}

impl<'a> MatchEvaluator<'a> {
    /// Binds the two images; `threshold` must be finite and positive.
    pub fn new(
        target: ImageView<'a, Rgb>,
        reference: ImageView<'a, Rgb>,
        threshold: f64,
    ) -> PixelSeekResult<Self> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(PixelSeekError::InvalidConfig(
                "threshold must be finite and positive",
            ));
        }
        let space = PositionSpace::new(target.width(), target.height())?;
        Ok(Self {
            target,
            reference,
            space,
            threshold,
        })
    }

    /// The image being searched.
    pub fn target(&self) -> ImageView<'a, Rgb> {
        self.target
    }

    /// The image being searched for.
    pub fn reference(&self) -> ImageView<'a, Rgb> {
        self.reference
    }

    /// Mean distance below which a position is a hit.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Raw distance accumulation at `position`; empty outside the space.
    pub fn overlap_at(&self, position: usize) -> Overlap {
        match self.space.coords(position) {
            Some((x, y)) => ActiveKernel::overlap_at(self.target, self.reference, x, y),
            None => Overlap::default(),
        }
    }

    /// Mean per-pixel distance at `position`, `None` when nothing overlaps.
    pub fn score_at(&self, position: usize) -> Option<f64> {
        self.overlap_at(position).mean()
    }
}

impl PositionEvaluator for MatchEvaluator<'_> {
    fn space(&self) -> PositionSpace {
        self.space
    }

    fn try_position(&self, position: usize) -> bool {
        self.score_at(position)
            .is_some_and(|mean| mean < self.threshold)
    }
}
