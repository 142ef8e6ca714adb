//! Scalar reference kernel for RGB distance accumulation.

use crate::image::{ImageView, Rgb};
use crate::kernel::{overlap_extent, Kernel, Overlap};

/// Scalar mean-RGB-distance kernel.
pub struct RgbDistanceScalar;

impl Kernel for RgbDistanceScalar {
    fn overlap_at(
        target: ImageView<'_, Rgb>,
        reference: ImageView<'_, Rgb>,
        x: usize,
        y: usize,
    ) -> Overlap {
        let (cols, rows) = overlap_extent(target, reference, x, y);
        let mut overlap = Overlap::default();
        for ry in 0..rows {
            let (tgt_row, ref_row) = match (target.row(y + ry), reference.row(ry)) {
                (Some(t), Some(r)) => (&t[x..x + cols], &r[..cols]),
                _ => break,
            };
            for (&a, &b) in tgt_row.iter().zip(ref_row) {
                overlap.sum += a.distance(b);
            }
            overlap.count += cols;
        }
        overlap
    }
}
