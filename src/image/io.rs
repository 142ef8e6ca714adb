//! Convenience helpers for loading images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Alpha is dropped on load.

use crate::image::{OwnedImage, Rgb};
use crate::util::{PixelSeekError, PixelSeekResult};
use std::path::Path;

/// Creates an owned RGB image from an `image::RgbImage` buffer.
pub fn owned_from_rgb_image(img: &image::RgbImage) -> PixelSeekResult<OwnedImage<Rgb>> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let data = img.pixels().map(|px| Rgb::from(px.0)).collect();
    OwnedImage::new(data, width, height)
}

/// Creates an owned RGB image from a dynamic image of any color type.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> PixelSeekResult<OwnedImage<Rgb>> {
    let rgb = img.to_rgb8();
    owned_from_rgb_image(&rgb)
}

/// Loads an image from disk and converts it to an owned RGB image.
pub fn load_rgb_image<P: AsRef<Path>>(path: P) -> PixelSeekResult<OwnedImage<Rgb>> {
    let img = image::open(path).map_err(|err| PixelSeekError::ImageIo {
        reason: err.to_string(),
    })?;
    owned_from_dynamic_image(&img)
}
