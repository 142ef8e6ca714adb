//! RGB pixels, borrowed image views and owned image buffers.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride.
//! The stride counts elements between the starts of consecutive rows, so a
//! stride larger than the width represents padded rows. Scanners only ever
//! read through views, which makes them cheap to copy into parallel tasks.

use crate::util::{PixelSeekError, PixelSeekResult};

#[cfg(feature = "image-io")]
pub mod io;

/// A 24-bit RGB pixel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);

    /// Creates a pixel from its three channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Unpacks a `0x(AA)RRGGBB` integer; the alpha byte is ignored.
    pub const fn from_packed(rgb: u32) -> Self {
        Self {
            r: (rgb >> 16) as u8,
            g: (rgb >> 8) as u8,
            b: rgb as u8,
        }
    }

    /// Packs the pixel as `0x00RRGGBB`.
    pub const fn to_packed(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Euclidean distance between two pixels in RGB space.
    #[inline]
    pub fn distance(self, other: Rgb) -> f64 {
        let dr = f64::from(self.r.abs_diff(other.r));
        let dg = f64::from(self.g.abs_diff(other.g));
        let db = f64::from(self.b.abs_diff(other.b));
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(value: [u8; 3]) -> Self {
        Self::new(value[0], value[1], value[2])
    }
}

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> PixelSeekResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> PixelSeekResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(PixelSeekError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns `width * height`, the number of addressable pixels.
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }
}

/// Owned, contiguous image buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T> OwnedImage<T> {
    /// Wraps a row-major buffer holding at least `width * height` elements.
    pub fn new(data: Vec<T>, width: usize, height: usize) -> PixelSeekResult<Self> {
        let needed = required_len(width, height, width)?;
        if data.len() < needed {
            return Err(PixelSeekError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the row-major pixel buffer.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Borrows the image as a view.
    pub fn view(&self) -> ImageView<'_, T> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }
}

impl<T: Copy> OwnedImage<T> {
    /// Creates an image with every pixel set to `value`.
    pub fn filled(width: usize, height: usize, value: T) -> PixelSeekResult<Self> {
        let len = required_len(width, height, width)?;
        Ok(Self {
            data: vec![value; len],
            width,
            height,
        })
    }

    /// Paints an axis-aligned rectangle, clipped to the image bounds.
    pub fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize, value: T) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        for row in y.min(y_end)..y_end {
            let start = row * self.width;
            self.data[start + x.min(x_end)..start + x_end].fill(value);
        }
    }

    /// Overwrites the pixel at `(x, y)`; out-of-bounds writes are ignored.
    pub fn put(&mut self, x: usize, y: usize, value: T) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> PixelSeekResult<usize> {
    if width == 0 || height == 0 {
        return Err(PixelSeekError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(PixelSeekError::InvalidStride { width, stride });
    }
    let needed = (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(PixelSeekError::InvalidDimensions { width, height })?;
    Ok(needed)
}

#[cfg(test)]
mod tests {
    use super::{OwnedImage, Rgb};

    #[test]
    fn packed_rgb_ignores_alpha() {
        let px = Rgb::from_packed(0xFF12_3456);
        assert_eq!(px, Rgb::new(0x12, 0x34, 0x56));
        assert_eq!(px.to_packed(), 0x0012_3456);
    }

    #[test]
    fn distance_is_euclidean_over_channels() {
        let a = Rgb::new(10, 20, 30);
        let b = Rgb::new(13, 24, 30);
        assert!((a.distance(b) - 5.0).abs() < 1e-12);
        assert_eq!(a.distance(b), b.distance(a));
        assert!((Rgb::BLACK.distance(Rgb::RED) - 255.0).abs() < 1e-12);
    }

    #[test]
    fn fill_rect_clips_to_bounds() {
        let mut img = OwnedImage::filled(4, 3, 0u8).unwrap();
        img.fill_rect(2, 1, 10, 10, 7);
        assert_eq!(img.data(), &[0, 0, 0, 0, 0, 0, 7, 7, 0, 0, 7, 7]);

        img.fill_rect(9, 9, 2, 2, 1);
        assert_eq!(img.data().iter().filter(|&&v| v == 1).count(), 0);
    }
}
