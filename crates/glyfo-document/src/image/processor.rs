// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — resampling and sharpening of rasters before OCR, and
// encoding of raster outputs. Operates on in-memory images using the
// `image` crate.

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use glyfo_core::{GlyfoError, Result};
use tracing::{debug, instrument};

/// Unsharp-mask radius applied after upscaling.
const SHARPEN_SIGMA: f32 = 1.0;
/// Minimum brightness difference the unsharp mask acts on.
const SHARPEN_THRESHOLD: i32 = 2;

/// Resampling pipeline operating on a single in-memory image.
///
/// Each method consumes `self` and returns a new `ImageProcessor` wrapping
/// the transformed image, enabling method chaining.
///
/// ```ignore
/// let raster = ImageProcessor::from_dynamic(decoded)
///     .resize_exact(800, 600)
///     .sharpen()
///     .into_dynamic();
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)
            .map_err(|err| GlyfoError::ImageError(format!("failed to decode image: {}", err)))?;
        debug!(width = img.width(), height = img.height(), "Image decoded from bytes");
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Resize to exactly `width` x `height` with Lanczos3. A no-op when the
    /// size already matches.
    #[instrument(skip(self), fields(width, height))]
    pub fn resize_exact(self, width: u32, height: u32) -> Self {
        if self.image.width() == width && self.image.height() == height {
            return self;
        }
        debug!(from_w = self.image.width(), from_h = self.image.height(), "Resizing image");
        let resized = self.image.resize_exact(width.max(1), height.max(1), FilterType::Lanczos3);
        Self { image: resized }
    }

    /// Unsharp mask, used to restore edges after upscaling.
    pub fn sharpen(self) -> Self {
        Self {
            image: self.image.unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD),
        }
    }

    /// Drop alpha and palette variants; OCR and the page compositor work on RGB.
    pub fn to_rgb(self) -> Self {
        match self.image {
            DynamicImage::ImageRgb8(_) => self,
            other => Self {
                image: DynamicImage::ImageRgb8(other.to_rgb8()),
            },
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Write the image to a file. The format is inferred from the file extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.image.save(path.as_ref()).map_err(|err| {
            GlyfoError::ImageError(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| GlyfoError::ImageError(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn checkerboard(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 { Luma([0]) } else { Luma([255]) }
        }))
    }

    #[test]
    fn resize_exact_sets_both_sides() {
        let out = ImageProcessor::from_dynamic(checkerboard(64, 32)).resize_exact(16, 8);
        assert_eq!((out.width(), out.height()), (16, 8));
    }

    #[test]
    fn sharpen_keeps_dimensions() {
        let out = ImageProcessor::from_dynamic(checkerboard(20, 10)).sharpen();
        assert_eq!((out.width(), out.height()), (20, 10));
    }

    #[test]
    fn png_round_trip() {
        let png = ImageProcessor::from_dynamic(checkerboard(8, 8)).to_rgb().to_png_bytes().unwrap();
        let decoded = ImageProcessor::from_bytes(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
    }

    #[test]
    fn undecodable_bytes_are_an_image_error() {
        assert!(matches!(ImageProcessor::from_bytes(b"nope"), Err(GlyfoError::ImageError(_))));
    }
}
