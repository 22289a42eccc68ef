// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rasterizer — produces OCR-ready rasters for embedded images and whole
// pages, each paired with the exact affine transform that maps its pixels
// back into page output space.

use glyfo_core::{GlyfoError, Matrix, PipelineConfig, Point, Result};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, instrument, warn};

use crate::image::{ImageProcessor, decode_image_xobject};
use crate::pdf::content::ImagePlacement;
use crate::pdf::reader::{PageGeometry, PdfReader};

/// Sources shrunk below this fraction by the page warp are pre-resampled.
const PRESAMPLE_BELOW: f64 = 0.75;

/// A raster plus its mapping into page space.
#[derive(Debug, Clone)]
pub struct Raster {
    pub image: DynamicImage,
    /// Raster pixels per source unit (image pixel or page point), per axis.
    pub scale_x: f64,
    pub scale_y: f64,
    /// Raster pixel coordinates to page output space (points, y down).
    pub to_page: Matrix,
}

impl Raster {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Maps an image's pixel grid onto the PDF unit square: pixel `(u, v)` with
/// `v` growing down lands on `(u / w, 1 - v / h)`.
pub fn pixel_to_unit(width: u32, height: u32) -> Matrix {
    let w = f64::from(width.max(1));
    let h = f64::from(height.max(1));
    Matrix::new(1.0 / w, 0.0, 0.0, -1.0 / h, 0.0, 1.0)
}

/// Renders whole pages.
pub trait PageRenderer {
    /// Renders `page` so its MediaBox fills exactly `width` x `height` pixels.
    fn render(&self, reader: &PdfReader, page: u32, width: u32, height: u32) -> Result<DynamicImage>;
}

/// Paints every image placed on the page onto a white canvas with its
/// placement matrix. Glyphs and vector paths are not drawn.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompositingRenderer;

impl PageRenderer for CompositingRenderer {
    #[instrument(skip(self, reader))]
    fn render(&self, reader: &PdfReader, page: u32, width: u32, height: u32) -> Result<DynamicImage> {
        let geometry = reader.page_geometry(page)?;
        let images = match reader.page_content(page) {
            Ok(content) => content.images,
            Err(err) if err.is_recoverable() => {
                warn!(page, error = %err, "content stream unreadable, rendering a blank page");
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        let page_to_raster = geometry.user_to_output().then(&Matrix::scale(
            f64::from(width) / geometry.width(),
            f64::from(height) / geometry.height(),
        ));

        let mut canvas = RgbaImage::from_pixel(width.max(1), height.max(1), Rgba([255, 255, 255, 255]));
        for placement in &images {
            let decoded = reader
                .image_stream(placement)
                .and_then(|stream| decode_image_xobject(reader.document(), stream));
            match decoded {
                Ok(image) => composite(&mut canvas, image, &placement.ctm.then(&page_to_raster)),
                Err(err) => warn!(page, image = %placement.name, error = %err, "image skipped while rendering page"),
            }
        }
        Ok(DynamicImage::ImageRgba8(canvas))
    }
}

/// Warps `image` through `unit_to_canvas` (unit square to canvas pixels) and
/// blends it over `canvas`.
fn composite(canvas: &mut RgbaImage, image: DynamicImage, unit_to_canvas: &Matrix) {
    // Shrink large sources first so the bilinear warp does not alias.
    let x_axis = Point::new(unit_to_canvas.a, unit_to_canvas.b);
    let y_axis = Point::new(unit_to_canvas.c, unit_to_canvas.d);
    let target_w = x_axis.distance(Point::default()).round().max(1.0);
    let target_h = y_axis.distance(Point::default()).round().max(1.0);
    let mut source = ImageProcessor::from_dynamic(image);
    if target_w < f64::from(source.width()) * PRESAMPLE_BELOW || target_h < f64::from(source.height()) * PRESAMPLE_BELOW {
        let w = (target_w as u32).min(source.width());
        let h = (target_h as u32).min(source.height());
        source = source.resize_exact(w, h);
    }
    let source = source.into_dynamic().to_rgba8();

    let to_canvas = pixel_to_unit(source.width(), source.height()).then(unit_to_canvas);
    let (sw, sh) = (f64::from(source.width()), f64::from(source.height()));
    let corners = [
        to_canvas.apply(Point::new(0.0, 0.0)),
        to_canvas.apply(Point::new(sw, 0.0)),
        to_canvas.apply(Point::new(sw, sh)),
        to_canvas.apply(Point::new(0.0, sh)),
    ];

    let x0 = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min).floor().max(0.0);
    let y0 = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min).floor().max(0.0);
    let x1 = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max).ceil().min(f64::from(canvas.width()));
    let y1 = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max).ceil().min(f64::from(canvas.height()));
    if x1 <= x0 || y1 <= y0 {
        debug!("image placed outside the page, skipped");
        return;
    }

    let src = [(0.0, 0.0), (sw as f32, 0.0), (sw as f32, sh as f32), (0.0, sh as f32)];
    let dest = corners.map(|p| ((p.x - x0) as f32, (p.y - y0) as f32));
    let Some(projection) = Projection::from_control_points(src, dest) else {
        debug!("degenerate image placement, skipped");
        return;
    };

    let mut tile = RgbaImage::new((x1 - x0) as u32, (y1 - y0) as u32);
    warp_into(&source, &projection, Interpolation::Bilinear, Rgba([0, 0, 0, 0]), &mut tile);
    image::imageops::overlay(canvas, &tile, x0 as i64, y0 as i64);
}

/// Builds rasters for OCR under the configured size policy.
pub struct Rasterizer {
    max_side: u32,
    render_dpi: u32,
    enable_upscaling: bool,
    min_image_size: u32,
    upscale_factor: f64,
    renderer: Box<dyn PageRenderer>,
}

impl Rasterizer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            max_side: config.max_side.max(1),
            render_dpi: config.render_dpi.max(1),
            enable_upscaling: config.enable_upscaling,
            min_image_size: config.min_image_size,
            upscale_factor: config.upscale_factor.max(1.0),
            renderer: Box::new(CompositingRenderer),
        }
    }

    /// Replaces the whole-page renderer.
    pub fn with_renderer(mut self, renderer: Box<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Target size for an embedded image of `width` x `height`: shrunk so the
    /// longer side fits `max_side`, or enlarged when small and upscaling is on.
    pub fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        let longer = f64::from(width.max(height).max(1));
        let max_side = f64::from(self.max_side);
        let factor = if longer > max_side {
            max_side / longer
        } else if self.enable_upscaling && longer < f64::from(self.min_image_size) {
            self.upscale_factor.min(max_side / longer).max(1.0)
        } else {
            1.0
        };
        (
            scaled_side(width, factor, self.max_side),
            scaled_side(height, factor, self.max_side),
        )
    }

    /// Raster of one embedded image and its pixel-to-page transform.
    #[instrument(skip(self, reader, placement, geometry), fields(image = %placement.name))]
    pub fn rasterize_image(&self, reader: &PdfReader, placement: &ImagePlacement, geometry: &PageGeometry) -> Result<Raster> {
        let stream = reader.image_stream(placement)?;
        let decoded = decode_image_xobject(reader.document(), stream)?;
        let (width, height) = (decoded.width(), decoded.height());

        let (target_w, target_h) = self.target_size(width, height);
        let upscaled = target_w > width || target_h > height;
        let mut processor = ImageProcessor::from_dynamic(decoded).resize_exact(target_w, target_h);
        if upscaled {
            processor = processor.sharpen();
        }
        let image = processor.to_rgb().into_dynamic();

        let scale_x = f64::from(target_w) / f64::from(width);
        let scale_y = f64::from(target_h) / f64::from(height);
        let to_page = Matrix::scale(1.0 / scale_x, 1.0 / scale_y)
            .then(&pixel_to_unit(width, height))
            .then(&placement.ctm)
            .then(&geometry.user_to_output());

        if !to_page.is_finite() || to_page.invert().is_none() {
            return Err(GlyfoError::ImageError(format!(
                "image {} has a degenerate placement matrix",
                placement.name
            )));
        }

        debug!(width, height, target_w, target_h, upscaled, "embedded image rasterized");
        Ok(Raster {
            image,
            scale_x,
            scale_y,
            to_page,
        })
    }

    /// Raster of the whole page at `render_dpi`, capped at `max_side`.
    #[instrument(skip(self, reader, geometry))]
    pub fn rasterize_page(&self, reader: &PdfReader, page: u32, geometry: &PageGeometry) -> Result<Raster> {
        let dpi_scale = f64::from(self.render_dpi) / 72.0;
        let full_w = geometry.width() * dpi_scale;
        let full_h = geometry.height() * dpi_scale;
        let cap = (f64::from(self.max_side) / full_w.max(full_h)).min(1.0);

        let width = ((full_w * cap).round() as u32).clamp(1, self.max_side);
        let height = ((full_h * cap).round() as u32).clamp(1, self.max_side);
        let image = self.renderer.render(reader, page, width, height)?;
        if image.width() != width || image.height() != height {
            return Err(GlyfoError::ImageError(format!(
                "renderer returned {}x{} for a {}x{} request",
                image.width(),
                image.height(),
                width,
                height
            )));
        }

        let scale_x = f64::from(width) / geometry.width();
        let scale_y = f64::from(height) / geometry.height();
        debug!(width, height, scale_x, scale_y, "page rasterized");
        Ok(Raster {
            image: ImageProcessor::from_dynamic(image).to_rgb().into_dynamic(),
            scale_x,
            scale_y,
            to_page: Matrix::scale(1.0 / scale_x, 1.0 / scale_y),
        })
    }
}

fn scaled_side(side: u32, factor: f64, max_side: u32) -> u32 {
    ((f64::from(side) * factor).round() as u32).clamp(1, max_side)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rasterizer(config: PipelineConfig) -> Rasterizer {
        Rasterizer::new(&config)
    }

    #[test]
    fn large_images_are_capped_at_max_side() {
        let r = rasterizer(PipelineConfig::default());
        assert_eq!(r.target_size(3000, 1500), (1000, 500));
        assert_eq!(r.target_size(1200, 2400), (500, 1000));
    }

    #[test]
    fn small_images_are_upscaled_within_max_side() {
        let r = rasterizer(PipelineConfig::default());
        assert_eq!(r.target_size(300, 200), (600, 400));
        // Doubling would exceed max_side, so the factor is capped.
        assert_eq!(r.target_size(800, 400), (1000, 500));
    }

    #[test]
    fn upscaling_can_be_disabled() {
        let r = rasterizer(PipelineConfig {
            enable_upscaling: false,
            ..PipelineConfig::default()
        });
        assert_eq!(r.target_size(300, 200), (300, 200));
    }

    #[test]
    fn pixel_to_unit_flips_rows() {
        let m = pixel_to_unit(200, 100);
        assert_eq!(m.apply(Point::new(0.0, 0.0)), Point::new(0.0, 1.0));
        assert_eq!(m.apply(Point::new(200.0, 100.0)), Point::new(1.0, 0.0));
    }

    #[test]
    fn composite_paints_placed_image() {
        let mut canvas = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let black = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255])));
        // Unit square onto canvas pixels 20..60 x 30..50.
        let unit_to_canvas = Matrix::new(40.0, 0.0, 0.0, -20.0, 20.0, 50.0);
        composite(&mut canvas, black, &unit_to_canvas);

        assert_eq!(canvas.get_pixel(40, 40), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(10, 10), &Rgba([255, 255, 255, 255]));
        assert_eq!(canvas.get_pixel(70, 40), &Rgba([255, 255, 255, 255]));
    }
}
