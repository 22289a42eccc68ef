// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Visualization — page composites with every region outlined in the color
// of its source.

use glyfo_core::{Page, Quad, Result};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_polygon_mut;
use imageproc::point::Point as PixelPoint;
use tracing::{debug, instrument};

use crate::pdf::overlay::source_color;
use crate::pdf::reader::PdfReader;
use crate::raster::{CompositingRenderer, PageRenderer};

/// Composite pixels per page point.
const DEFAULT_SCALE: f64 = 2.0;

/// Draws results over page composites.
pub struct Visualizer {
    scale: f64,
    renderer: Box<dyn PageRenderer>,
}

impl Default for Visualizer {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            renderer: Box::new(CompositingRenderer),
        }
    }
}

impl Visualizer {
    pub fn with_renderer(mut self, renderer: Box<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// The page composite with `page`'s regions outlined.
    #[instrument(skip_all, fields(page = page.page_num()))]
    pub fn render(&self, reader: &PdfReader, page: &Page) -> Result<DynamicImage> {
        let width = ((page.width() * self.scale).round() as u32).max(1);
        let height = ((page.height() * self.scale).round() as u32).max(1);
        let mut canvas = self.renderer.render(reader, page.page_num(), width, height)?.to_rgba8();

        for region in page.text_regions() {
            let [r, g, b] = source_color(region.source);
            let color = Rgba([channel(r), channel(g), channel(b), 255]);
            outline(&mut canvas, &region.bbox, self.scale, color);
        }
        debug!(regions = page.text_regions().len(), width, height, "page visualized");
        Ok(DynamicImage::ImageRgba8(canvas))
    }
}

/// Strokes `quad` twice, one pixel apart, so outlines stay visible at 2x.
fn outline(canvas: &mut RgbaImage, quad: &Quad, scale: f64, color: Rgba<u8>) {
    if !quad.is_finite() {
        return;
    }
    let mut points: Vec<PixelPoint<f32>> = quad
        .points()
        .iter()
        .map(|p| PixelPoint::new((p.x * scale) as f32, (p.y * scale) as f32))
        .collect();
    // Degenerate (zero-area) polygons have repeated vertices.
    points.dedup();
    if points.len() < 3 || points.first() == points.last() {
        return;
    }
    draw_hollow_polygon_mut(canvas, &points, color);
    let shifted: Vec<PixelPoint<f32>> = points.iter().map(|p| PixelPoint::new(p.x + 1.0, p.y + 1.0)).collect();
    draw_hollow_polygon_mut(canvas, &shifted, color);
}

fn channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_strokes_the_border_only() {
        let mut canvas = RgbaImage::from_pixel(100, 60, Rgba([255, 255, 255, 255]));
        let red = Rgba([255, 0, 0, 255]);
        outline(&mut canvas, &Quad::from_rect(10.0, 10.0, 40.0, 20.0), 2.0, red);

        assert_eq!(canvas.get_pixel(20, 20), &red);
        assert_eq!(canvas.get_pixel(50, 30), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn degenerate_quads_are_ignored() {
        let mut canvas = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        outline(&mut canvas, &Quad::default(), 2.0, Rgba([0, 0, 0, 255]));
        assert!(canvas.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn channels_scale_to_bytes() {
        assert_eq!(channel(0.5), 128);
        assert_eq!(channel(1.0), 255);
    }
}
