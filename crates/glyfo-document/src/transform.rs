// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coordinate transformer — maps OCR polygons from raster pixels into page
// output space and back.

use glyfo_core::{GlyfoError, Quad, Result};

use crate::raster::Raster;

/// Raster pixels to page points through the raster's single composed affine.
/// Mirrored placements are re-wound so the result is clockwise.
pub fn to_page(polygon: &Quad, raster: &Raster) -> Quad {
    polygon.map(&raster.to_page).normalize_winding()
}

/// Page points back to raster pixels.
pub fn to_raster(quad: &Quad, raster: &Raster) -> Result<Quad> {
    let inverse = raster
        .to_page
        .invert()
        .ok_or_else(|| GlyfoError::ImageError("raster transform is not invertible".into()))?;
    Ok(quad.map(&inverse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyfo_core::{Matrix, Point};
    use image::DynamicImage;

    use crate::raster::pixel_to_unit;

    fn raster(to_page: Matrix) -> Raster {
        Raster {
            image: DynamicImage::new_rgb8(1, 1),
            scale_x: 1.0,
            scale_y: 1.0,
            to_page,
        }
    }

    fn assert_close(a: &Quad, b: &Quad) {
        for (p, q) in a.points().iter().zip(b.points()) {
            assert!(p.distance(*q) < 1e-6, "{p:?} != {q:?}");
        }
    }

    #[test]
    fn placed_image_maps_into_its_box() {
        // 400x200 px image upscaled 2x, drawn at 100..300 x 500..600 on a
        // 612x792 page.
        let ctm = Matrix::new(200.0, 0.0, 0.0, 100.0, 100.0, 500.0);
        let flip = Matrix::new(1.0, 0.0, 0.0, -1.0, 0.0, 792.0);
        let to_page = Matrix::scale(0.5, 0.5).then(&pixel_to_unit(400, 200)).then(&ctm).then(&flip);

        let whole = Quad::from_rect(0.0, 0.0, 800.0, 400.0);
        let mapped = to_page_quad(&whole, to_page);
        let bounds = mapped.bounds();
        assert!((bounds.x0 - 100.0).abs() < 1e-9);
        assert!((bounds.x1 - 300.0).abs() < 1e-9);
        assert!((bounds.y0 - 192.0).abs() < 1e-9);
        assert!((bounds.y1 - 292.0).abs() < 1e-9);
        assert!(mapped.signed_area() > 0.0);
    }

    fn to_page_quad(quad: &Quad, m: Matrix) -> Quad {
        to_page(quad, &raster(m))
    }

    #[test]
    fn round_trip_is_exact() {
        let rotated = Matrix::new(0.0, 37.5, -12.25, 0.0, 310.5, 44.0)
            .then(&Matrix::new(1.0, 0.0, 0.0, -1.0, 0.0, 792.0));
        let r = raster(Matrix::scale(1.0 / 1.7, 1.0 / 2.3).then(&rotated));
        let polygon = Quad::new(
            Point::new(12.0, 8.0),
            Point::new(96.5, 9.25),
            Point::new(95.0, 30.0),
            Point::new(11.0, 28.75),
        );

        let page = to_page(&polygon, &r);
        let back = to_raster(&page, &r).unwrap();
        // Winding normalization may have swapped corners; compare as sets.
        let mut expected: Vec<_> = polygon.points().to_vec();
        let mut got: Vec<_> = back.points().to_vec();
        let key = |p: &Point| (p.x * 1e3).round() as i64 * 1_000_000 + (p.y * 1e3).round() as i64;
        expected.sort_by_key(key);
        got.sort_by_key(key);
        assert_close(&Quad([expected[0], expected[1], expected[2], expected[3]]), &Quad([got[0], got[1], got[2], got[3]]));
    }

    #[test]
    fn unmirrored_round_trip_keeps_corner_order() {
        let r = raster(Matrix::new(0.24, 0.0, 0.0, 0.24, 0.0, 0.0));
        let polygon = Quad::from_rect(10.0, 20.0, 110.0, 45.0);
        let back = to_raster(&to_page(&polygon, &r), &r).unwrap();
        assert_close(&polygon, &back);
    }

    #[test]
    fn mirrored_placement_is_rewound() {
        let r = raster(Matrix::new(-1.0, 0.0, 0.0, 1.0, 100.0, 0.0));
        let out = to_page(&Quad::from_rect(10.0, 10.0, 30.0, 20.0), &r);
        assert!(out.signed_area() > 0.0);
    }

    #[test]
    fn singular_transform_cannot_invert() {
        let r = raster(Matrix::scale(0.0, 1.0));
        assert!(to_raster(&Quad::default(), &r).is_err());
    }
}
