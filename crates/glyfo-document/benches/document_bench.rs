// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the per-region hot paths in glyfo-document: word
// splitting and raster-to-page coordinate mapping.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::DynamicImage;

use glyfo_core::{Matrix, Point, Quad, RegionSource, TextRegion};
use glyfo_document::WordSplitter;
use glyfo_document::raster::{Raster, pixel_to_unit};
use glyfo_document::transform;

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Split a slightly rotated 12-word invoice line into words.
fn bench_word_split(c: &mut Criterion) {
    let line = TextRegion::recognized(
        Quad::new(
            Point::new(72.0, 100.0),
            Point::new(540.0, 96.0),
            Point::new(540.1, 110.0),
            Point::new(72.1, 114.0),
        ),
        "Factura 0042 emitida el 12/03/2024 por un total de 1.250,00 EUR IVA incluido",
        0.91,
        RegionSource::OcrFromImage,
    );
    let splitter = WordSplitter::default();

    c.bench_function("word_split (12 tokens)", |b| {
        b.iter(|| black_box(splitter.split(black_box(&line))));
    });
}

/// Map 1000 OCR polygons from an upscaled embedded image into page space.
fn bench_to_page(c: &mut Criterion) {
    let ctm = Matrix::new(200.0, 0.0, 0.0, 100.0, 100.0, 500.0);
    let flip = Matrix::new(1.0, 0.0, 0.0, -1.0, 0.0, 792.0);
    let raster = Raster {
        image: DynamicImage::new_rgb8(1, 1),
        scale_x: 2.0,
        scale_y: 2.0,
        to_page: Matrix::scale(0.5, 0.5).then(&pixel_to_unit(400, 200)).then(&ctm).then(&flip),
    };
    let polygons: Vec<Quad> = (0..1000)
        .map(|i| {
            let y = f64::from(i % 40) * 10.0;
            Quad::from_rect(8.0, y, 720.0, y + 9.0)
        })
        .collect();

    c.bench_function("to_page (1000 polygons)", |b| {
        b.iter(|| {
            for polygon in &polygons {
                black_box(transform::to_page(black_box(polygon), &raster));
            }
        });
    });
}

criterion_group!(benches, bench_word_split, bench_to_page);
criterion_main!(benches);
