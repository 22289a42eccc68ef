// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// glyfo-document — PDF to coordinate-annotated text.
//
// Classifies a PDF's pages, extracts the native text layer, rasterizes
// embedded images or whole pages for OCR, maps recognized lines back into
// page coordinates, splits lines into words, and writes JSON, overlay PDFs
// and visualizations.

pub mod aggregate;
pub mod classify;
pub mod clock;
pub mod extract;
pub mod image;
pub mod ocr;
pub mod output;
pub mod pdf;
pub mod pipeline;
pub mod profile;
pub mod raster;
pub mod transform;
pub mod validate;
pub mod visualize;
pub mod words;

// Re-export the primary structs so callers can use `glyfo_document::Pipeline` etc.
pub use classify::{Classification, DocumentClassifier};
pub use clock::{CancellationToken, Clock, ManualClock, SystemClock};
pub use extract::NativeExtractor;
pub use self::image::ImageProcessor;
pub use ocr::{LazyRecognizer, OcrLine, TextRecognizer, UnavailableRecognizer};
pub use output::{OutputFiles, OutputWriter};
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfWriter;
pub use pipeline::Pipeline;
pub use profile::{NoopObserver, StageObserver, StageProfiler};
pub use raster::{CompositingRenderer, PageRenderer, Raster, Rasterizer};
pub use validate::InputValidator;
pub use words::WordSplitter;

#[cfg(feature = "ocr")]
pub use ocr::{OcrConfig, OcrEngine};
