// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR adapter — the recognizer seam used by the pipeline, plus lazy and
// unavailable implementations. The `ocrs`-backed engine lives behind the
// `ocr` feature.

use std::sync::OnceLock;

use glyfo_core::{GlyfoError, Quad, Result};
use image::DynamicImage;
use tracing::{info, warn};

#[cfg(feature = "ocr")]
pub mod engine;

#[cfg(feature = "ocr")]
pub use engine::{OcrConfig, OcrEngine};

/// One recognized line, with its polygon in raster pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrLine {
    pub polygon: Quad,
    pub text: String,
    /// In `[0, 1]`.
    pub confidence: f32,
}

/// Recognizes text lines in a raster. Synchronous and blocking.
pub trait TextRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrLine>>;
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for Box<T> {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrLine>> {
        (**self).recognize(image)
    }
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for &T {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrLine>> {
        (**self).recognize(image)
    }
}

type Factory = Box<dyn Fn() -> Result<Box<dyn TextRecognizer>>>;

/// Builds the wrapped recognizer on first use, so documents that never need
/// OCR never load models. A construction failure is remembered and reported
/// on every call.
pub struct LazyRecognizer {
    factory: Factory,
    inner: OnceLock<std::result::Result<Box<dyn TextRecognizer>, String>>,
}

impl LazyRecognizer {
    pub fn new(factory: impl Fn() -> Result<Box<dyn TextRecognizer>> + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            inner: OnceLock::new(),
        }
    }

    /// Whether construction has been attempted.
    pub fn is_initialized(&self) -> bool {
        self.inner.get().is_some()
    }
}

impl TextRecognizer for LazyRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrLine>> {
        let inner = self.inner.get_or_init(|| {
            info!("initialising OCR engine on first use");
            (self.factory)().map_err(|err| {
                warn!(error = %err, "OCR engine unavailable");
                err.to_string()
            })
        });
        match inner {
            Ok(recognizer) => recognizer.recognize(image),
            Err(reason) => Err(GlyfoError::OcrError(reason.clone())),
        }
    }
}

/// Stands in when no engine was compiled in or configured.
#[derive(Debug, Clone)]
pub struct UnavailableRecognizer {
    reason: String,
}

impl UnavailableRecognizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl Default for UnavailableRecognizer {
    fn default() -> Self {
        Self::new("glyfo was built without the `ocr` feature")
    }
}

impl TextRecognizer for UnavailableRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<OcrLine>> {
        Err(GlyfoError::OcrError(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Fixed;

    impl TextRecognizer for Fixed {
        fn recognize(&self, _image: &DynamicImage) -> Result<Vec<OcrLine>> {
            Ok(vec![OcrLine {
                polygon: Quad::from_rect(0.0, 0.0, 10.0, 5.0),
                text: "ok".into(),
                confidence: 0.9,
            }])
        }
    }

    fn blank() -> DynamicImage {
        DynamicImage::new_rgb8(4, 4)
    }

    #[test]
    fn lazy_recognizer_builds_once() {
        let builds = Rc::new(Cell::new(0));
        let counter = Rc::clone(&builds);
        let lazy = LazyRecognizer::new(move || {
            counter.set(counter.get() + 1);
            Ok(Box::new(Fixed) as Box<dyn TextRecognizer>)
        });

        assert!(!lazy.is_initialized());
        assert_eq!(lazy.recognize(&blank()).unwrap().len(), 1);
        assert_eq!(lazy.recognize(&blank()).unwrap().len(), 1);
        assert_eq!(builds.get(), 1);
    }

    #[test]
    fn lazy_recognizer_remembers_failure() {
        let lazy = LazyRecognizer::new(|| Err(GlyfoError::OcrError("detection model not found".into())));
        for _ in 0..2 {
            match lazy.recognize(&blank()) {
                Err(GlyfoError::OcrError(reason)) => assert!(reason.contains("detection model")),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn unavailable_recognizer_errors() {
        assert!(matches!(
            UnavailableRecognizer::default().recognize(&blank()),
            Err(GlyfoError::OcrError(_))
        ));
    }
}
