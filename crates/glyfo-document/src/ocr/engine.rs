// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR engine backed by `ocrs`, a pure-Rust OCR engine running neural network
// models through `rten`.
//
// # Model Setup
//
// Two model files are required:
//
// - **Detection model** (`text-detection.rten`) — locates words in the image.
// - **Recognition model** (`text-recognition.rten`) — decodes characters of
//   each detected line.
//
// Running `ocrs-cli` once downloads both into the default cache directory,
// `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`).

use std::path::{Path, PathBuf};

use glyfo_core::{GlyfoError, Point, Quad, Result};
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams, TextItem};
use rten::Model;
use tracing::{debug, info, instrument};

use super::{OcrLine, TextRecognizer};

/// `ocrs` exposes no per-line probability.
const OCRS_CONFIDENCE: f32 = 1.0;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Model locations for an [`OcrEngine`].
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Both models from one directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<()> {
        for (kind, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(GlyfoError::OcrError(format!(
                    "{} model not found at {}; run `ocrs-cli` once to download models",
                    kind,
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Line-level OCR with layout.
///
/// Model loading is the expensive step; build the engine once per run (or
/// wrap it in a [`super::LazyRecognizer`]) and reuse it for every image.
/// `ocrs` and `rten` are very slow in debug builds.
pub struct OcrEngine {
    engine: OcrsEngine,
}

impl OcrEngine {
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: &OcrConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading OCR detection model");
        let detection_model = load_model(&config.detection_model_path, "detection")?;
        info!("Loading OCR recognition model");
        let recognition_model = load_model(&config.recognition_model_path, "recognition")?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| GlyfoError::OcrError(format!("failed to initialise OCR engine: {}", err)))?;

        info!("OCR engine initialised successfully");
        Ok(Self { engine })
    }

    /// Engine with models from the default cache directory.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&OcrConfig::default())
    }
}

fn load_model(path: &Path, kind: &str) -> Result<Model> {
    Model::load_file(path).map_err(|err| {
        GlyfoError::OcrError(format!(
            "failed to load {} model from {}: {}",
            kind,
            path.display(),
            err
        ))
    })
}

impl TextRecognizer for OcrEngine {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrLine>> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            GlyfoError::OcrError(format!("failed to create image source ({}x{}): {}", width, height, err))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| GlyfoError::OcrError(format!("OCR preprocessing failed: {}", err)))?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|err| GlyfoError::OcrError(format!("word detection failed: {}", err)))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        debug!(words = word_rects.len(), lines = line_rects.len(), "text lines found");

        let line_texts = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| GlyfoError::OcrError(format!("line recognition failed: {}", err)))?;

        let lines: Vec<OcrLine> = line_texts
            .iter()
            .flatten()
            .filter_map(|line| {
                let text = line.to_string();
                if text.trim().is_empty() {
                    return None;
                }
                let corners = line
                    .rotated_rect()
                    .corners()
                    .map(|p| Point::new(f64::from(p.x), f64::from(p.y)));
                Some(OcrLine {
                    polygon: Quad::from_unordered(corners),
                    text,
                    confidence: OCRS_CONFIDENCE,
                })
            })
            .collect();

        debug!(recognized = lines.len(), "OCR complete");
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_dir() {
        let config = OcrConfig::from_dir("/tmp/my-models");
        assert_eq!(config.detection_model_path, PathBuf::from("/tmp/my-models/text-detection.rten"));
        assert_eq!(config.recognition_model_path, PathBuf::from("/tmp/my-models/text-recognition.rten"));
    }

    #[test]
    fn missing_models_are_an_ocr_error() {
        let err = OcrEngine::new(&OcrConfig::from_dir("/nonexistent/glyfo-models")).err();
        assert!(matches!(err, Some(GlyfoError::OcrError(msg)) if msg.contains("detection model")));
    }
}
