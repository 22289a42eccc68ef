// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.
//
// Built once (defaults, JSON file, CLI overrides) and handed to each stage's
// constructor. A snapshot is embedded in every output document.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GlyfoError, Result};

/// How pages without a text layer are turned into images for OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// OCR each placed image on its own; render the page only when it
    /// places no images.
    #[default]
    Auto,
    /// Always render the whole page.
    RenderPage,
}

/// Which output artifacts a run writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub json: bool,
    /// Colored polygon annotations over the original pages.
    pub annotated_pdf: bool,
    /// Invisible text layer over the original pages.
    pub searchable_pdf: bool,
    /// Visible text layer over the original pages.
    pub editable_pdf: bool,
    /// Text-only PDF rebuilt from the results.
    pub reconstructed_pdf: bool,
    /// PNG per page with the regions drawn.
    pub visualizations: bool,
    /// Stage timing report.
    pub profile: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output_ocr"),
            json: true,
            annotated_pdf: true,
            searchable_pdf: true,
            editable_pdf: true,
            reconstructed_pdf: false,
            visualizations: true,
            profile: true,
        }
    }
}

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // -- Limits --
    pub max_file_size_mb: f64,
    pub max_pages: u32,
    /// Wall-clock budget for the whole document, in seconds.
    pub max_processing_time_sec: u64,
    pub warn_file_size_mb: f64,
    pub warn_pages: u32,

    // -- Classification --
    /// Non-whitespace characters a page needs to count as having text.
    pub min_native_text_chars: usize,

    // -- Rasterization --
    /// Longest side, in pixels, of any raster handed to OCR.
    pub max_side: u32,
    /// Resolution for whole-page renders before the `max_side` cap.
    pub render_dpi: u32,
    pub scan_mode: ScanMode,
    /// Upscale small embedded images before OCR.
    pub enable_upscaling: bool,
    /// Images whose longer side is below this are upscaled.
    pub min_image_size: u32,
    pub upscale_factor: f64,

    // -- OCR --
    pub min_confidence: f32,

    // -- Word splitting --
    pub split_by_words: bool,
    /// Extra width per inter-word gap, in character units.
    pub word_spacing_factor: f64,

    pub output: OutputConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 50.0,
            max_pages: 100,
            max_processing_time_sec: 300,
            warn_file_size_mb: 20.0,
            warn_pages: 50,
            min_native_text_chars: 1,
            max_side: 1000,
            render_dpi: 300,
            scan_mode: ScanMode::Auto,
            enable_upscaling: true,
            min_image_size: 1000,
            upscale_factor: 2.0,
            min_confidence: 0.5,
            split_by_words: true,
            word_spacing_factor: 0.1,
            output: OutputConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads settings from a JSON file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the settings as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn processing_budget(&self) -> Duration {
        Duration::from_secs(self.max_processing_time_sec)
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        (self.max_file_size_mb * 1024.0 * 1024.0) as u64
    }

    /// Rejects settings no stage can honor.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_file_size_mb > 0.0) {
            return Err(GlyfoError::Config("max_file_size_mb must be positive".into()));
        }
        if self.max_pages == 0 {
            return Err(GlyfoError::Config("max_pages must be at least 1".into()));
        }
        if self.max_side == 0 {
            return Err(GlyfoError::Config("max_side must be at least 1 pixel".into()));
        }
        if self.render_dpi == 0 {
            return Err(GlyfoError::Config("render_dpi must be at least 1".into()));
        }
        if !(self.upscale_factor >= 1.0) {
            return Err(GlyfoError::Config(format!(
                "upscale_factor must be >= 1.0, got {}",
                self.upscale_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(GlyfoError::Config(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        if !(self.word_spacing_factor >= 0.0) {
            return Err(GlyfoError::Config(format!(
                "word_spacing_factor must not be negative, got {}",
                self.word_spacing_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_side, 1000);
        assert_eq!(config.processing_budget(), Duration::from_secs(300));
        assert_eq!(config.max_file_size_bytes(), 50 * 1024 * 1024);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"max_pages": 7, "scan_mode": "render_page", "output": {"json": false}}"#)
                .unwrap();
        assert_eq!(config.max_pages, 7);
        assert_eq!(config.scan_mode, ScanMode::RenderPage);
        assert!(!config.output.json);
        assert!(config.output.annotated_pdf);
        assert_eq!(config.min_confidence, 0.5);
    }

    #[test]
    fn invalid_confidence_is_rejected() {
        let config = PipelineConfig {
            min_confidence: 1.5,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(GlyfoError::Config(_))));
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("glyfo-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let config = PipelineConfig {
            split_by_words: false,
            ..PipelineConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(PipelineConfig::load(&path).unwrap(), config);

        std::fs::remove_dir_all(&dir).ok();
    }
}
