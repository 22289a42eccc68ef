// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Glyfo text pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::geometry::Quad;

/// Unique identifier for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a text region came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSource {
    /// Read from the PDF's own text layer.
    Native,
    /// OCR on a raster image embedded in the page.
    OcrFromImage,
    /// OCR on a rendering of the whole page.
    Scanned,
}

impl RegionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::OcrFromImage => "ocr_from_image",
            Self::Scanned => "scanned",
        }
    }
}

/// Document-level classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfType {
    /// Every page has a text layer and no page places images.
    NativeText,
    /// Any other combination of text and images.
    TextAndImages,
    /// No page has extractable text.
    Scanned,
}

impl PdfType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NativeText => "native_text",
            Self::TextAndImages => "text_and_images",
            Self::Scanned => "scanned",
        }
    }

    /// Short explanation of the processing strategy, used in summaries.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NativeText => "native text only (no OCR needed)",
            Self::TextAndImages => "native text and images (OCR on images only)",
            Self::Scanned => "scanned document (full OCR)",
        }
    }
}

impl std::fmt::Display for PdfType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page-level classification driving the per-page strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageClass {
    /// Text layer, no placed images.
    Native,
    /// Text layer plus placed images.
    Mixed,
    /// No extractable text.
    Scanned,
}

impl PageClass {
    pub fn from_content(has_text: bool, has_images: bool) -> Self {
        match (has_text, has_images) {
            (true, false) => Self::Native,
            (true, true) => Self::Mixed,
            (false, _) => Self::Scanned,
        }
    }
}

/// A piece of recognized or extracted text with its page-space polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub bbox: Quad,
    pub text: String,
    /// In `[0, 1]`; native text is always `1.0`.
    pub confidence: f32,
    pub source: RegionSource,
    /// Whether the region holds a single word (the output of word splitting).
    #[serde(default)]
    pub is_word: bool,
}

impl TextRegion {
    /// A line-level region from the PDF text layer.
    pub fn native(bbox: Quad, text: impl Into<String>) -> Self {
        Self {
            bbox,
            text: text.into(),
            confidence: 1.0,
            source: RegionSource::Native,
            is_word: false,
        }
    }

    /// A line-level region produced by OCR.
    pub fn recognized(bbox: Quad, text: impl Into<String>, confidence: f32, source: RegionSource) -> Self {
        Self {
            bbox,
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            source,
            is_word: false,
        }
    }
}

/// One processed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    page_num: u32,
    width: f64,
    height: f64,
    page_type: PageClass,
    text_regions: Vec<TextRegion>,
    full_text: String,
}

impl Page {
    pub fn new(page_num: u32, width: f64, height: f64, page_type: PageClass, text_regions: Vec<TextRegion>) -> Self {
        let full_text = text_regions
            .iter()
            .map(|r| r.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            page_num,
            width,
            height,
            page_type,
            text_regions,
            full_text,
        }
    }

    /// 1-based page number.
    pub fn page_num(&self) -> u32 {
        self.page_num
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Strategy actually applied (after any downgrade).
    pub fn page_type(&self) -> PageClass {
        self.page_type
    }

    pub fn text_regions(&self) -> &[TextRegion] {
        &self.text_regions
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }
}

/// Facts about the input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub file_name: String,
    pub size_bytes: u64,
    /// Hex SHA-256 of the input bytes.
    pub sha256: String,
    pub page_count: u32,
}

/// Classification totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSummary {
    pub total_pages: u32,
    pub pages_with_text: u32,
    pub pages_with_images: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub pdf_type: PdfType,
    pub timestamp: DateTime<Utc>,
    /// Effective configuration for this run.
    pub config: PipelineConfig,
    pub run_id: RunId,
    pub source: SourceInfo,
    pub summary: ClassificationSummary,
    /// Recoverable failures (downgraded pages, skipped images) in order.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// The complete, immutable result of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    metadata: DocumentMetadata,
    pages: Vec<Page>,
}

impl Document {
    pub fn new(metadata: DocumentMetadata, pages: Vec<Page>) -> Self {
        Self { metadata, pages }
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    pub fn pdf_type(&self) -> PdfType {
        self.metadata.pdf_type
    }

    /// Pages in page-number order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, page_num: u32) -> Option<&Page> {
        self.pages.iter().find(|p| p.page_num == page_num)
    }

    pub fn region_count(&self) -> usize {
        self.pages.iter().map(|p| p.text_regions.len()).sum()
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
