// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document classifier — decides per page whether the text layer, OCR of
// embedded images, or OCR of the whole page applies, and derives the
// document-level type. Pure inspection; nothing is written.

use glyfo_core::{ClassificationSummary, PageClass, PdfType, PipelineConfig, Result};
use tracing::{debug, info, instrument, warn};

use crate::pdf::content::PageContent;
use crate::pdf::reader::PdfReader;

/// What the classifier saw on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageProfile {
    pub page_num: u32,
    /// Non-whitespace characters in the text layer.
    pub text_chars: usize,
    /// Image XObjects drawn on the page (including inside forms).
    pub image_count: usize,
    pub class: PageClass,
    /// Set when the content stream could not be interpreted.
    pub inspect_error: Option<String>,
}

impl PageProfile {
    pub fn has_images(&self) -> bool {
        self.image_count > 0
    }
}

/// Per-page profiles plus the document type.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub pdf_type: PdfType,
    pub pages: Vec<PageProfile>,
}

impl Classification {
    pub fn page(&self, page_num: u32) -> Option<&PageProfile> {
        self.pages.iter().find(|p| p.page_num == page_num)
    }

    pub fn summary(&self) -> ClassificationSummary {
        ClassificationSummary {
            total_pages: self.pages.len() as u32,
            pages_with_text: self.pages.iter().filter(|p| p.class != PageClass::Scanned).count() as u32,
            pages_with_images: self.pages.iter().filter(|p| p.has_images()).count() as u32,
            description: self.pdf_type.description().to_string(),
        }
    }
}

/// Classifies documents and pages.
#[derive(Debug, Clone)]
pub struct DocumentClassifier {
    min_text_chars: usize,
}

impl DocumentClassifier {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            min_text_chars: config.min_native_text_chars.max(1),
        }
    }

    /// Profiles every page and derives the document type.
    #[instrument(skip_all, fields(pages = reader.page_count()))]
    pub fn classify(&self, reader: &PdfReader) -> Result<Classification> {
        let mut pages = Vec::new();
        for page_num in reader.page_numbers() {
            let profile = match reader.page_content(page_num) {
                Ok(content) => self.profile(page_num, &content),
                Err(err) if err.is_recoverable() => {
                    warn!(page = page_num, error = %err, "content stream unreadable, treating page as scanned");
                    PageProfile {
                        page_num,
                        text_chars: 0,
                        image_count: 0,
                        class: PageClass::Scanned,
                        inspect_error: Some(err.to_string()),
                    }
                }
                Err(err) => return Err(err),
            };
            debug!(
                page = page_num,
                text_chars = profile.text_chars,
                images = profile.image_count,
                class = ?profile.class,
                "page classified"
            );
            pages.push(profile);
        }

        let classes: Vec<PageClass> = pages.iter().map(|p| p.class).collect();
        let pdf_type = document_type(&classes);
        info!(pdf_type = %pdf_type, pages = pages.len(), "document classified");

        Ok(Classification { pdf_type, pages })
    }

    /// Classifies one interpreted page.
    pub fn profile(&self, page_num: u32, content: &PageContent) -> PageProfile {
        let text_chars = content.text_chars();
        let image_count = content.images.len();
        PageProfile {
            page_num,
            text_chars,
            image_count,
            class: PageClass::from_content(text_chars >= self.min_text_chars, image_count > 0),
            inspect_error: None,
        }
    }
}

/// Document type from page classes: all native → `native_text`, all
/// scanned → `scanned`, anything else (including all three kinds at once)
/// → `text_and_images`.
pub fn document_type(classes: &[PageClass]) -> PdfType {
    if classes.is_empty() || classes.iter().all(|c| *c == PageClass::Scanned) {
        PdfType::Scanned
    } else if classes.iter().all(|c| *c == PageClass::Native) {
        PdfType::NativeText
    } else {
        PdfType::TextAndImages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::content::{ImagePlacement, TextRun};
    use glyfo_core::{Matrix, Quad};

    fn content(text: &str, images: usize) -> PageContent {
        PageContent {
            runs: vec![TextRun {
                text: text.into(),
                quad: Quad::from_rect(0.0, 0.0, 10.0, 10.0),
                font_size: 10.0,
            }],
            images: (0..images)
                .map(|index| ImagePlacement {
                    index,
                    name: format!("Im{index}"),
                    object_id: None,
                    ctm: Matrix::identity(),
                })
                .collect(),
        }
    }

    #[test]
    fn document_type_table() {
        use PageClass::*;
        assert_eq!(document_type(&[Native, Native]), PdfType::NativeText);
        assert_eq!(document_type(&[Scanned, Scanned]), PdfType::Scanned);
        assert_eq!(document_type(&[Native, Mixed]), PdfType::TextAndImages);
        assert_eq!(document_type(&[Native, Scanned]), PdfType::TextAndImages);
        assert_eq!(document_type(&[Mixed]), PdfType::TextAndImages);
        assert_eq!(document_type(&[Native, Mixed, Scanned]), PdfType::TextAndImages);
    }

    #[test]
    fn page_profiles() {
        let classifier = DocumentClassifier::new(&PipelineConfig::default());
        assert_eq!(classifier.profile(1, &content("Factura", 0)).class, PageClass::Native);
        assert_eq!(classifier.profile(1, &content("Factura", 2)).class, PageClass::Mixed);
        assert_eq!(classifier.profile(1, &content("   ", 1)).class, PageClass::Scanned);
    }

    #[test]
    fn text_threshold_is_configurable() {
        let config = PipelineConfig {
            min_native_text_chars: 50,
            ..PipelineConfig::default()
        };
        let classifier = DocumentClassifier::new(&config);
        let profile = classifier.profile(3, &content("page 3", 1));
        assert_eq!(profile.text_chars, 5);
        assert_eq!(profile.class, PageClass::Scanned);
    }
}
