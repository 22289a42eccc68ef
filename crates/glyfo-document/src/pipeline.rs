// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline driver — validates the input, classifies it, routes every page
// through native extraction and/or OCR, and assembles the Document.
//
// Processing is sequential. A cooperative checkpoint before each page
// enforces the time budget and cancellation; on failure the partial result
// is dropped and nothing is written.

use std::path::Path;

use chrono::Utc;
use glyfo_core::{
    Document, DocumentMetadata, GlyfoError, Page, PageClass, PipelineConfig, RegionSource, Result, RunId, ScanMode,
    TextRegion,
};
use tracing::{debug, info, instrument, warn};

use crate::aggregate::{PageDraft, ResultAggregator};
use crate::classify::{DocumentClassifier, PageProfile, document_type};
use crate::clock::{CancellationToken, Clock, Deadline, SystemClock};
use crate::extract::NativeExtractor;
use crate::ocr::TextRecognizer;
use crate::pdf::content::ImagePlacement;
use crate::pdf::reader::{PageGeometry, PdfReader};
use crate::profile::{NoopObserver, Stage, StageObserver, timed};
use crate::raster::{PageRenderer, Raster, Rasterizer};
use crate::transform;
use crate::validate::InputValidator;
use crate::words::WordSplitter;

/// End-to-end processor for one configuration.
pub struct Pipeline {
    config: PipelineConfig,
    validator: InputValidator,
    classifier: DocumentClassifier,
    extractor: NativeExtractor,
    rasterizer: Rasterizer,
    splitter: Option<WordSplitter>,
    recognizer: Box<dyn TextRecognizer>,
    clock: Box<dyn Clock>,
    cancel: Option<CancellationToken>,
}

impl Pipeline {
    /// Fails with [`GlyfoError::Config`] when `config` is inconsistent.
    pub fn new(config: PipelineConfig, recognizer: Box<dyn TextRecognizer>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            validator: InputValidator::new(&config),
            classifier: DocumentClassifier::new(&config),
            extractor: NativeExtractor::new(),
            rasterizer: Rasterizer::new(&config),
            splitter: config
                .split_by_words
                .then(|| WordSplitter::new(config.word_spacing_factor)),
            recognizer,
            clock: Box::new(SystemClock::start()),
            cancel: None,
            config,
        })
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn PageRenderer>) -> Self {
        self.rasterizer = self.rasterizer.with_renderer(renderer);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn process(&self, path: &Path) -> Result<Document> {
        self.process_observed(path, &NoopObserver)
    }

    /// Runs the whole pipeline, reporting stage timings to `observer`.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn process_observed(&self, path: &Path, observer: &dyn StageObserver) -> Result<Document> {
        let deadline = Deadline::start(
            self.clock.as_ref(),
            self.config.processing_budget(),
            self.cancel.as_ref(),
        );
        let (reader, report) = timed(observer, Stage::Validate, None, || self.validator.validate(path))?;

        let classification = timed(observer, Stage::Classify, None, || self.classifier.classify(&reader))?;
        observer.document_info(classification.pdf_type, reader.page_count(), report.source.size_bytes);

        let mut warnings = report.warnings.clone();
        let mut aggregator = ResultAggregator::new(reader.page_numbers());
        for profile in &classification.pages {
            deadline.check(profile.page_num)?;
            let page = self.process_page(&reader, profile, &mut warnings, observer)?;
            info!(
                page = page.page_num(),
                class = ?page.page_type(),
                regions = page.text_regions().len(),
                "page processed"
            );
            timed(observer, Stage::Aggregate, Some(profile.page_num), || aggregator.submit(page))?;
        }
        // The last page's work counts against the budget too.
        if let Some(last) = classification.pages.last() {
            deadline.check(last.page_num)?;
        }
        let pages = aggregator.finish()?;

        let classes: Vec<PageClass> = pages.iter().map(Page::page_type).collect();
        let pdf_type = document_type(&classes);
        let mut summary = classification.summary();
        summary.description = pdf_type.description().to_string();

        let document = Document::new(
            DocumentMetadata {
                pdf_type,
                timestamp: Utc::now(),
                config: self.config.clone(),
                run_id: RunId::new(),
                source: report.source,
                summary,
                warnings,
            },
            pages,
        );
        info!(
            pdf_type = %pdf_type,
            pages = document.pages().len(),
            regions = document.region_count(),
            elapsed_secs = deadline.elapsed().as_secs_f64(),
            "document processed"
        );
        Ok(document)
    }

    fn process_page(
        &self,
        reader: &PdfReader,
        profile: &PageProfile,
        warnings: &mut Vec<String>,
        observer: &dyn StageObserver,
    ) -> Result<Page> {
        let page_num = profile.page_num;
        let geometry = reader.page_geometry(page_num)?;
        let mut draft = PageDraft::new(page_num, geometry, profile.class);

        let content = match &profile.inspect_error {
            Some(reason) => {
                downgrade(page_num, reason, warnings);
                None
            }
            None => match timed(observer, Stage::NativeExtract, Some(page_num), || reader.page_content(page_num)) {
                Ok(content) => Some(content),
                Err(err) if err.is_recoverable() => {
                    downgrade(page_num, &err.to_string(), warnings);
                    None
                }
                Err(err) => return Err(err),
            },
        };

        match (profile.class, content) {
            (PageClass::Native, Some(content)) => {
                draft.push_native(self.extractor.lines(&content, &geometry));
            }
            (PageClass::Mixed, Some(content)) => {
                draft.push_native(self.extractor.lines(&content, &geometry));
                let regions = self.recognize_images(reader, page_num, &geometry, &content.images, warnings, observer);
                draft.push_ocr(regions);
            }
            (PageClass::Native | PageClass::Mixed, None) => {
                draft.set_page_type(PageClass::Scanned);
                draft.push_ocr(self.recognize_scanned(reader, page_num, &geometry, &[], warnings, observer));
            }
            (PageClass::Scanned, content) => {
                let images = content.map(|c| c.images).unwrap_or_default();
                draft.push_ocr(self.recognize_scanned(reader, page_num, &geometry, &images, warnings, observer));
            }
        }

        Ok(match &self.splitter {
            Some(splitter) => {
                draft.into_page_with(|regions| timed(observer, Stage::SplitWords, Some(page_num), || splitter.split_all(regions)))
            }
            None => draft.into_page(),
        })
    }

    /// OCR for a page without a usable text layer.
    fn recognize_scanned(
        &self,
        reader: &PdfReader,
        page_num: u32,
        geometry: &PageGeometry,
        images: &[ImagePlacement],
        warnings: &mut Vec<String>,
        observer: &dyn StageObserver,
    ) -> Vec<TextRegion> {
        if self.config.scan_mode == ScanMode::Auto && !images.is_empty() {
            return self.recognize_images(reader, page_num, geometry, images, warnings, observer);
        }
        let unit = format!("page {} render", page_num);
        let raster = timed(observer, Stage::Rasterize, Some(page_num), || {
            self.rasterizer.rasterize_page(reader, page_num, geometry)
        });
        self.recognize_unit(&unit, page_num, raster, RegionSource::Scanned, warnings, observer)
    }

    /// OCR of every placed image, in placement order.
    fn recognize_images(
        &self,
        reader: &PdfReader,
        page_num: u32,
        geometry: &PageGeometry,
        images: &[ImagePlacement],
        warnings: &mut Vec<String>,
        observer: &dyn StageObserver,
    ) -> Vec<TextRegion> {
        let mut regions = Vec::new();
        for placement in images {
            let unit = format!("page {} image {} ({})", page_num, placement.index, placement.name);
            let raster = timed(observer, Stage::Rasterize, Some(page_num), || {
                self.rasterizer.rasterize_image(reader, placement, geometry)
            });
            regions.extend(self.recognize_unit(&unit, page_num, raster, RegionSource::OcrFromImage, warnings, observer));
        }
        regions
    }

    /// Recognizes one raster. Any failure is confined to the unit: it is
    /// logged, recorded as a warning and yields no regions.
    fn recognize_unit(
        &self,
        unit: &str,
        page_num: u32,
        raster: Result<Raster>,
        source: RegionSource,
        warnings: &mut Vec<String>,
        observer: &dyn StageObserver,
    ) -> Vec<TextRegion> {
        let outcome = raster.and_then(|raster| {
            let lines = timed(observer, Stage::Recognize, Some(page_num), || self.recognizer.recognize(&raster.image))?;
            Ok((raster, lines))
        });
        let (raster, lines) = match outcome {
            Ok(ok) => ok,
            Err(err) => {
                let err = GlyfoError::Recognition {
                    unit: unit.to_string(),
                    reason: err.to_string(),
                };
                warn!(page = page_num, error = %err, "recognition unit skipped");
                warnings.push(err.to_string());
                return Vec::new();
            }
        };

        let total = lines.len();
        let regions: Vec<TextRegion> = lines
            .into_iter()
            .filter(|line| line.confidence >= self.config.min_confidence && !line.text.trim().is_empty())
            .map(|line| {
                let bbox = transform::to_page(&line.polygon, &raster);
                TextRegion::recognized(bbox, line.text.trim(), line.confidence, source)
            })
            .filter(|region| region.bbox.is_finite())
            .collect();
        debug!(unit, recognized = total, kept = regions.len(), "unit recognized");
        regions
    }
}

/// Records a page whose text layer could not be read.
fn downgrade(page_num: u32, reason: &str, warnings: &mut Vec<String>) {
    warn!(page = page_num, error = reason, "native extraction failed, page downgraded to scanned");
    warnings.push(format!("page {}: {}; processed as scanned", page_num, reason));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::UnavailableRecognizer;

    #[test]
    fn invalid_config_is_rejected() {
        let config = PipelineConfig {
            max_side: 0,
            ..PipelineConfig::default()
        };
        let result = Pipeline::new(config, Box::new(UnavailableRecognizer::default()));
        assert!(matches!(result, Err(GlyfoError::Config(_))));
    }

    #[test]
    fn splitting_follows_config() {
        let config = PipelineConfig {
            split_by_words: false,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(config, Box::new(UnavailableRecognizer::default())).unwrap();
        assert!(pipeline.splitter.is_none());
    }
}
