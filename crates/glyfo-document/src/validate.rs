// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input validation — enforces size and page limits before any page is read
// and produces non-blocking warnings for large inputs.

use std::path::Path;

use glyfo_core::{PipelineConfig, Result, SourceInfo, ValidationError};
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use crate::pdf::reader::PdfReader;

/// Rough CPU cost per page, used for the time estimate in warnings.
const SECONDS_PER_PAGE_ESTIMATE: f64 = 1.5;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// What validation learned about the input.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub source: SourceInfo,
    pub size_mb: f64,
    pub warnings: Vec<String>,
}

/// Checks an input file against the configured limits.
#[derive(Debug, Clone)]
pub struct InputValidator {
    max_file_size_mb: f64,
    max_pages: u32,
    warn_file_size_mb: f64,
    warn_pages: u32,
}

impl InputValidator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            max_file_size_mb: config.max_file_size_mb,
            max_pages: config.max_pages,
            warn_file_size_mb: config.warn_file_size_mb,
            warn_pages: config.warn_pages,
        }
    }

    /// Validates `path` and returns the opened document.
    ///
    /// The size limit is checked from file metadata, so an oversized file is
    /// rejected without being read.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn validate(&self, path: &Path) -> Result<(PdfReader, ValidationReport)> {
        if !path.is_file() {
            return Err(ValidationError::NotFound(path.to_path_buf()).into());
        }
        let size_bytes = std::fs::metadata(path)?.len();
        let size_mb = size_bytes as f64 / BYTES_PER_MB;
        if size_mb > self.max_file_size_mb {
            return Err(ValidationError::FileTooLarge {
                size_mb,
                max_mb: self.max_file_size_mb,
            }
            .into());
        }

        let bytes = std::fs::read(path)?;
        let reader = PdfReader::from_bytes(&bytes)
            .map_err(|err| ValidationError::Unreadable(err.to_string()))?
            .with_source_path(path);
        let page_count = reader.page_count();
        if page_count == 0 {
            return Err(ValidationError::EmptyDocument.into());
        }
        if page_count > self.max_pages {
            return Err(ValidationError::TooManyPages {
                pages: page_count,
                max_pages: self.max_pages,
            }
            .into());
        }

        let warnings = self.warnings(size_mb, page_count);
        for warning in &warnings {
            warn!("{}", warning);
        }

        let source = SourceInfo {
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size_bytes,
            sha256: hex::encode(Sha256::digest(&bytes)),
            page_count,
        };
        info!(size_mb = format!("{:.2}", size_mb), pages = page_count, "input validated");

        Ok((reader, ValidationReport { source, size_mb, warnings }))
    }

    fn warnings(&self, size_mb: f64, pages: u32) -> Vec<String> {
        let mut warnings = Vec::new();
        if size_mb > self.warn_file_size_mb {
            warnings.push(format!(
                "large file ({:.1} MB): processing may take several minutes",
                size_mb
            ));
        }
        if pages > self.warn_pages {
            let minutes = f64::from(pages) * SECONDS_PER_PAGE_ESTIMATE / 60.0;
            warnings.push(format!("{} pages: estimated processing time ~{:.1} minutes", pages, minutes));
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyfo_core::GlyfoError;
    use lopdf::{Document, Object, dictionary};

    fn pdf_with_pages(count: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..count)
            .map(|_| {
                doc.add_object(dictionary! { "Type" => "Page", "Parent" => pages_id })
                    .into()
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count as i64,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn write(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn missing_file_is_not_found() {
        let validator = InputValidator::new(&PipelineConfig::default());
        let err = validator.validate(Path::new("/nonexistent/input.pdf")).err();
        assert!(matches!(err, Some(GlyfoError::Validation(ValidationError::NotFound(_)))));
    }

    #[test]
    fn oversized_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        // Not even a PDF: the size check must come first.
        let path = write(&dir, "big.pdf", &vec![b'x'; 2 * 1024 * 1024]);
        let config = PipelineConfig {
            max_file_size_mb: 1.0,
            ..PipelineConfig::default()
        };
        let err = InputValidator::new(&config).validate(&path).err();
        assert!(matches!(
            err,
            Some(GlyfoError::Validation(ValidationError::FileTooLarge { max_mb, .. })) if max_mb == 1.0
        ));
    }

    #[test]
    fn garbage_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "junk.pdf", b"definitely not a pdf");
        let err = InputValidator::new(&PipelineConfig::default()).validate(&path).err();
        assert!(matches!(err, Some(GlyfoError::Validation(ValidationError::Unreadable(_)))));
    }

    #[test]
    fn page_limits_and_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "five.pdf", &pdf_with_pages(5));

        let strict = PipelineConfig {
            max_pages: 4,
            ..PipelineConfig::default()
        };
        let err = InputValidator::new(&strict).validate(&path).err();
        assert!(matches!(
            err,
            Some(GlyfoError::Validation(ValidationError::TooManyPages { pages: 5, max_pages: 4 }))
        ));

        let chatty = PipelineConfig {
            warn_pages: 2,
            ..PipelineConfig::default()
        };
        let (reader, report) = InputValidator::new(&chatty).validate(&path).unwrap();
        assert_eq!(reader.page_count(), 5);
        assert_eq!(report.source.page_count, 5);
        assert_eq!(report.source.file_name, "five.pdf");
        assert_eq!(report.source.sha256.len(), 64);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("5 pages"));
    }
}
