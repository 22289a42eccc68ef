// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output generators — write the artifacts of a finished run. Only ever
// called with a complete Document.

use std::path::{Path, PathBuf};

use glyfo_core::{Document, OutputConfig, Result};
use tracing::{info, instrument, warn};

use crate::image::ImageProcessor;
use crate::pdf::overlay::{OverlayKind, OverlayWriter};
use crate::pdf::reader::PdfReader;
use crate::pdf::writer::PdfWriter;
use crate::profile::ProfileReport;
use crate::visualize::Visualizer;

const VISUALIZATION_DIR: &str = "annotated";
const PROFILE_DIR: &str = "profiles";

/// Paths written by one [`OutputWriter::write`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputFiles {
    pub json: Option<PathBuf>,
    pub annotated_pdf: Option<PathBuf>,
    pub searchable_pdf: Option<PathBuf>,
    pub editable_pdf: Option<PathBuf>,
    pub reconstructed_pdf: Option<PathBuf>,
    pub visualizations: Vec<PathBuf>,
    pub profile: Option<PathBuf>,
}

impl OutputFiles {
    pub fn all(&self) -> Vec<&Path> {
        [
            &self.json,
            &self.annotated_pdf,
            &self.searchable_pdf,
            &self.editable_pdf,
            &self.reconstructed_pdf,
            &self.profile,
        ]
        .into_iter()
        .flatten()
        .map(PathBuf::as_path)
        .chain(self.visualizations.iter().map(PathBuf::as_path))
        .collect()
    }
}

/// Writes the artifacts enabled in an [`OutputConfig`].
#[derive(Debug, Clone)]
pub struct OutputWriter {
    config: OutputConfig,
}

impl OutputWriter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    /// Writes every enabled artifact for `document`, whose source PDF is
    /// `source`. Output names derive from the source file stem.
    #[instrument(skip_all, fields(dir = %self.config.directory.display()))]
    pub fn write(&self, document: &Document, source: &Path, profile: Option<&ProfileReport>) -> Result<OutputFiles> {
        let dir = &self.config.directory;
        std::fs::create_dir_all(dir)?;
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let mut files = OutputFiles::default();

        if self.config.json {
            let path = dir.join(format!("{}.json", stem));
            std::fs::write(&path, document.to_json()?)?;
            files.json = Some(path);
        }

        let needs_source = self.config.annotated_pdf
            || self.config.searchable_pdf
            || self.config.editable_pdf
            || self.config.visualizations;
        if needs_source {
            let reader = PdfReader::open(source)?;
            let overlays = OverlayWriter::new(&reader);
            for (enabled, kind, slot) in [
                (self.config.annotated_pdf, OverlayKind::Annotated, &mut files.annotated_pdf),
                (self.config.searchable_pdf, OverlayKind::Searchable, &mut files.searchable_pdf),
                (self.config.editable_pdf, OverlayKind::Editable, &mut files.editable_pdf),
            ] {
                if enabled {
                    let path = dir.join(format!("{}_{}.pdf", stem, kind.file_suffix()));
                    std::fs::write(&path, overlays.render(document, kind)?)?;
                    *slot = Some(path);
                }
            }
            if self.config.visualizations {
                files.visualizations = self.write_visualizations(document, &reader)?;
            }
        }

        if self.config.reconstructed_pdf {
            let path = dir.join(format!("{}_reconstructed.pdf", stem));
            std::fs::write(&path, PdfWriter::default().reconstruct(document))?;
            files.reconstructed_pdf = Some(path);
        }

        if let (true, Some(report)) = (self.config.profile, profile) {
            let profile_dir = dir.join(PROFILE_DIR);
            std::fs::create_dir_all(&profile_dir)?;
            let path = profile_dir.join(format!("profile_{}.json", report.timestamp.format("%Y%m%d_%H%M%S")));
            std::fs::write(&path, report.to_json()?)?;
            files.profile = Some(path);
        }

        info!(files = files.all().len(), "outputs written");
        Ok(files)
    }

    /// Regenerates only the PDF overlays, e.g. from results loaded from JSON.
    pub fn write_overlays(&self, document: &Document, source: &Path) -> Result<OutputFiles> {
        let writer = OutputWriter::new(OutputConfig {
            json: false,
            visualizations: false,
            profile: false,
            ..self.config.clone()
        });
        writer.write(document, source, None)
    }

    fn write_visualizations(&self, document: &Document, reader: &PdfReader) -> Result<Vec<PathBuf>> {
        let dir = self.config.directory.join(VISUALIZATION_DIR);
        std::fs::create_dir_all(&dir)?;
        let visualizer = Visualizer::default();
        let mut written = Vec::new();
        for page in document.pages() {
            match visualizer.render(reader, page) {
                Ok(image) => {
                    let path = dir.join(format!("page_{}_annotated.png", page.page_num()));
                    ImageProcessor::from_dynamic(image).save(&path)?;
                    written.push(path);
                }
                Err(err) => warn!(page = page.page_num(), error = %err, "visualization skipped"),
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_lists_every_written_path() {
        let files = OutputFiles {
            json: Some(PathBuf::from("out/a.json")),
            editable_pdf: Some(PathBuf::from("out/a_editable.pdf")),
            visualizations: vec![PathBuf::from("out/annotated/page_1_annotated.png")],
            ..OutputFiles::default()
        };
        assert_eq!(files.all().len(), 3);
    }
}
