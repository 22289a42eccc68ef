// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the command line.
//
// Every technical error is mapped to a plain message with a concrete next
// step, so a failed run tells the operator which setting or input to change.

use crate::error::{GlyfoError, ValidationError};

/// Severity of an error from the operator's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth retrying as-is (I/O hiccup, OCR engine failure).
    Transient,
    /// A setting or the input has to change first.
    ActionRequired,
    /// The input cannot be processed.
    Permanent,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `GlyfoError` into a `HumanError`.
pub fn humanize_error(err: &GlyfoError) -> HumanError {
    match err {
        GlyfoError::Validation(validation) => humanize_validation(validation),

        GlyfoError::Timeout { page, elapsed_secs, limit_secs } => HumanError {
            message: format!("Processing stopped after {elapsed_secs:.0}s, before page {page}."),
            suggestion: format!(
                "Raise max_processing_time_sec (currently {limit_secs}) or split the PDF into smaller files. No output was written."
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        GlyfoError::Cancelled { .. } => HumanError {
            message: "Processing was cancelled.".into(),
            suggestion: "Run the command again to start over. No output was written.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        GlyfoError::Config(detail) => HumanError {
            message: "The configuration is not valid.".into(),
            suggestion: format!("Fix the setting in the config file or command line. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        GlyfoError::PageExtraction { page, .. } => HumanError {
            message: format!("The text layer of page {page} could not be read."),
            suggestion: "The page was processed with OCR instead; check its results.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        GlyfoError::Recognition { unit, .. } => HumanError {
            message: format!("Text recognition failed for {unit}."),
            suggestion: "Try again; if it keeps failing, check the OCR model files.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        GlyfoError::PdfError(_) => HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: "The file may be damaged or encrypted. Try re-saving it from a PDF viewer.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        GlyfoError::ImageError(_) => HumanError {
            message: "An image in this PDF could not be processed.".into(),
            suggestion: "The image may use an unsupported encoding (JPEG 2000, JBIG2, CCITT).".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        GlyfoError::OcrError(detail) => {
            if detail.contains("model") {
                HumanError {
                    message: "The OCR models could not be loaded.".into(),
                    suggestion: "Download text-detection.rten and text-recognition.rten and pass their folder with --models.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "Text recognition didn't work.".into(),
                    suggestion: format!("Try again. ({detail})"),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        GlyfoError::Aggregation(_) | GlyfoError::Serialization(_) => HumanError {
            message: "Glyfo had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it with the input file.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        GlyfoError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "A file couldn't be found.".into(),
                suggestion: "Check the path and try again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "Permission denied while reading or writing a file.".into(),
                suggestion: "Check the permissions of the input file and the output directory.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },
    }
}

fn humanize_validation(err: &ValidationError) -> HumanError {
    match err {
        ValidationError::NotFound(path) => HumanError {
            message: format!("{} does not exist.", path.display()),
            suggestion: "Check the path and try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        ValidationError::FileTooLarge { size_mb, max_mb } => HumanError {
            message: format!("The file is {size_mb:.1} MB, above the {max_mb} MB limit."),
            suggestion: "Split the PDF into smaller files or raise max_file_size_mb.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        ValidationError::TooManyPages { pages, max_pages } => HumanError {
            message: format!("The PDF has {pages} pages, above the {max_pages} page limit."),
            suggestion: "Split the PDF into smaller files or raise max_pages.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        ValidationError::Unreadable(_) => HumanError {
            message: "This file could not be opened as a PDF.".into(),
            suggestion: "Make sure it is a valid, unencrypted PDF.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
        ValidationError::EmptyDocument => HumanError {
            message: "The PDF has no pages.".into(),
            suggestion: "There is nothing to process in this file.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_needs_action() {
        let human = humanize_error(&GlyfoError::Timeout { page: 3, elapsed_secs: 301.0, limit_secs: 300 });
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("300"));
        assert!(!human.retriable);
    }

    #[test]
    fn oversized_file_suggests_splitting() {
        let err = GlyfoError::from(ValidationError::FileTooLarge { size_mb: 75.0, max_mb: 50.0 });
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("max_file_size_mb"));
    }

    #[test]
    fn missing_models_point_to_flag() {
        let human = humanize_error(&GlyfoError::OcrError("detection model not found".into()));
        assert!(human.suggestion.contains("--models"));
    }

    #[test]
    fn unreadable_pdf_is_permanent() {
        let err = GlyfoError::from(ValidationError::Unreadable("bad xref".into()));
        assert_eq!(humanize_error(&err).severity, Severity::Permanent);
    }
}
