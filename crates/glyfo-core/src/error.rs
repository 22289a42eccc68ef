// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Glyfo.

use std::path::PathBuf;

use thiserror::Error;

/// Input rejected before any page is read.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("file too large: {size_mb:.2} MB exceeds the {max_mb} MB limit")]
    FileTooLarge { size_mb: f64, max_mb: f64 },

    #[error("too many pages: {pages} exceeds the {max_pages} page limit")]
    TooManyPages { pages: u32, max_pages: u32 },

    #[error("PDF could not be read: {0}")]
    Unreadable(String),

    #[error("PDF has no pages")]
    EmptyDocument,
}

/// Top-level error type for all Glyfo operations.
#[derive(Debug, Error)]
pub enum GlyfoError {
    // -- Fatal, whole document --
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("processing time limit exceeded before page {page}: {elapsed_secs:.1}s elapsed, limit {limit_secs}s")]
    Timeout { page: u32, elapsed_secs: f64, limit_secs: u64 },

    #[error("processing cancelled before page {page}")]
    Cancelled { page: u32 },

    #[error("configuration error: {0}")]
    Config(String),

    // -- Recoverable, page or unit local --
    #[error("native text extraction failed on page {page}: {reason}")]
    PageExtraction { page: u32, reason: String },

    #[error("text recognition failed for {unit}: {reason}")]
    Recognition { unit: String, reason: String },

    // -- Document / image --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("result aggregation failed: {0}")]
    Aggregation(String),

    // -- Storage --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GlyfoError {
    /// Page- or unit-local failures the pipeline absorbs and records as
    /// warnings instead of aborting the document.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PageExtraction { .. } | Self::Recognition { .. })
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GlyfoError>;
