// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open existing documents with `lopdf` and expose per-page
// geometry, content and image streams to the pipeline.

use std::path::{Path, PathBuf};

use glyfo_core::{GlyfoError, Matrix, Rect, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument};

use super::content::{ContentError, ContentInterpreter, ImagePlacement, PageContent};
use super::objects::{inherited, number, resolve, resolve_stream, stream_data};

/// US Letter, used when a page declares no usable `/MediaBox`.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Size and coordinate mapping of one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// MediaBox in PDF user space (y up).
    pub media_box: Rect,
    /// `/Rotate`, informational; output coordinates are unrotated.
    pub rotation: i64,
}

impl PageGeometry {
    pub fn width(&self) -> f64 {
        self.media_box.width()
    }

    pub fn height(&self) -> f64 {
        self.media_box.height()
    }

    /// User space (y up) to output space (top-left origin, y down).
    pub fn user_to_output(&self) -> Matrix {
        Matrix::new(1.0, 0.0, 0.0, -1.0, -self.media_box.x0, self.media_box.y1)
    }

    /// Output space back to user space.
    pub fn output_to_user(&self) -> Matrix {
        // The flip is its own inverse up to the translation.
        Matrix::new(1.0, 0.0, 0.0, -1.0, self.media_box.x0, self.media_box.y1)
    }
}

/// Reads existing PDF files.
///
/// Wraps `lopdf::Document` and keeps the page map so pages can be addressed
/// by their 1-based number.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<PathBuf>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            GlyfoError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self {
            document,
            source_path: Some(path_ref.to_path_buf()),
        })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            GlyfoError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            source_path: None,
        })
    }

    /// Record where in-memory bytes were read from.
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Page numbers in ascending order.
    pub fn page_numbers(&self) -> Vec<u32> {
        self.document.get_pages().keys().copied().collect()
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn page_id(&self, page_number: u32) -> Result<ObjectId> {
        let pages = self.document.get_pages();
        pages.get(&page_number).copied().ok_or_else(|| {
            GlyfoError::PdfError(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            ))
        })
    }

    /// MediaBox and rotation of a page, following inheritance.
    pub fn page_geometry(&self, page_number: u32) -> Result<PageGeometry> {
        let page_id = self.page_id(page_number)?;
        let doc = &self.document;

        let values = match inherited(doc, page_id, b"MediaBox") {
            Some(Object::Array(items)) => items
                .iter()
                .map(|item| resolve(doc, item).and_then(number))
                .collect::<Option<Vec<f64>>>(),
            _ => None,
        };
        let [x0, y0, x1, y1] = match values.as_deref() {
            Some([x0, y0, x1, y1]) if (x1 - x0).abs() > 0.0 && (y1 - y0).abs() > 0.0 => [*x0, *y0, *x1, *y1],
            _ => {
                debug!(page = page_number, "no usable MediaBox, assuming US Letter");
                DEFAULT_MEDIA_BOX
            }
        };

        let rotation = match inherited(doc, page_id, b"Rotate") {
            Some(Object::Integer(r)) => *r,
            _ => 0,
        };

        Ok(PageGeometry {
            media_box: Rect::new(x0, y0, x1, y1),
            rotation,
        })
    }

    /// Effective `/Resources` of a page.
    pub fn page_resources(&self, page_number: u32) -> Result<Option<&Dictionary>> {
        let page_id = self.page_id(page_number)?;
        Ok(match inherited(&self.document, page_id, b"Resources") {
            Some(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        })
    }

    /// Concatenated, decoded content streams of a page.
    pub fn page_content_bytes(&self, page_number: u32) -> Result<Vec<u8>> {
        let page_id = self.page_id(page_number)?;
        let doc = &self.document;
        let page = doc
            .get_dictionary(page_id)
            .map_err(|err| GlyfoError::PdfError(format!("page {} dictionary unreadable: {}", page_number, err)))?;

        let streams: Vec<&Stream> = match page.get(b"Contents").ok().and_then(|c| resolve(doc, c)) {
            Some(Object::Stream(stream)) => vec![stream],
            Some(Object::Array(items)) => items.iter().filter_map(|item| resolve_stream(doc, item)).collect(),
            _ => Vec::new(),
        };

        let mut content = Vec::new();
        for stream in streams {
            let data = stream_data(stream).map_err(|err| {
                GlyfoError::PageExtraction {
                    page: page_number,
                    reason: format!("content stream cannot be decoded: {}", err),
                }
            })?;
            content.extend_from_slice(&data);
            content.push(b'\n');
        }
        Ok(content)
    }

    /// Interprets a page's content stream.
    ///
    /// Fails with [`GlyfoError::PageExtraction`] when the stream is malformed.
    pub fn page_content(&self, page_number: u32) -> Result<PageContent> {
        let bytes = self.page_content_bytes(page_number)?;
        let resources = self.page_resources(page_number)?;
        ContentInterpreter::new(&self.document)
            .run_page(&bytes, resources)
            .map_err(|ContentError(reason)| GlyfoError::PageExtraction {
                page: page_number,
                reason,
            })
    }

    /// The image XObject behind a placement.
    pub fn image_stream(&self, placement: &ImagePlacement) -> Result<&Stream> {
        let id = placement.object_id.ok_or_else(|| {
            GlyfoError::ImageError(format!("image {} is not an indirect object", placement.name))
        })?;
        match self.document.get_object(id) {
            Ok(Object::Stream(stream)) => Ok(stream),
            Ok(_) => Err(GlyfoError::ImageError(format!("object {:?} is not a stream", id))),
            Err(err) => Err(GlyfoError::ImageError(format!("image object {:?} missing: {}", id, err))),
        }
    }
}
