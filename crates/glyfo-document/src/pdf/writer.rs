// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — rebuilds a text-only PDF from results using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use glyfo_core::{Document, Page, TextRegion};
use printpdf::{BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, TextItem};
use tracing::{debug, info, instrument};

/// Millimetres per PDF point.
const MM_PER_PT: f64 = 25.4 / 72.0;

/// Writes reconstructed PDFs: each page the size of the original, blank
/// except for the recognized text placed at its region.
pub struct PdfWriter {
    title: String,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new("Glyfo Reconstruction")
    }
}

impl PdfWriter {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }

    /// Serialized PDF with one page per result page.
    #[instrument(skip_all, fields(pages = document.pages().len()))]
    pub fn reconstruct(&self, document: &Document) -> Vec<u8> {
        let mut doc = PdfDocument::new(&self.title);
        let pages: Vec<PdfPage> = document.pages().iter().map(reconstruct_page).collect();
        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        info!(bytes = output.len(), warnings = warnings.len(), "reconstructed PDF written");
        output
    }
}

fn reconstruct_page(page: &Page) -> PdfPage {
    let ops: Vec<Op> = page
        .text_regions()
        .iter()
        .flat_map(|region| region_ops(region, page.height()))
        .collect();
    debug!(page = page.page_num(), ops = ops.len(), "page reconstructed");
    PdfPage::new(mm(page.width()), mm(page.height()), ops)
}

/// Horizontal text at the region's bottom-left corner, sized to its height.
fn region_ops(region: &TextRegion, page_height: f64) -> Vec<Op> {
    let text = region.text.trim();
    let height = region.bbox.height();
    if text.is_empty() || !height.is_finite() {
        return Vec::new();
    }
    let size = (height * 0.7).max(4.0);
    let anchor = region.bbox.bottom_left();
    vec![
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point {
                x: Pt(anchor.x as f32),
                y: Pt((page_height - anchor.y + 0.2 * size) as f32),
            },
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(size as f32),
            font: BuiltinFont::Helvetica,
        },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text.to_string())],
            font: BuiltinFont::Helvetica,
        },
        Op::EndTextSection,
    ]
}

fn mm(points: f64) -> Mm {
    Mm((points * MM_PER_PT) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyfo_core::{PageClass, Quad};

    #[test]
    fn points_convert_to_millimetres() {
        assert!((mm(72.0).0 - 25.4).abs() < 1e-4);
    }

    #[test]
    fn regions_become_text_sections() {
        let region = TextRegion::native(Quad::from_rect(72.0, 100.0, 200.0, 120.0), "Factura");
        let ops = region_ops(&region, 792.0);
        assert_eq!(ops.len(), 5);
        assert!(matches!(ops[0], Op::StartTextSection));
        match &ops[1] {
            Op::SetTextCursor { pos } => {
                assert_eq!(pos.x, Pt(72.0));
                assert!((pos.y.0 - (792.0 - 120.0 + 0.2 * 14.0)).abs() < 1e-3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn blank_regions_are_skipped() {
        let page = Page::new(
            1,
            612.0,
            792.0,
            PageClass::Native,
            vec![TextRegion::native(Quad::from_rect(0.0, 0.0, 10.0, 10.0), "  ")],
        );
        assert!(region_ops(&page.text_regions()[0], 792.0).is_empty());
    }
}
