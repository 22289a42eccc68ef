// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF overlays — copies of the source PDF carrying the results: colored
// polygon annotations, an invisible text layer, or a visible text layer.
// Built with `lopdf` directly on the original objects.

use glyfo_core::{Document as GlyfoDocument, GlyfoError, Point, Quad, RegionSource, Result, TextRegion};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::{debug, info, instrument, warn};

use super::objects::{inherited, resolve, resolve_dict, text_string};
use super::reader::{PageGeometry, PdfReader};

/// Resource name of the Helvetica font added to every page.
const FONT_RESOURCE: &str = "GlyfoHelv";

/// Average Helvetica advance, in em, used to fit text to its box.
const AVERAGE_GLYPH_WIDTH: f64 = 0.5;

/// Helvetica descent, in em; the baseline sits this far above the box bottom.
const DESCENT: f64 = 0.21;

const ANNOTATION_OPACITY: f32 = 0.3;
const ANNOTATION_BORDER: i64 = 2;

/// Which overlay to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// One translucent polygon per region, colored by source.
    Annotated,
    /// Invisible but selectable text (render mode 3).
    Searchable,
    /// Visible text (render mode 0).
    Editable,
}

impl OverlayKind {
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::Annotated => "annotated",
            Self::Searchable => "searchable",
            Self::Editable => "editable",
        }
    }

    /// Font size for a box of height `height`, or `None` for annotations.
    fn font_size(&self, height: f64) -> Option<f64> {
        match self {
            Self::Annotated => None,
            Self::Searchable => Some((height * 0.8).max(1.0)),
            Self::Editable => Some((height * 0.7).max(4.0)),
        }
    }

    fn render_mode(&self) -> i64 {
        match self {
            Self::Searchable => 3,
            _ => 0,
        }
    }
}

/// Annotation stroke color per region source.
pub fn source_color(source: RegionSource) -> [f32; 3] {
    match source {
        RegionSource::Native => [0.0, 1.0, 0.0],
        RegionSource::OcrFromImage => [1.0, 0.5, 0.0],
        RegionSource::Scanned => [1.0, 0.0, 0.0],
    }
}

/// Writes overlays of one source PDF.
pub struct OverlayWriter<'a> {
    reader: &'a PdfReader,
}

impl<'a> OverlayWriter<'a> {
    pub fn new(reader: &'a PdfReader) -> Self {
        Self { reader }
    }

    /// The source PDF with `results` overlaid, serialized.
    #[instrument(skip_all, fields(kind = ?kind, pages = results.pages().len()))]
    pub fn render(&self, results: &GlyfoDocument, kind: OverlayKind) -> Result<Vec<u8>> {
        let mut doc = self.reader.document().clone();
        let page_ids = doc.get_pages();
        let font_id = match kind {
            OverlayKind::Annotated => None,
            _ => Some(doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            })),
        };

        let mut written = 0usize;
        for page in results.pages() {
            let Some(&page_id) = page_ids.get(&page.page_num()) else {
                warn!(page = page.page_num(), "page missing from source PDF, overlay skipped");
                continue;
            };
            let geometry = self.reader.page_geometry(page.page_num())?;
            let regions = page.text_regions();
            match font_id {
                None => add_annotations(&mut doc, page_id, &geometry, regions)?,
                Some(font_id) => add_text_layer(&mut doc, page_id, &geometry, regions, kind, font_id)?,
            }
            written += regions.len();
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|err| GlyfoError::PdfError(format!("failed to serialize {} PDF: {}", kind.file_suffix(), err)))?;
        info!(regions = written, bytes = bytes.len(), "overlay PDF written");
        Ok(bytes)
    }
}

// -- Annotations --------------------------------------------------------------

fn add_annotations(doc: &mut Document, page_id: ObjectId, geometry: &PageGeometry, regions: &[TextRegion]) -> Result<()> {
    let to_user = geometry.output_to_user();
    let mut annotation_ids = Vec::with_capacity(regions.len());
    for region in regions {
        let quad = region.bbox.map(&to_user);
        let bounds = quad.bounds();
        let vertices: Vec<Object> = quad
            .points()
            .iter()
            .flat_map(|p| [real(p.x), real(p.y)])
            .collect();
        let color: Vec<Object> = source_color(region.source).iter().map(|c| Object::Real(*c)).collect();
        let contents = format!(
            "Text: {}\nConfidence: {:.2}\nSource: {}",
            region.text,
            region.confidence,
            region.source.as_str()
        );
        let id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Polygon",
            "Rect" => vec![real(bounds.x0), real(bounds.y0), real(bounds.x1), real(bounds.y1)],
            "Vertices" => vertices,
            "C" => color,
            "CA" => Object::Real(ANNOTATION_OPACITY),
            "BS" => dictionary! { "W" => ANNOTATION_BORDER },
            "Contents" => text_string(&contents),
            "T" => text_string(region.source.as_str()),
            "P" => page_id,
        });
        annotation_ids.push(Object::Reference(id));
    }
    if annotation_ids.is_empty() {
        return Ok(());
    }

    // Existing /Annots may be inline or an indirect array.
    let existing = page_dict(doc, page_id)?.get(b"Annots").ok().cloned();
    let mut annots = match existing {
        Some(Object::Array(items)) => items,
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    debug!(page_id = ?page_id, added = annotation_ids.len(), "annotations added");
    annots.extend(annotation_ids);
    page_dict_mut(doc, page_id)?.set("Annots", Object::Array(annots));
    Ok(())
}

// -- Text layer ---------------------------------------------------------------

fn add_text_layer(
    doc: &mut Document,
    page_id: ObjectId,
    geometry: &PageGeometry,
    regions: &[TextRegion],
    kind: OverlayKind,
    font_id: ObjectId,
) -> Result<()> {
    let to_user = geometry.output_to_user();
    let mut operations = Vec::new();
    for region in regions {
        operations.extend(text_operations(&region.bbox.map(&to_user), &region.text, kind));
    }
    if operations.is_empty() {
        return Ok(());
    }

    install_font(doc, page_id, font_id)?;
    let layer = Content { operations }
        .encode()
        .map_err(|err| GlyfoError::PdfError(format!("failed to encode text layer: {}", err)))?;
    append_content(doc, page_id, layer)
}

/// Operators drawing `text` along the baseline of `quad` (user space).
fn text_operations(quad: &Quad, text: &str, kind: OverlayKind) -> Vec<Operation> {
    let text = text.trim();
    let height = quad.height();
    let length = quad.baseline_length();
    let Some(size) = kind.font_size(height) else {
        return Vec::new();
    };
    if text.is_empty() || !(length > 0.0) || !size.is_finite() {
        return Vec::new();
    }

    let bl = quad.bottom_left();
    let br = quad.bottom_right();
    let (cos, sin) = ((br.x - bl.x) / length, (br.y - bl.y) / length);
    let lift = (DESCENT * size).min(height / 2.0);
    let origin = Point::new(bl.x - sin * lift, bl.y + cos * lift);

    let natural = AVERAGE_GLYPH_WIDTH * size * text.chars().count() as f64;
    let scaling = (100.0 * length / natural).clamp(10.0, 500.0);

    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), real(size)]),
        Operation::new("Tr", vec![kind.render_mode().into()]),
        Operation::new("Tz", vec![real(scaling)]),
        Operation::new("Tm", vec![real(cos), real(sin), real(-sin), real(cos), real(origin.x), real(origin.y)]),
        Operation::new("Tj", vec![Object::String(win_ansi(text), StringFormat::Literal)]),
        Operation::new("ET", vec![]),
    ]
}

/// Encodes `text` for the standard WinAnsi Helvetica; unmappable characters
/// become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' | '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

/// Gives the page its own resource dictionary containing the overlay font.
/// Inherited or shared resources are copied, not modified.
fn install_font(doc: &mut Document, page_id: ObjectId, font_id: ObjectId) -> Result<()> {
    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|obj| resolve_dict(doc, obj))
        .cloned()
        .unwrap_or_default();
    let mut fonts: Dictionary = resources
        .get(b"Font")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .cloned()
        .unwrap_or_default();
    fonts.set(FONT_RESOURCE, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));
    page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Brackets the existing content in `q`/`Q` and appends `layer` after it, so
/// the overlay starts from the default graphics state.
fn append_content(doc: &mut Document, page_id: ObjectId, layer: Vec<u8>) -> Result<()> {
    let existing = page_dict(doc, page_id)?.get(b"Contents").ok().cloned();
    let existing: Vec<Object> = match existing {
        Some(Object::Array(items)) => items,
        Some(Object::Reference(id)) => match resolve(doc, &Object::Reference(id)) {
            Some(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(id)],
        },
        _ => Vec::new(),
    };

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut closing = b"\nQ\n".to_vec();
    closing.extend(layer);
    let layer_id = doc.add_object(Stream::new(Dictionary::new(), closing));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(layer_id));
    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

fn page_dict(doc: &Document, page_id: ObjectId) -> Result<&Dictionary> {
    doc.get_dictionary(page_id)
        .map_err(|err| GlyfoError::PdfError(format!("page object {:?} unreadable: {}", page_id, err)))
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_dictionary_mut(page_id)
        .map_err(|err| GlyfoError::PdfError(format!("page object {:?} unreadable: {}", page_id, err)))
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(operations: &[Operation], operator: &str) -> Operation {
        operations
            .iter()
            .find(|op| op.operator == operator)
            .cloned()
            .unwrap()
    }

    fn as_f64(object: &Object) -> f64 {
        match object {
            Object::Real(v) => f64::from(*v),
            Object::Integer(v) => *v as f64,
            other => panic!("not a number: {other:?}"),
        }
    }

    #[test]
    fn searchable_text_is_invisible_and_fitted() {
        // 100pt wide, 20pt tall box with bottom-left at (50, 700) in user space.
        let quad = Quad::new(
            Point::new(50.0, 720.0),
            Point::new(150.0, 720.0),
            Point::new(150.0, 700.0),
            Point::new(50.0, 700.0),
        );
        let ops = text_operations(&quad, "Factura", OverlayKind::Searchable);

        assert_eq!(as_f64(&find(&ops, "Tr").operands[0]), 3.0);
        assert_eq!(as_f64(&find(&ops, "Tf").operands[1]), 16.0);
        let tm = find(&ops, "Tm");
        assert_eq!(as_f64(&tm.operands[0]), 1.0);
        assert_eq!(as_f64(&tm.operands[4]), 50.0);
        assert!((as_f64(&tm.operands[5]) - (700.0 + 0.21 * 16.0)).abs() < 1e-3);
        // 7 glyphs at 8pt average = 56pt natural width.
        assert!((as_f64(&find(&ops, "Tz").operands[0]) - 100.0 * 100.0 / 56.0).abs() < 1e-3);
    }

    #[test]
    fn editable_text_has_a_minimum_size() {
        let quad = Quad::new(
            Point::new(0.0, 2.0),
            Point::new(40.0, 2.0),
            Point::new(40.0, 0.0),
            Point::new(0.0, 0.0),
        );
        let ops = text_operations(&quad, "tiny", OverlayKind::Editable);
        assert_eq!(as_f64(&find(&ops, "Tr").operands[0]), 0.0);
        assert_eq!(as_f64(&find(&ops, "Tf").operands[1]), 4.0);
    }

    #[test]
    fn blank_text_draws_nothing() {
        let quad = Quad::from_rect(0.0, 0.0, 10.0, 10.0);
        assert!(text_operations(&quad, "  ", OverlayKind::Searchable).is_empty());
        assert!(text_operations(&quad, "x", OverlayKind::Annotated).is_empty());
    }

    #[test]
    fn win_ansi_maps_latin_and_replaces_the_rest() {
        assert_eq!(win_ansi("Año €"), vec![b'A', 0xF1, b'o', b' ', 0x80]);
        assert_eq!(win_ansi("日"), vec![b'?']);
    }

    #[test]
    fn colors_follow_source() {
        assert_eq!(source_color(RegionSource::Native), [0.0, 1.0, 0.0]);
        assert_eq!(source_color(RegionSource::OcrFromImage), [1.0, 0.5, 0.0]);
        assert_eq!(source_color(RegionSource::Scanned), [1.0, 0.0, 0.0]);
    }
}
