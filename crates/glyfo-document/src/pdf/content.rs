// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-stream interpreter.
//
// Walks a page's operators tracking the graphics state (CTM, `q`/`Q`) and the
// text state (`BT`…`ET`, text and line matrices, spacing, font) and reports
// two things: text runs with their user-space quads, and image XObjects with
// the CTM in effect at `Do`. Form XObjects are entered recursively.

use std::collections::HashMap;
use std::rc::Rc;

use glyfo_core::{Matrix, Point, Quad};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, warn};

use super::fonts::FontInfo;
use super::objects::{get_name, get_numbers, get_resolved, number, resolve_dict, resolve_stream, stream_data};

/// Nested form XObjects deeper than this are skipped.
const MAX_FORM_DEPTH: usize = 8;

/// TJ adjustments at least this large (thousandths of an em, leftward
/// negative) are read as a word break.
const TJ_SPACE_THRESHOLD: f64 = 200.0;

/// A string shown by one `Tj`/`TJ`/`'`/`"` operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Quad in PDF user space (y up), corners TL, TR, BR, BL in text space.
    pub quad: Quad,
    /// Effective font height in user-space units.
    pub font_size: f64,
}

/// An image XObject drawn with `Do`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    /// Position among the page's image placements, in drawing order.
    pub index: usize,
    /// Resource name, e.g. `Im0`.
    pub name: String,
    pub object_id: Option<ObjectId>,
    /// Maps the image's unit square onto user space.
    pub ctm: Matrix,
}

/// Everything the interpreter found on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub runs: Vec<TextRun>,
    pub images: Vec<ImagePlacement>,
}

impl PageContent {
    /// Non-whitespace characters across all runs.
    pub fn text_chars(&self) -> usize {
        self.runs
            .iter()
            .map(|run| run.text.chars().filter(|c| !c.is_whitespace()).count())
            .sum()
    }
}

/// Why a content stream could not be interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentError(pub String);

impl std::fmt::Display for ContentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone)]
struct GraphicsState<'a> {
    ctm: Matrix,
    font: Option<Rc<FontInfo<'a>>>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    /// `Tz / 100`.
    horizontal_scaling: f64,
    leading: f64,
    rise: f64,
}

impl GraphicsState<'_> {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Hash, PartialEq, Eq)]
enum FontKey {
    Object(ObjectId),
    Inline(usize, Vec<u8>),
}

/// Interprets the content streams of one document.
pub struct ContentInterpreter<'a> {
    doc: &'a Document,
    fonts: HashMap<FontKey, Rc<FontInfo<'a>>>,
    content: PageContent,
}

impl<'a> ContentInterpreter<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            fonts: HashMap::new(),
            content: PageContent::default(),
        }
    }

    /// Interprets `bytes` as a page content stream with `resources`.
    pub fn run_page(
        mut self,
        bytes: &[u8],
        resources: Option<&'a Dictionary>,
    ) -> Result<PageContent, ContentError> {
        let content = Content::decode(bytes)
            .map_err(|err| ContentError(format!("content stream does not parse: {}", err)))?;
        self.run(&content.operations, resources, Matrix::identity(), 0)?;
        Ok(self.content)
    }

    fn run(
        &mut self,
        operations: &[Operation],
        resources: Option<&'a Dictionary>,
        base_ctm: Matrix,
        depth: usize,
    ) -> Result<(), ContentError> {
        let mut state = State::new(base_ctm);

        for op in operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => state.stack.push(state.gs.clone()),
                "Q" => {
                    if let Some(saved) = state.stack.pop() {
                        state.gs = saved;
                    }
                }
                "cm" => {
                    let m = matrix_operands(operands, "cm")?;
                    state.gs.ctm = m.then(&state.gs.ctm);
                }

                "BT" => {
                    state.tm = Matrix::identity();
                    state.tlm = Matrix::identity();
                }
                "ET" => {}
                "Tf" => {
                    if let [Object::Name(name), size] = operands.as_slice() {
                        state.gs.font_size = number(size).unwrap_or(0.0);
                        state.gs.font = Some(self.font(resources, name));
                    }
                }
                "Tc" => state.gs.char_spacing = first_number(operands).unwrap_or(0.0),
                "Tw" => state.gs.word_spacing = first_number(operands).unwrap_or(0.0),
                "Tz" => state.gs.horizontal_scaling = first_number(operands).unwrap_or(100.0) / 100.0,
                "TL" => state.gs.leading = first_number(operands).unwrap_or(0.0),
                "Ts" => state.gs.rise = first_number(operands).unwrap_or(0.0),
                "Td" => {
                    let (tx, ty) = pair_operands(operands);
                    state.move_line(tx, ty);
                }
                "TD" => {
                    let (tx, ty) = pair_operands(operands);
                    state.gs.leading = -ty;
                    state.move_line(tx, ty);
                }
                "Tm" => {
                    let m = matrix_operands(operands, "Tm")?;
                    state.tm = m;
                    state.tlm = m;
                }
                "T*" => {
                    let leading = state.gs.leading;
                    state.move_line(0.0, -leading);
                }

                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(&mut state, &[ShowItem::Text(bytes)]);
                    }
                }
                "'" => {
                    let leading = state.gs.leading;
                    state.move_line(0.0, -leading);
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(&mut state, &[ShowItem::Text(bytes)]);
                    }
                }
                "\"" => {
                    if let [aw, ac, Object::String(bytes, _)] = operands.as_slice() {
                        state.gs.word_spacing = number(aw).unwrap_or(0.0);
                        state.gs.char_spacing = number(ac).unwrap_or(0.0);
                        let leading = state.gs.leading;
                        state.move_line(0.0, -leading);
                        self.show(&mut state, &[ShowItem::Text(bytes)]);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        let show_items: Vec<ShowItem<'_>> = items
                            .iter()
                            .filter_map(|item| match item {
                                Object::String(bytes, _) => Some(ShowItem::Text(bytes)),
                                other => number(other).map(ShowItem::Adjust),
                            })
                            .collect();
                        self.show(&mut state, &show_items);
                    }
                }

                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.draw_xobject(name, resources, state.gs.ctm, depth)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn font(&mut self, resources: Option<&'a Dictionary>, name: &[u8]) -> Rc<FontInfo<'a>> {
        let doc = self.doc;
        let lookup = resources
            .and_then(|res| get_resolved(doc, res, b"Font"))
            .and_then(|fonts| match fonts {
                Object::Dictionary(fonts) => fonts.get(name).ok(),
                _ => None,
            });

        let Some(entry) = lookup else {
            debug!(font = %String::from_utf8_lossy(name), "font resource missing, using default metrics");
            return Rc::new(FontInfo::fallback());
        };

        let key = match entry {
            Object::Reference(id) => FontKey::Object(*id),
            _ => FontKey::Inline(resources.map_or(0, |r| r as *const Dictionary as usize), name.to_vec()),
        };
        self.fonts
            .entry(key)
            .or_insert_with(|| match resolve_dict(doc, entry) {
                Some(dict) => Rc::new(FontInfo::load(doc, dict)),
                None => Rc::new(FontInfo::fallback()),
            })
            .clone()
    }

    fn show(&mut self, state: &mut State<'a>, items: &[ShowItem<'_>]) {
        let gs = &state.gs;
        let Some(font) = gs.font.clone() else {
            return;
        };
        let fs = gs.font_size;
        let th = gs.horizontal_scaling;

        let mut text = String::new();
        let mut advance = 0.0;
        for item in items {
            match item {
                ShowItem::Text(bytes) => {
                    text.push_str(&font.decode(bytes));
                    for code in font.codes(bytes) {
                        let mut width = font.advance(code) * fs + gs.char_spacing;
                        if font.is_word_space(code) {
                            width += gs.word_spacing;
                        }
                        advance += width * th;
                    }
                }
                ShowItem::Adjust(amount) => {
                    if *amount <= -TJ_SPACE_THRESHOLD && !text.is_empty() && !text.ends_with(' ') {
                        text.push(' ');
                    }
                    advance -= amount / 1000.0 * fs * th;
                }
            }
        }

        let to_user = state.tm.then(&gs.ctm);
        let bottom = font.descent() * fs + gs.rise;
        let top = font.ascent() * fs + gs.rise;
        let quad = Quad::new(
            to_user.apply(Point::new(0.0, top)),
            to_user.apply(Point::new(advance, top)),
            to_user.apply(Point::new(advance, bottom)),
            to_user.apply(Point::new(0.0, bottom)),
        );
        let font_size = quad.height();

        state.tm = Matrix::translate(advance, 0.0).then(&state.tm);

        if text.trim().is_empty() || !quad.is_finite() || font_size <= f64::EPSILON {
            return;
        }
        self.content.runs.push(TextRun { text, quad, font_size });
    }

    fn draw_xobject(
        &mut self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: Matrix,
        depth: usize,
    ) -> Result<(), ContentError> {
        let doc = self.doc;
        let Some(entry) = resources
            .and_then(|res| get_resolved(doc, res, b"XObject"))
            .and_then(|xobjects| match xobjects {
                Object::Dictionary(xobjects) => xobjects.get(name).ok(),
                _ => None,
            })
        else {
            debug!(name = %String::from_utf8_lossy(name), "XObject resource missing");
            return Ok(());
        };
        let Some(stream) = resolve_stream(doc, entry) else {
            return Ok(());
        };
        let object_id = match entry {
            Object::Reference(id) => Some(*id),
            _ => None,
        };

        match get_name(doc, &stream.dict, b"Subtype") {
            Some(b"Image") => {
                let index = self.content.images.len();
                self.content.images.push(ImagePlacement {
                    index,
                    name: String::from_utf8_lossy(name).into_owned(),
                    object_id,
                    ctm,
                });
            }
            Some(b"Form") => {
                if depth >= MAX_FORM_DEPTH {
                    warn!(depth, "form XObjects nested too deeply, skipping");
                    return Ok(());
                }
                let form_matrix = get_numbers(doc, &stream.dict, b"Matrix")
                    .and_then(|values| Matrix::from_operands(&values))
                    .unwrap_or_default();
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| resolve_dict(doc, r))
                    .or(resources);
                let bytes = stream_data(stream)
                    .map_err(|err| ContentError(format!("form XObject stream unreadable: {}", err)))?;
                let content = Content::decode(&bytes)
                    .map_err(|err| ContentError(format!("form XObject does not parse: {}", err)))?;
                self.run(&content.operations, form_resources, form_matrix.then(&ctm), depth + 1)?;
            }
            _ => {}
        }
        Ok(())
    }
}

enum ShowItem<'o> {
    Text(&'o [u8]),
    Adjust(f64),
}

struct State<'a> {
    gs: GraphicsState<'a>,
    stack: Vec<GraphicsState<'a>>,
    tm: Matrix,
    tlm: Matrix,
}

impl State<'_> {
    fn new(ctm: Matrix) -> Self {
        Self {
            gs: GraphicsState::new(ctm),
            stack: Vec::new(),
            tm: Matrix::identity(),
            tlm: Matrix::identity(),
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.tlm = Matrix::translate(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }
}

fn first_number(operands: &[Object]) -> Option<f64> {
    operands.first().and_then(number)
}

fn pair_operands(operands: &[Object]) -> (f64, f64) {
    match operands {
        [x, y, ..] => (number(x).unwrap_or(0.0), number(y).unwrap_or(0.0)),
        _ => (0.0, 0.0),
    }
}

fn matrix_operands(operands: &[Object], operator: &str) -> Result<Matrix, ContentError> {
    let values: Option<Vec<f64>> = operands.iter().map(number).collect();
    values
        .and_then(|values| Matrix::from_operands(&values))
        .ok_or_else(|| ContentError(format!("`{}` needs six numeric operands, got {:?}", operator, operands)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};

    fn doc_with_resources() -> (Document, Dictionary) {
        let mut doc = Document::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0, 255, 255, 0],
        ));
        let resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => dictionary! { "Im0" => image_id },
        };
        (doc, resources)
    }

    #[test]
    fn text_run_geometry_follows_text_matrix() {
        let (doc, resources) = doc_with_resources();
        let content = ContentInterpreter::new(&doc)
            .run_page(b"BT /F1 12 Tf 72 700 Td (Hello) Tj ET", Some(&resources))
            .unwrap();

        assert_eq!(content.runs.len(), 1);
        let run = &content.runs[0];
        assert_eq!(run.text, "Hello");
        // Five glyphs at the default half-em advance.
        let bl = run.quad.bottom_left();
        let tr = run.quad.top_right();
        assert!((bl.x - 72.0).abs() < 1e-9);
        assert!((bl.y - (700.0 - 2.4)).abs() < 1e-9);
        assert!((tr.x - 102.0).abs() < 1e-9);
        assert!((tr.y - (700.0 + 9.6)).abs() < 1e-9);
        assert!((run.font_size - 12.0).abs() < 1e-9);
        assert_eq!(content.text_chars(), 5);
    }

    #[test]
    fn consecutive_shows_advance_the_text_matrix() {
        let (doc, resources) = doc_with_resources();
        let content = ContentInterpreter::new(&doc)
            .run_page(b"BT /F1 10 Tf 0 0 Td (ab) Tj [(cd) -500 (ef)] TJ ET", Some(&resources))
            .unwrap();

        assert_eq!(content.runs.len(), 2);
        assert!((content.runs[1].quad.bottom_left().x - 10.0).abs() < 1e-9);
        // Two-glyph advances plus the 0.5 em TJ gap.
        assert!((content.runs[1].quad.bottom_right().x - 35.0).abs() < 1e-9);
        assert_eq!(content.runs[1].text, "cd ef");
    }

    #[test]
    fn image_placement_captures_ctm() {
        let (doc, resources) = doc_with_resources();
        let content = ContentInterpreter::new(&doc)
            .run_page(b"q 200 0 0 100 50 60 cm /Im0 Do Q", Some(&resources))
            .unwrap();

        assert_eq!(content.images.len(), 1);
        assert_eq!(content.images[0].ctm, Matrix::new(200.0, 0.0, 0.0, 100.0, 50.0, 60.0));
        assert_eq!(content.images[0].name, "Im0");
        assert!(content.runs.is_empty());
    }

    #[test]
    fn graphics_state_is_restored_after_q() {
        let (doc, resources) = doc_with_resources();
        let content = ContentInterpreter::new(&doc)
            .run_page(
                b"q 2 0 0 2 0 0 cm Q 10 0 0 10 0 0 cm /Im0 Do",
                Some(&resources),
            )
            .unwrap();
        assert_eq!(content.images[0].ctm, Matrix::scale(10.0, 10.0));
    }

    #[test]
    fn malformed_matrix_is_an_error() {
        let (doc, resources) = doc_with_resources();
        let err = ContentInterpreter::new(&doc)
            .run_page(b"1 0 0 cm", Some(&resources))
            .unwrap_err();
        assert!(err.0.contains("cm"));
    }
}
