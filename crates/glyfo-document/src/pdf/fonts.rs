// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font metrics and text decoding for content-stream interpretation.
//
// Only what line geometry needs: glyph advances, ascent/descent and the
// mapping from string bytes to Unicode. Glyph outlines are never loaded.

use std::collections::HashMap;

use lopdf::Encoding;
use lopdf::{Dictionary, Document, Object};

use super::objects::{decode_text_simple, get_name, get_number, get_resolved, number, resolve, resolve_dict};

/// Advance used when a font declares no widths, in text-space units per em.
const DEFAULT_ADVANCE: f64 = 0.5;
const DEFAULT_ASCENT: f64 = 0.8;
const DEFAULT_DESCENT: f64 = -0.2;

/// Metrics of one font resource.
pub struct FontInfo<'a> {
    encoding: Option<Encoding<'a>>,
    /// Type0 fonts address glyphs with two-byte codes.
    two_byte: bool,
    first_char: u32,
    widths: Vec<f64>,
    cid_widths: HashMap<u32, f64>,
    missing_width: f64,
    ascent: f64,
    descent: f64,
}

impl<'a> FontInfo<'a> {
    /// Metrics for a missing or unreadable font.
    pub fn fallback() -> Self {
        Self {
            encoding: None,
            two_byte: false,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            missing_width: DEFAULT_ADVANCE,
            ascent: DEFAULT_ASCENT,
            descent: DEFAULT_DESCENT,
        }
    }

    pub fn load(doc: &'a Document, font: &'a Dictionary) -> Self {
        let mut info = Self::fallback();
        info.encoding = font.get_font_encoding(doc).ok();

        let subtype = get_name(doc, font, b"Subtype").unwrap_or_default();
        if subtype == b"Type0" {
            info.two_byte = true;
            if let Some(descendant) = descendant_font(doc, font) {
                info.missing_width = get_number(doc, descendant, b"DW").unwrap_or(1000.0) / 1000.0;
                info.cid_widths = parse_cid_widths(doc, descendant);
                info.apply_descriptor(doc, descendant);
            }
            return info;
        }

        info.first_char = get_number(doc, font, b"FirstChar").map(|v| v.max(0.0) as u32).unwrap_or(0);
        if let Some(Object::Array(items)) = get_resolved(doc, font, b"Widths") {
            info.widths = items
                .iter()
                .map(|w| resolve(doc, w).and_then(number).unwrap_or(0.0) / 1000.0)
                .collect();
        }
        info.apply_descriptor(doc, font);
        info
    }

    fn apply_descriptor(&mut self, doc: &Document, font: &Dictionary) {
        let Some(descriptor) = font.get(b"FontDescriptor").ok().and_then(|d| resolve_dict(doc, d)) else {
            return;
        };
        if let Some(missing) = get_number(doc, descriptor, b"MissingWidth") {
            if missing > 0.0 {
                self.missing_width = missing / 1000.0;
            }
        }
        let ascent = get_number(doc, descriptor, b"Ascent").map(|v| v / 1000.0);
        let descent = get_number(doc, descriptor, b"Descent").map(|v| v / 1000.0);
        // Some producers write zeros; keep the defaults then.
        if let (Some(ascent), Some(descent)) = (ascent, descent) {
            if ascent > 0.0 && descent <= 0.0 && ascent - descent > 0.3 {
                self.ascent = ascent;
                self.descent = descent;
            }
        }
    }

    pub fn ascent(&self) -> f64 {
        self.ascent
    }

    pub fn descent(&self) -> f64 {
        self.descent
    }

    /// Character codes contained in a string operand.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| match pair {
                    [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                    [single] => u32::from(*single),
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|&b| u32::from(b)).collect()
        }
    }

    /// Whether `code` is the single-byte space that word spacing applies to.
    pub fn is_word_space(&self, code: u32) -> bool {
        !self.two_byte && code == 32
    }

    /// Horizontal advance of `code` in text-space units per em.
    pub fn advance(&self, code: u32) -> f64 {
        if self.two_byte {
            return self.cid_widths.get(&code).copied().unwrap_or(self.missing_width);
        }
        code.checked_sub(self.first_char)
            .and_then(|index| self.widths.get(index as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.missing_width)
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        if let Some(encoding) = &self.encoding {
            if let Ok(text) = Document::decode_text(encoding, bytes) {
                return text;
            }
        }
        decode_text_simple(bytes)
    }
}

fn descendant_font<'a>(doc: &'a Document, font: &'a Dictionary) -> Option<&'a Dictionary> {
    match get_resolved(doc, font, b"DescendantFonts")? {
        Object::Array(items) => resolve_dict(doc, items.first()?),
        _ => None,
    }
}

/// Parses a CID font `/W` array: `c [w1 w2 …]` and `c_first c_last w`.
fn parse_cid_widths(doc: &Document, descendant: &Dictionary) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let Some(Object::Array(items)) = get_resolved(doc, descendant, b"W") else {
        return widths;
    };

    let mut index = 0;
    while index < items.len() {
        let Some(first) = resolve(doc, &items[index]).and_then(number) else {
            break;
        };
        match items.get(index + 1).and_then(|o| resolve(doc, o)) {
            Some(Object::Array(run)) => {
                for (offset, w) in run.iter().enumerate() {
                    if let Some(w) = resolve(doc, w).and_then(number) {
                        widths.insert(first as u32 + offset as u32, w / 1000.0);
                    }
                }
                index += 2;
            }
            Some(last) => {
                let (Some(last), Some(w)) = (
                    number(last),
                    items.get(index + 2).and_then(|o| resolve(doc, o)).and_then(number),
                ) else {
                    break;
                };
                for cid in first as u32..=last as u32 {
                    widths.insert(cid, w / 1000.0);
                }
                index += 3;
            }
            None => break,
        }
    }
    widths
}
