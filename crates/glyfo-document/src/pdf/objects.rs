// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Small helpers over `lopdf` objects: reference resolution, numbers,
// inherited page attributes and stream payloads.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Reference chains longer than this are treated as broken.
const MAX_REFERENCE_HOPS: usize = 16;

/// Page-tree depth limit when walking `/Parent` for inherited attributes.
const MAX_TREE_DEPTH: usize = 64;

/// Follows indirect references until a direct object is reached.
pub fn resolve<'a>(doc: &'a Document, mut object: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_REFERENCE_HOPS {
        match object {
            Object::Reference(id) => object = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

pub fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

pub fn resolve_stream<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Stream> {
    match resolve(doc, object)? {
        Object::Stream(stream) => Some(stream),
        _ => None,
    }
}

/// `dict[key]`, dereferenced.
pub fn get_resolved<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    resolve(doc, dict.get(key).ok()?)
}

pub fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

pub fn get_number(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<f64> {
    number(get_resolved(doc, dict, key)?)
}

pub fn get_name<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    match get_resolved(doc, dict, key)? {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

/// Numeric array such as `/MediaBox` or `/Matrix`.
pub fn get_numbers(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<Vec<f64>> {
    match get_resolved(doc, dict, key)? {
        Object::Array(items) => items
            .iter()
            .map(|item| resolve(doc, item).and_then(number))
            .collect(),
        _ => None,
    }
}

/// Looks up a page attribute, walking `/Parent` for inheritable keys
/// (`/Resources`, `/MediaBox`, `/Rotate`).
pub fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        dict = resolve_dict(doc, dict.get(b"Parent").ok()?)?;
    }
    None
}

/// The stream's decoded bytes. Streams without `/Filter` are returned as is.
pub fn stream_data(stream: &Stream) -> lopdf::Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_err() {
        return Ok(stream.content.clone());
    }
    stream.decompressed_content()
}

/// Filter names in application order.
pub fn filters(doc: &Document, stream: &Stream) -> Vec<Vec<u8>> {
    match get_resolved(doc, &stream.dict, b"Filter") {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match resolve(doc, item)? {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Fallback decoding for strings without a usable font encoding:
/// UTF-16BE with BOM, then UTF-8, then Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Encodes a string for a PDF text string (`/Contents`, `/T`): PDFDocEncoding
/// for ASCII, UTF-16BE with BOM otherwise.
pub fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, lopdf::StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn simple_decoding_fallbacks() {
        assert_eq!(decode_text_simple(b"Factura"), "Factura");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
        assert_eq!(decode_text_simple(&[0x4E, 0xBA]), "Nº");
    }

    #[test]
    fn media_box_is_inherited_from_parent() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );

        let media_box = match inherited(&doc, page_id, b"MediaBox") {
            Some(Object::Array(items)) => items.iter().filter_map(number).collect::<Vec<_>>(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(media_box, vec![0.0, 0.0, 595.0, 842.0]);
    }

    #[test]
    fn unfiltered_stream_is_returned_verbatim() {
        let stream = Stream::new(dictionary! {}, b"BT ET".to_vec());
        assert_eq!(stream_data(&stream).unwrap(), b"BT ET".to_vec());
    }

    #[test]
    fn non_ascii_text_string_is_utf16() {
        match text_string("Año") {
            Object::String(bytes, _) => assert_eq!(&bytes[..2], &[0xFE, 0xFF]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
