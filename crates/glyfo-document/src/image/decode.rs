// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decoding of PDF image XObjects into `DynamicImage`.
//
// Supported: DCT (JPEG) streams, and raw or Flate/LZW sample data at 1, 2,
// 4, 8 or 16 bits per component in DeviceGray, DeviceRGB, DeviceCMYK,
// CalGray/CalRGB, ICCBased (by component count) and Indexed colour spaces,
// plus `/ImageMask` stencils. JPEG 2000, JBIG2 and CCITT are rejected.

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use glyfo_core::{GlyfoError, Result};
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::debug;

use crate::pdf::objects::{filters, get_number, get_numbers, get_resolved, resolve, resolve_stream, stream_data};

/// Images above this many pixels are refused instead of allocated.
const MAX_PIXELS: u64 = 100_000_000;

#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// Base space and a packed lookup table of `(hival + 1) * base_components` bytes.
    Indexed(Box<ColorSpace>, Vec<u8>),
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::Cmyk => 4,
            Self::Indexed(..) => 1,
        }
    }
}

/// Decodes the image XObject `stream` of `doc`.
pub fn decode_image_xobject(doc: &Document, stream: &Stream) -> Result<DynamicImage> {
    let dict = &stream.dict;
    let chain = filters(doc, stream);

    if let Some(last) = chain.last() {
        match last.as_slice() {
            b"DCTDecode" | b"DCT" => {
                if chain.len() > 1 {
                    return Err(unsupported("filter chain ending in DCTDecode"));
                }
                return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                    .map_err(|err| GlyfoError::ImageError(format!("JPEG image does not decode: {}", err)));
            }
            b"JPXDecode" => return Err(unsupported("JPEG 2000 (JPXDecode)")),
            b"JBIG2Decode" => return Err(unsupported("JBIG2")),
            b"CCITTFaxDecode" | b"CCF" => return Err(unsupported("CCITT fax")),
            _ => {}
        }
    }

    let width = dimension(doc, dict, b"Width")?;
    let height = dimension(doc, dict, b"Height")?;
    if u64::from(width) * u64::from(height) > MAX_PIXELS {
        return Err(GlyfoError::ImageError(format!("image of {}x{} pixels is too large", width, height)));
    }

    let samples = stream_data(stream)
        .map_err(|err| GlyfoError::ImageError(format!("image stream does not decompress: {}", err)))?;

    let is_mask = matches!(get_resolved(doc, dict, b"ImageMask"), Some(Object::Boolean(true)));
    let (space, bpc) = if is_mask {
        (ColorSpace::Gray, 1)
    } else {
        let bpc = get_number(doc, dict, b"BitsPerComponent").unwrap_or(8.0) as u32;
        (color_space(doc, get_resolved(doc, dict, b"ColorSpace"))?, bpc)
    };
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return Err(unsupported(&format!("{} bits per component", bpc)));
    }

    // `/Decode [1 0]` inverts single-channel images. Stencil masks paint
    // black where the decoded sample is 0.
    let invert = match get_numbers(doc, dict, b"Decode").as_deref() {
        Some([first, second, ..]) => first > second,
        _ => false,
    };

    debug!(width, height, bpc, components = space.components(), "decoding image samples");
    let reader = SampleReader::new(&samples, width, space.components(), bpc);
    match &space {
        ColorSpace::Gray => Ok(DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
            let v = reader.sample(x, y, 0);
            Luma([if invert { 255 - v } else { v }])
        }))),
        ColorSpace::Rgb => Ok(DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([reader.sample(x, y, 0), reader.sample(x, y, 1), reader.sample(x, y, 2)])
        }))),
        ColorSpace::Cmyk => Ok(DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            cmyk_to_rgb([
                reader.sample(x, y, 0),
                reader.sample(x, y, 1),
                reader.sample(x, y, 2),
                reader.sample(x, y, 3),
            ])
        }))),
        ColorSpace::Indexed(base, lookup) => {
            let n = base.components();
            Ok(DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
                let index = reader.raw(x, y, 0) as usize;
                let entry = |c: usize| lookup.get(index * n + c).copied().unwrap_or(0);
                match base.as_ref() {
                    ColorSpace::Gray => {
                        let v = entry(0);
                        Rgb([v, v, v])
                    }
                    ColorSpace::Cmyk => cmyk_to_rgb([entry(0), entry(1), entry(2), entry(3)]),
                    _ => Rgb([entry(0), entry(1), entry(2)]),
                }
            })))
        }
    }
}

fn unsupported(what: &str) -> GlyfoError {
    GlyfoError::ImageError(format!("unsupported image encoding: {}", what))
}

fn dimension(doc: &Document, dict: &Dictionary, key: &[u8]) -> Result<u32> {
    match get_number(doc, dict, key) {
        Some(v) if v >= 1.0 => Ok(v as u32),
        _ => Err(GlyfoError::ImageError(format!(
            "image /{} missing or invalid",
            String::from_utf8_lossy(key)
        ))),
    }
}

fn color_space(doc: &Document, object: Option<&Object>) -> Result<ColorSpace> {
    match object {
        None => Ok(ColorSpace::Gray),
        Some(Object::Name(name)) => named_space(name),
        Some(Object::Array(items)) => {
            let family = match items.first().and_then(|o| resolve(doc, o)) {
                Some(Object::Name(name)) => name.as_slice(),
                _ => return Err(unsupported("colour space array without a family name")),
            };
            match family {
                b"ICCBased" => {
                    let n = items
                        .get(1)
                        .and_then(|o| resolve_stream(doc, o))
                        .and_then(|s| get_number(doc, &s.dict, b"N"))
                        .unwrap_or(3.0) as u32;
                    match n {
                        1 => Ok(ColorSpace::Gray),
                        4 => Ok(ColorSpace::Cmyk),
                        _ => Ok(ColorSpace::Rgb),
                    }
                }
                b"CalGray" => Ok(ColorSpace::Gray),
                b"CalRGB" | b"Lab" => Ok(ColorSpace::Rgb),
                b"Indexed" | b"I" => {
                    let base = color_space(doc, items.get(1).and_then(|o| resolve(doc, o)))?;
                    if matches!(base, ColorSpace::Indexed(..)) {
                        return Err(unsupported("nested Indexed colour space"));
                    }
                    let lookup = match items.get(3).and_then(|o| resolve(doc, o)) {
                        Some(Object::String(bytes, _)) => bytes.clone(),
                        Some(Object::Stream(s)) => stream_data(s).map_err(|err| {
                            GlyfoError::ImageError(format!("palette stream does not decompress: {}", err))
                        })?,
                        _ => return Err(unsupported("Indexed colour space without lookup table")),
                    };
                    Ok(ColorSpace::Indexed(Box::new(base), lookup))
                }
                other => named_space(other),
            }
        }
        Some(_) => Err(unsupported("colour space object")),
    }
}

fn named_space(name: &[u8]) -> Result<ColorSpace> {
    match name {
        b"DeviceGray" | b"G" | b"CalGray" => Ok(ColorSpace::Gray),
        b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(ColorSpace::Rgb),
        b"DeviceCMYK" | b"CMYK" => Ok(ColorSpace::Cmyk),
        other => Err(unsupported(&format!("colour space {}", String::from_utf8_lossy(other)))),
    }
}

fn cmyk_to_rgb([c, m, y, k]: [u8; 4]) -> Rgb<u8> {
    let white = 255.0 - f32::from(k);
    let channel = |v: u8| ((255.0 - f32::from(v)) * white / 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb([channel(c), channel(m), channel(y)])
}

/// Random access to packed samples; rows start on byte boundaries.
struct SampleReader<'d> {
    data: &'d [u8],
    components: usize,
    bpc: u32,
    row_bytes: usize,
}

impl<'d> SampleReader<'d> {
    fn new(data: &'d [u8], width: u32, components: usize, bpc: u32) -> Self {
        let row_bits = width as usize * components * bpc as usize;
        Self {
            data,
            components,
            bpc,
            row_bytes: row_bits.div_ceil(8),
        }
    }

    /// Sample value as stored (index for Indexed images). Missing data reads 0.
    fn raw(&self, x: u32, y: u32, component: usize) -> u32 {
        let index = x as usize * self.components + component;
        let row = y as usize * self.row_bytes;
        match self.bpc {
            8 => u32::from(self.data.get(row + index).copied().unwrap_or(0)),
            16 => u32::from(self.data.get(row + index * 2).copied().unwrap_or(0)),
            bpc => {
                let bit = index * bpc as usize;
                let byte = self.data.get(row + bit / 8).copied().unwrap_or(0);
                let shift = 8 - bpc as usize - (bit % 8);
                u32::from(byte >> shift) & ((1 << bpc) - 1)
            }
        }
    }

    /// Sample scaled to 0..=255.
    fn sample(&self, x: u32, y: u32, component: usize) -> u8 {
        let v = self.raw(x, y, component);
        match self.bpc {
            8 | 16 => v as u8,
            bpc => (v * 255 / ((1 << bpc) - 1)) as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn image_stream(dict: Dictionary, data: Vec<u8>) -> Stream {
        Stream::new(dict, data)
    }

    #[test]
    fn raw_rgb_samples() {
        let doc = Document::with_version("1.5");
        let stream = image_stream(
            dictionary! {
                "Width" => 2, "Height" => 1,
                "ColorSpace" => "DeviceRGB", "BitsPerComponent" => 8,
            },
            vec![255, 0, 0, 0, 0, 255],
        );
        let img = decode_image_xobject(&doc, &stream).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(1, 0), &Rgb([0, 0, 255]));
    }

    #[test]
    fn one_bit_rows_are_byte_aligned() {
        let doc = Document::with_version("1.5");
        // 3 pixels wide: each row uses one byte, low bits are padding.
        let stream = image_stream(
            dictionary! {
                "Width" => 3, "Height" => 2,
                "ColorSpace" => "DeviceGray", "BitsPerComponent" => 1,
            },
            vec![0b1010_0000, 0b0100_0000],
        );
        let img = decode_image_xobject(&doc, &stream).unwrap().to_luma8();
        assert_eq!(img.get_pixel(0, 0), &Luma([255]));
        assert_eq!(img.get_pixel(1, 0), &Luma([0]));
        assert_eq!(img.get_pixel(2, 0), &Luma([255]));
        assert_eq!(img.get_pixel(1, 1), &Luma([255]));
    }

    #[test]
    fn stencil_mask_paints_zero_bits_black() {
        let doc = Document::with_version("1.5");
        let stream = image_stream(
            dictionary! { "Width" => 2, "Height" => 1, "ImageMask" => true },
            vec![0b0100_0000],
        );
        let img = decode_image_xobject(&doc, &stream).unwrap().to_luma8();
        assert_eq!(img.get_pixel(0, 0), &Luma([0]));
        assert_eq!(img.get_pixel(1, 0), &Luma([255]));
    }

    #[test]
    fn indexed_palette_lookup() {
        let doc = Document::with_version("1.5");
        let stream = image_stream(
            dictionary! {
                "Width" => 2, "Height" => 1, "BitsPerComponent" => 8,
                "ColorSpace" => Object::Array(vec![
                    Object::Name(b"Indexed".to_vec()),
                    Object::Name(b"DeviceRGB".to_vec()),
                    Object::Integer(1),
                    Object::string_literal(vec![10u8, 20, 30, 200, 210, 220]),
                ]),
            },
            vec![1, 0],
        );
        let img = decode_image_xobject(&doc, &stream).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0), &Rgb([200, 210, 220]));
        assert_eq!(img.get_pixel(1, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn cmyk_black_is_black() {
        assert_eq!(cmyk_to_rgb([0, 0, 0, 255]), Rgb([0, 0, 0]));
        assert_eq!(cmyk_to_rgb([0, 0, 0, 0]), Rgb([255, 255, 255]));
    }

    #[test]
    fn jpeg2000_is_rejected() {
        let doc = Document::with_version("1.5");
        let stream = image_stream(
            dictionary! { "Width" => 1, "Height" => 1, "Filter" => "JPXDecode" },
            vec![0],
        );
        let err = decode_image_xobject(&doc, &stream).unwrap_err();
        assert!(err.to_string().contains("JPEG 2000"));
    }
}
