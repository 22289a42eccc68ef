// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — decoding of PDF image XObjects and resampling before OCR.

pub mod decode;
pub mod processor;

pub use decode::decode_image_xobject;
pub use processor::ImageProcessor;
