// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading and interpreting existing documents (via `lopdf`),
// overlaying results onto them, and rebuilding text-only PDFs (via
// `printpdf`).

pub mod content;
pub mod fonts;
pub mod objects;
pub mod overlay;
pub mod reader;
pub mod writer;

pub use overlay::{OverlayKind, OverlayWriter};
pub use reader::{PageGeometry, PdfReader};
pub use writer::PdfWriter;
