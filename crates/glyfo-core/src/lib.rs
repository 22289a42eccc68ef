// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Glyfo — Core types, geometry and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod geometry;
pub mod human_errors;
pub mod types;

pub use config::{OutputConfig, PipelineConfig, ScanMode};
pub use error::{GlyfoError, Result, ValidationError};
pub use geometry::{Matrix, Point, Quad, Rect};
pub use types::*;
