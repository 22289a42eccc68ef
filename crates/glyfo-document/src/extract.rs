// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native text extraction — turns the text runs of a page's content stream
// into line-level regions in output space, in content-stream order.

use glyfo_core::{Point, Quad, Result, TextRegion};
use tracing::{debug, instrument};

use crate::pdf::content::{PageContent, TextRun};
use crate::pdf::reader::{PageGeometry, PdfReader};

/// Runs whose baselines are further apart than this fraction of the line
/// height start a new line.
const BASELINE_TOLERANCE: f64 = 0.5;

/// Gap (in line heights) above which a space is inserted between runs.
const SPACE_GAP: f64 = 0.15;

/// Gap (in line heights) above which runs on one baseline are separate
/// regions, e.g. table columns.
const COLUMN_GAP: f64 = 1.5;

/// Minimum cosine between run directions that still share a line.
const SAME_DIRECTION: f64 = 0.99;

/// Extracts the PDF text layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeExtractor;

impl NativeExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Line-level regions of one page (`source = native`, confidence 1.0).
    ///
    /// A malformed content stream yields [`glyfo_core::GlyfoError::PageExtraction`].
    #[instrument(skip(self, reader))]
    pub fn extract_page(&self, reader: &PdfReader, page: u32) -> Result<Vec<TextRegion>> {
        let geometry = reader.page_geometry(page)?;
        let content = reader.page_content(page)?;
        let regions = self.lines(&content, &geometry);
        debug!(page, runs = content.runs.len(), lines = regions.len(), "native text extracted");
        Ok(regions)
    }

    /// Groups interpreted runs into lines.
    pub fn lines(&self, content: &PageContent, geometry: &PageGeometry) -> Vec<TextRegion> {
        let to_output = geometry.user_to_output();
        let mut lines: Vec<LineBuilder> = Vec::new();

        for run in &content.runs {
            let quad = run.quad.map(&to_output).normalize_winding();
            match lines.last_mut() {
                Some(line) if line.accepts(&quad) => line.push(run, quad),
                _ => {
                    if let Some(line) = LineBuilder::start(run, quad) {
                        lines.push(line);
                    }
                }
            }
        }

        lines
            .into_iter()
            .filter_map(LineBuilder::finish)
            .collect()
    }
}

/// A line under construction, measured in a frame along its baseline.
struct LineBuilder {
    origin: Point,
    /// Unit vector along the baseline.
    along: (f64, f64),
    /// Unit vector pointing up the glyphs.
    up: (f64, f64),
    height: f64,
    text: String,
    /// Baseline coordinate where the last run ended.
    end: f64,
    min_along: f64,
    max_along: f64,
    min_up: f64,
    max_up: f64,
}

impl LineBuilder {
    fn start(run: &TextRun, quad: Quad) -> Option<Self> {
        let bl = quad.bottom_left();
        let br = quad.bottom_right();
        let length = bl.distance(br);
        let (dx, dy) = if length > f64::EPSILON {
            ((br.x - bl.x) / length, (br.y - bl.y) / length)
        } else {
            (1.0, 0.0)
        };
        let mut line = Self {
            origin: bl,
            along: (dx, dy),
            // Rotating the baseline direction a quarter turn towards the top
            // of the glyphs (y grows downward).
            up: (dy, -dx),
            height: quad.height().max(run.font_size),
            text: String::new(),
            end: 0.0,
            min_along: f64::INFINITY,
            max_along: f64::NEG_INFINITY,
            min_up: f64::INFINITY,
            max_up: f64::NEG_INFINITY,
        };
        if !line.height.is_finite() || line.height <= f64::EPSILON {
            return None;
        }
        line.push(run, quad);
        Some(line)
    }

    fn project(&self, p: Point) -> (f64, f64) {
        let rx = p.x - self.origin.x;
        let ry = p.y - self.origin.y;
        (
            rx * self.along.0 + ry * self.along.1,
            rx * self.up.0 + ry * self.up.1,
        )
    }

    fn accepts(&self, quad: &Quad) -> bool {
        let bl = quad.bottom_left();
        let br = quad.bottom_right();
        let length = bl.distance(br);
        if length > f64::EPSILON {
            let cos = ((br.x - bl.x) * self.along.0 + (br.y - bl.y) * self.along.1) / length;
            if cos < SAME_DIRECTION {
                return false;
            }
        }

        let (start, offset) = self.project(bl);
        if offset.abs() > BASELINE_TOLERANCE * self.height {
            return false;
        }
        let gap = start - self.end;
        gap >= -BASELINE_TOLERANCE * self.height && gap <= COLUMN_GAP * self.height
    }

    fn push(&mut self, run: &TextRun, quad: Quad) {
        let (start, _) = self.project(quad.bottom_left());
        let (finish, _) = self.project(quad.bottom_right());

        if !self.text.is_empty() {
            let gap = start - self.end;
            let joined = self.text.ends_with(char::is_whitespace) || run.text.starts_with(char::is_whitespace);
            if gap > SPACE_GAP * self.height && !joined {
                self.text.push(' ');
            }
        }
        self.text.push_str(&run.text);
        self.end = finish.max(start);
        self.height = self.height.max(run.font_size);

        for p in quad.points() {
            let (a, u) = self.project(*p);
            self.min_along = self.min_along.min(a);
            self.max_along = self.max_along.max(a);
            self.min_up = self.min_up.min(u);
            self.max_up = self.max_up.max(u);
        }
    }

    fn point(&self, a: f64, u: f64) -> Point {
        Point::new(
            self.origin.x + self.along.0 * a + self.up.0 * u,
            self.origin.y + self.along.1 * a + self.up.1 * u,
        )
    }

    fn finish(self) -> Option<TextRegion> {
        let text = self.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return None;
        }
        let quad = Quad::new(
            self.point(self.min_along, self.max_up),
            self.point(self.max_along, self.max_up),
            self.point(self.max_along, self.min_up),
            self.point(self.min_along, self.min_up),
        );
        Some(TextRegion::native(quad, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyfo_core::{Matrix, Rect, RegionSource};

    fn geometry() -> PageGeometry {
        PageGeometry {
            media_box: Rect::new(0.0, 0.0, 600.0, 800.0),
            rotation: 0,
        }
    }

    /// Run whose user-space baseline starts at `(x, y)` with `width` advance.
    fn run(text: &str, x: f64, y: f64, width: f64, size: f64) -> TextRun {
        let top = y + 0.8 * size;
        let bottom = y - 0.2 * size;
        TextRun {
            text: text.into(),
            quad: Quad::new(
                Point::new(x, top),
                Point::new(x + width, top),
                Point::new(x + width, bottom),
                Point::new(x, bottom),
            ),
            font_size: size,
        }
    }

    #[test]
    fn runs_on_one_baseline_form_a_line() {
        let content = PageContent {
            runs: vec![run("Total", 72.0, 700.0, 30.0, 12.0), run("42,00", 105.0, 700.0, 30.0, 12.0)],
            images: vec![],
        };
        let lines = NativeExtractor::new().lines(&content, &geometry());

        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.text, "Total 42,00");
        assert_eq!(line.confidence, 1.0);
        assert_eq!(line.source, RegionSource::Native);
        assert!(!line.is_word);

        let bounds = line.bbox.bounds();
        assert!((bounds.x0 - 72.0).abs() < 1e-9);
        assert!((bounds.x1 - 135.0).abs() < 1e-9);
        // Top of glyphs at 700 + 9.6 in user space, i.e. 90.4 from the top.
        assert!((bounds.y0 - 90.4).abs() < 1e-9);
        assert!((bounds.y1 - 102.4).abs() < 1e-9);
        assert!(line.bbox.signed_area() > 0.0);
    }

    #[test]
    fn new_baseline_starts_new_line_in_stream_order() {
        let content = PageContent {
            runs: vec![
                run("second visually", 72.0, 600.0, 80.0, 12.0),
                run("first visually", 72.0, 700.0, 80.0, 12.0),
            ],
            images: vec![],
        };
        let lines = NativeExtractor::new().lines(&content, &geometry());
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["second visually", "first visually"]);
    }

    #[test]
    fn wide_gap_separates_columns() {
        let content = PageContent {
            runs: vec![run("Qty", 72.0, 700.0, 20.0, 10.0), run("Price", 300.0, 700.0, 30.0, 10.0)],
            images: vec![],
        };
        assert_eq!(NativeExtractor::new().lines(&content, &geometry()).len(), 2);
    }

    #[test]
    fn rotated_line_keeps_orientation() {
        let rotation = Matrix::new(0.0, 1.0, -1.0, 0.0, 0.0, 0.0);
        let mut rotated = run("Vertical", 0.0, 0.0, 50.0, 10.0);
        rotated.quad = rotated.quad.map(&rotation.then(&Matrix::translate(300.0, 100.0)));
        let content = PageContent { runs: vec![rotated], images: vec![] };

        let lines = NativeExtractor::new().lines(&content, &geometry());
        assert_eq!(lines.len(), 1);
        let quad = lines[0].bbox;
        // Baseline runs up the page, i.e. towards smaller output y.
        assert!(quad.bottom_right().y < quad.bottom_left().y);
        assert!((quad.baseline_length() - 50.0).abs() < 1e-9);
        assert!(quad.signed_area() > 0.0);
    }
}
