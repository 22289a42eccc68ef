// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Word splitter — divides a line region into per-word regions by
// distributing the line's extent proportionally to token lengths.

use glyfo_core::{Point, Quad, TextRegion};

/// Splits line regions into word regions.
#[derive(Debug, Clone, Copy)]
pub struct WordSplitter {
    spacing_factor: f64,
}

impl Default for WordSplitter {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl WordSplitter {
    pub fn new(spacing_factor: f64) -> Self {
        Self {
            spacing_factor: if spacing_factor.is_finite() { spacing_factor.max(0.0) } else { 0.0 },
        }
    }

    /// Splits every region not already marked as a word.
    pub fn split_all(&self, regions: Vec<TextRegion>) -> Vec<TextRegion> {
        regions
            .into_iter()
            .flat_map(|region| {
                if region.is_word {
                    vec![region]
                } else {
                    self.split(&region)
                }
            })
            .collect()
    }

    /// Word regions of one line. A single token keeps the line's box exactly;
    /// blank text yields nothing.
    pub fn split(&self, region: &TextRegion) -> Vec<TextRegion> {
        let tokens: Vec<&str> = region.text.split_whitespace().collect();
        match tokens.as_slice() {
            [] => Vec::new(),
            [only] => vec![word(region, region.bbox, only)],
            _ => {
                let bounds = self.boundaries(&tokens);
                tokens
                    .iter()
                    .zip(bounds.windows(2))
                    .map(|(token, span)| word(region, slice(&region.bbox, span[0], span[1]), token))
                    .collect()
            }
        }
    }

    /// Fractions along the baseline where each token starts, plus a final 1.0.
    ///
    /// Each token weighs its character count; each gap weighs `spacing_factor`,
    /// half of which goes to each neighbour.
    fn boundaries(&self, tokens: &[&str]) -> Vec<f64> {
        let half_gap = self.spacing_factor / 2.0;
        let last = tokens.len() - 1;
        let widths: Vec<f64> = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                let neighbours = usize::from(i > 0) + usize::from(i < last);
                token.chars().count() as f64 + half_gap * neighbours as f64
            })
            .collect();
        let total: f64 = widths.iter().sum();

        let mut bounds = Vec::with_capacity(tokens.len() + 1);
        let mut acc = 0.0;
        bounds.push(0.0);
        for width in &widths[..last] {
            acc += width;
            bounds.push(acc / total);
        }
        bounds.push(1.0);
        bounds
    }
}

/// The part of `quad` between baseline fractions `t0` and `t1`, interpolating
/// top and bottom edges separately.
fn slice(quad: &Quad, t0: f64, t1: f64) -> Quad {
    let edge = |start: Point, end: Point, t: f64| if t >= 1.0 { end } else { start.lerp(end, t) };
    let top = |t: f64| edge(quad.top_left(), quad.top_right(), t);
    let bottom = |t: f64| edge(quad.bottom_left(), quad.bottom_right(), t);
    Quad::new(top(t0), top(t1), bottom(t1), bottom(t0))
}

fn word(line: &TextRegion, bbox: Quad, text: &str) -> TextRegion {
    TextRegion {
        bbox,
        text: text.to_string(),
        confidence: line.confidence,
        source: line.source,
        is_word: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyfo_core::RegionSource;

    fn line(text: &str, quad: Quad) -> TextRegion {
        TextRegion::recognized(quad, text, 0.8, RegionSource::OcrFromImage)
    }

    #[test]
    fn single_token_keeps_bbox() {
        let quad = Quad::from_rect(10.0, 10.0, 90.0, 22.0);
        let words = WordSplitter::default().split(&line("  Factura ", quad));
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].bbox, quad);
        assert_eq!(words[0].text, "Factura");
        assert!(words[0].is_word);
        assert_eq!(words[0].source, RegionSource::OcrFromImage);
    }

    #[test]
    fn tokens_partition_the_line() {
        let quad = Quad::from_rect(0.0, 0.0, 200.0, 10.0);
        let words = WordSplitter::new(0.1).split(&line("Total a pagar 42,00", quad));
        let texts: Vec<_> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["Total", "a", "pagar", "42,00"]);

        assert_eq!(words[0].bbox.top_left(), quad.top_left());
        assert_eq!(words[3].bbox.top_right(), quad.top_right());
        assert_eq!(words[3].bbox.bottom_right(), quad.bottom_right());
        for pair in words.windows(2) {
            assert_eq!(pair[0].bbox.top_right(), pair[1].bbox.top_left());
            assert_eq!(pair[0].bbox.bottom_right(), pair[1].bbox.bottom_left());
        }
        for w in &words {
            assert!(w.is_word);
            assert_eq!(w.confidence, 0.8);
            assert!((w.bbox.height() - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn widths_follow_character_counts() {
        // No spacing: "aa" and "aaaa" take one and two thirds.
        let quad = Quad::from_rect(0.0, 0.0, 60.0, 10.0);
        let words = WordSplitter::new(0.0).split(&line("aa aaaa", quad));
        assert!((words[0].bbox.baseline_length() - 20.0).abs() < 1e-9);
        assert!((words[1].bbox.baseline_length() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn rotated_line_keeps_rotation() {
        let quad = Quad::new(
            Point::new(0.0, 100.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 100.0),
        );
        let words = WordSplitter::default().split(&line("up the page", quad));
        assert_eq!(words.len(), 3);
        for w in &words {
            assert!((w.bbox.top_left().x - 0.0).abs() < 1e-9);
            assert!((w.bbox.bottom_left().x - 10.0).abs() < 1e-9);
        }
        assert_eq!(words[2].bbox.top_right(), Point::new(0.0, 0.0));
    }

    #[test]
    fn blank_text_yields_nothing() {
        assert!(WordSplitter::default().split(&line(" \t ", Quad::default())).is_empty());
    }

    #[test]
    fn split_all_passes_words_through() {
        let quad = Quad::from_rect(0.0, 0.0, 40.0, 10.0);
        let mut already = line("one two", quad);
        already.is_word = true;
        let out = WordSplitter::default().split_all(vec![already, line("three four", quad)]);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].text, "one two");
    }
}
