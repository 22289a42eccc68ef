// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Planar geometry shared by every pipeline stage.
//
// Output space is PDF points with the origin at the top-left of the page's
// MediaBox and y growing downward. All arithmetic is f64; values are only
// rounded when serialized.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};

/// Decimal places kept when a coordinate is written out.
const SERIALIZED_DECIMALS: i32 = 3;

fn round_for_output(value: f64) -> f64 {
    let factor = 10f64.powi(SERIALIZED_DECIMALS);
    (value * factor).round() / factor
}

// -- Point ------------------------------------------------------------------

/// A 2D point. Serialized as a two-element array `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation between `self` (t = 0) and `other` (t = 1).
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&round_for_output(self.x))?;
        tuple.serialize_element(&round_for_output(self.y))?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PointVisitor;

        impl<'de> Visitor<'de> for PointVisitor {
            type Value = Point;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("an [x, y] coordinate pair")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Point, A::Error> {
                let x = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let y = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                Ok(Point::new(x, y))
            }
        }

        deserializer.deserialize_tuple(2, PointVisitor)
    }
}

// -- Rect -------------------------------------------------------------------

/// Axis-aligned rectangle, `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Whether `other` lies inside `self`, allowing `tolerance` on each edge.
    pub fn contains_rect(&self, other: &Rect, tolerance: f64) -> bool {
        other.x0 >= self.x0 - tolerance
            && other.y0 >= self.y0 - tolerance
            && other.x1 <= self.x1 + tolerance
            && other.y1 <= self.y1 + tolerance
    }
}

// -- Quad -------------------------------------------------------------------

/// Four-corner bounding polygon ordered top-left, top-right, bottom-right,
/// bottom-left. Clockwise on a y-down page; not necessarily axis-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    pub const TOP_LEFT: usize = 0;
    pub const TOP_RIGHT: usize = 1;
    pub const BOTTOM_RIGHT: usize = 2;
    pub const BOTTOM_LEFT: usize = 3;

    pub fn new(top_left: Point, top_right: Point, bottom_right: Point, bottom_left: Point) -> Self {
        Self([top_left, top_right, bottom_right, bottom_left])
    }

    /// Axis-aligned quad from a y-down rectangle.
    pub fn from_rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        let r = Rect::new(x0, y0, x1, y1);
        Self::new(
            Point::new(r.x0, r.y0),
            Point::new(r.x1, r.y0),
            Point::new(r.x1, r.y1),
            Point::new(r.x0, r.y1),
        )
    }

    /// Orders four arbitrary corners clockwise starting from the corner
    /// closest to the top-left (smallest `x + y`).
    pub fn from_unordered(corners: [Point; 4]) -> Self {
        let cx = corners.iter().map(|p| p.x).sum::<f64>() / 4.0;
        let cy = corners.iter().map(|p| p.y).sum::<f64>() / 4.0;

        // Angle measured in y-down space grows clockwise on screen.
        let mut sorted = corners;
        sorted.sort_by(|a, b| {
            let ta = (a.y - cy).atan2(a.x - cx);
            let tb = (b.y - cy).atan2(b.x - cx);
            ta.total_cmp(&tb)
        });

        let start = (0..4)
            .min_by(|&i, &j| {
                let si = sorted[i].x + sorted[i].y;
                let sj = sorted[j].x + sorted[j].y;
                si.total_cmp(&sj)
            })
            .unwrap_or(0);

        Self([
            sorted[start],
            sorted[(start + 1) % 4],
            sorted[(start + 2) % 4],
            sorted[(start + 3) % 4],
        ])
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.0
    }

    pub fn top_left(&self) -> Point {
        self.0[Self::TOP_LEFT]
    }

    pub fn top_right(&self) -> Point {
        self.0[Self::TOP_RIGHT]
    }

    pub fn bottom_right(&self) -> Point {
        self.0[Self::BOTTOM_RIGHT]
    }

    pub fn bottom_left(&self) -> Point {
        self.0[Self::BOTTOM_LEFT]
    }

    /// Length of the baseline (bottom-left to bottom-right).
    pub fn baseline_length(&self) -> f64 {
        self.bottom_left().distance(self.bottom_right())
    }

    /// Distance from the bottom-left to the top-left corner.
    pub fn height(&self) -> f64 {
        self.bottom_left().distance(self.top_left())
    }

    /// Axis-aligned bounding box.
    pub fn bounds(&self) -> Rect {
        let xs = self.0.iter().map(|p| p.x);
        let ys = self.0.iter().map(|p| p.y);
        Rect {
            x0: xs.clone().fold(f64::INFINITY, f64::min),
            y0: ys.clone().fold(f64::INFINITY, f64::min),
            x1: xs.fold(f64::NEG_INFINITY, f64::max),
            y1: ys.fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Shoelace sum over the corners. Positive when the corners run
    /// clockwise on a y-down page.
    pub fn signed_area(&self) -> f64 {
        let p = &self.0;
        let mut sum = 0.0;
        for i in 0..4 {
            let j = (i + 1) % 4;
            sum += p[i].x * p[j].y - p[j].x * p[i].y;
        }
        sum / 2.0
    }

    /// Restores clockwise order after a mirroring transform by swapping
    /// left and right corners.
    pub fn normalize_winding(self) -> Self {
        if self.signed_area() < 0.0 {
            let [tl, tr, br, bl] = self.0;
            Self([tr, tl, bl, br])
        } else {
            self
        }
    }

    /// Applies `matrix` to every corner, keeping corner order.
    pub fn map(&self, matrix: &Matrix) -> Self {
        Self(self.0.map(|p| matrix.apply(p)))
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|p| p.is_finite())
    }
}

// -- Matrix -----------------------------------------------------------------

/// Affine transform in PDF notation `[a b c d e f]`:
/// `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Builds a matrix from six numeric operands (as found after `cm`/`Tm`).
    pub fn from_operands(values: &[f64]) -> Option<Self> {
        match values {
            [a, b, c, d, e, f] => Some(Self::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    /// Applies `self` first, then `next`. Equivalent to the PDF product
    /// `self × next`, so `cm` updates the CTM as `m.then(&ctm)`.
    pub fn then(&self, next: &Matrix) -> Matrix {
        Matrix::new(
            self.a * next.a + self.b * next.c,
            self.a * next.b + self.b * next.d,
            self.c * next.a + self.d * next.c,
            self.c * next.b + self.d * next.d,
            self.e * next.a + self.f * next.c + next.e,
            self.e * next.b + self.f * next.d + next.f,
        )
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse transform, or `None` when the matrix is singular.
    pub fn invert(&self) -> Option<Matrix> {
        let det = self.determinant();
        if det.abs() < 1e-12 || !det.is_finite() {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        let e = -(self.e * a + self.f * c);
        let f = -(self.e * b + self.f * d);
        Some(Matrix::new(a, b, c, d, e, f))
    }

    pub fn is_finite(&self) -> bool {
        [self.a, self.b, self.c, self.d, self.e, self.f]
            .iter()
            .all(|v| v.is_finite())
    }
}
