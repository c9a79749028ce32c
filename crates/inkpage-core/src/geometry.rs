//! Geometry helpers for annotation segments.
//!
//! Everything here is pure: scaling between model and display space and
//! axis-aligned envelopes over segment endpoints.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A straight segment between two endpoints, the unit a user draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// First endpoint.
    pub a: Point,
    /// Second endpoint.
    pub b: Point,
}

impl Segment {
    /// Create a new segment.
    pub fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    /// Both endpoints, `a` first.
    pub fn endpoints(&self) -> [Point; 2] {
        [self.a, self.b]
    }

    /// Check that both endpoints have finite coordinates.
    pub fn is_finite(&self) -> bool {
        is_finite_point(self.a) && is_finite_point(self.b)
    }

    /// Check whether any endpoint of `self` equals any endpoint of `other`.
    ///
    /// Equality is exact; there is no tolerance.
    pub fn shares_endpoint(&self, other: &Segment) -> bool {
        self.endpoints()
            .iter()
            .any(|p| other.endpoints().iter().any(|q| p.x == q.x && p.y == q.y))
    }

    /// Return this segment with both endpoints multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(scale_point(self.a, factor), scale_point(self.b, factor))
    }

    /// Get the length of the segment.
    pub fn length(&self) -> f64 {
        self.a.distance(self.b)
    }
}

/// Check that a point has finite coordinates.
pub fn is_finite_point(point: Point) -> bool {
    point.x.is_finite() && point.y.is_finite()
}

/// Multiply a point by a scalar (model space to display space).
pub fn scale_point(point: Point, factor: f64) -> Point {
    Point::new(point.x * factor, point.y * factor)
}

/// Divide a point by a scalar (display space back to model space).
pub fn descale_point(point: Point, factor: f64) -> Point {
    Point::new(point.x / factor, point.y / factor)
}

/// Scale every segment endpoint by `factor`.
pub fn scale_segments(segments: &[Segment], factor: f64) -> Vec<Segment> {
    segments.iter().map(|s| s.scaled(factor)).collect()
}

/// Scale a rectangle's edges by `factor`.
pub fn scale_rect(rect: Rect, factor: f64) -> Rect {
    Rect::new(
        rect.x0 * factor,
        rect.y0 * factor,
        rect.x1 * factor,
        rect.y1 * factor,
    )
}

/// Axis-aligned envelope of all endpoints in `segments`.
///
/// Returns `None` for an empty input rather than inverted or NaN bounds.
pub fn bounds_of<'a, I>(segments: I) -> Option<Rect>
where
    I: IntoIterator<Item = &'a Segment>,
{
    let mut points = segments.into_iter().flat_map(|s| s.endpoints());
    let first = points.next()?;
    let (min_x, min_y, max_x, max_y) = points.fold(
        (first.x, first.y, first.x, first.y),
        |(mn_x, mn_y, mx_x, mx_y), p| (mn_x.min(p.x), mn_y.min(p.y), mx_x.max(p.x), mx_y.max(p.y)),
    );
    Some(Rect::new(min_x, min_y, max_x, max_y))
}
