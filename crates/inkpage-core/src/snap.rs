//! Snap functionality for attaching new endpoints to existing ones.

use crate::geometry::Segment;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Default magnet radius, in the caller's coordinate space.
pub const DEFAULT_MAGNET_RADIUS: f64 = 20.0;

/// How a candidate point picks among endpoints inside the magnet radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SnapStrategy {
    /// First endpoint within the radius in scan order (segment order,
    /// first endpoint before second).
    #[default]
    FirstWithinRadius,
    /// Closest endpoint within the radius; ties keep scan order.
    Nearest,
}

/// Result of a snap operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The snapped point, or the candidate itself if nothing was close.
    pub point: Point,
    /// Whether an existing endpoint was used.
    pub snapped: bool,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: Point) -> Self {
        Self {
            point,
            snapped: false,
        }
    }

    /// Check if snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.snapped
    }
}

/// Snap-to-endpoint settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Magnet {
    /// Inclusive Manhattan distance threshold.
    pub radius: f64,
    /// Endpoint selection rule.
    pub strategy: SnapStrategy,
}

impl Default for Magnet {
    fn default() -> Self {
        Self {
            radius: DEFAULT_MAGNET_RADIUS,
            strategy: SnapStrategy::default(),
        }
    }
}

impl Magnet {
    /// Create a magnet with the given radius and the default strategy.
    pub fn with_radius(radius: f64) -> Self {
        Self {
            radius,
            ..Self::default()
        }
    }

    /// Find the endpoint `candidate` should attach to, if any.
    pub fn find(&self, lines: &[Segment], candidate: Point) -> Option<Point> {
        match self.strategy {
            SnapStrategy::FirstWithinRadius => first_endpoint_within(lines, candidate, self.radius),
            SnapStrategy::Nearest => nearest_endpoint_within(lines, candidate, self.radius),
        }
    }

    /// Snap `candidate`, falling back to the candidate itself.
    pub fn snap(&self, lines: &[Segment], candidate: Point) -> SnapResult {
        match self.find(lines, candidate) {
            Some(point) => SnapResult {
                point,
                snapped: true,
            },
            None => SnapResult::none(candidate),
        }
    }
}

/// Sum of absolute coordinate differences.
pub fn manhattan_distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Return the first endpoint within `radius` of `candidate` in scan order.
///
/// This is not necessarily the closest endpoint: an earlier segment inside
/// the radius wins over a later one that is nearer.
pub fn first_endpoint_within(lines: &[Segment], candidate: Point, radius: f64) -> Option<Point> {
    lines
        .iter()
        .flat_map(|segment| segment.endpoints())
        .find(|&p| manhattan_distance(p, candidate) <= radius)
}

/// Return the closest endpoint within `radius` of `candidate`.
pub fn nearest_endpoint_within(lines: &[Segment], candidate: Point, radius: f64) -> Option<Point> {
    let mut best: Option<(Point, f64)> = None;
    for p in lines.iter().flat_map(|segment| segment.endpoints()) {
        let distance = manhattan_distance(p, candidate);
        if distance > radius {
            continue;
        }
        match best {
            Some((_, best_distance)) if best_distance <= distance => {}
            _ => best = Some((p, distance)),
        }
    }
    best.map(|(p, _)| p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(ax: f64, ay: f64, bx: f64, by: f64) -> Segment {
        Segment::new(Point::new(ax, ay), Point::new(bx, by))
    }

    #[test]
    fn test_manhattan_distance() {
        let distance = manhattan_distance(Point::new(0.0, 0.0), Point::new(3.0, -4.0));
        assert!((distance - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snap_within_radius() {
        let lines = [seg(100.0, 100.0, 200.0, 100.0)];
        let magnet = Magnet::default();
        // Distance 12 + 8 = 20: inclusive.
        assert_eq!(magnet.find(&lines, Point::new(112.0, 108.0)), Some(Point::new(100.0, 100.0)));
        // Distance 21: outside.
        assert_eq!(magnet.find(&lines, Point::new(113.0, 108.0)), None);
    }

    #[test]
    fn test_snap_result_fallback() {
        let lines = [seg(0.0, 0.0, 50.0, 0.0)];
        let far = Point::new(500.0, 500.0);
        let result = Magnet::default().snap(&lines, far);
        assert!(!result.is_snapped());
        assert_eq!(result.point, far);
    }

    #[test]
    fn test_empty_lines_never_snap() {
        assert!(Magnet::default().find(&[], Point::ZERO).is_none());
    }

    #[test]
    fn test_first_match_beats_closer_later_endpoint() {
        let lines = [seg(0.0, 0.0, 100.0, 100.0), seg(5.0, 0.0, 300.0, 300.0)];
        let candidate = Point::new(6.0, 0.0);
        // (0,0) is 6 away and scanned first; (5,0) is 1 away.
        assert_eq!(first_endpoint_within(&lines, candidate, 20.0), Some(Point::new(0.0, 0.0)));
        assert_eq!(nearest_endpoint_within(&lines, candidate, 20.0), Some(Point::new(5.0, 0.0)));
    }

    #[test]
    fn test_first_endpoint_before_second() {
        let lines = [seg(10.0, 0.0, 0.0, 10.0)];
        // Equidistant from both endpoints.
        let candidate = Point::new(5.0, 5.0);
        assert_eq!(first_endpoint_within(&lines, candidate, 10.0), Some(Point::new(10.0, 0.0)));
        assert_eq!(nearest_endpoint_within(&lines, candidate, 10.0), Some(Point::new(10.0, 0.0)));
    }

    #[test]
    fn test_nearest_strategy() {
        let lines = [seg(0.0, 0.0, 100.0, 100.0), seg(5.0, 0.0, 300.0, 300.0)];
        let magnet = Magnet {
            radius: 20.0,
            strategy: SnapStrategy::Nearest,
        };
        assert_eq!(magnet.find(&lines, Point::new(6.0, 0.0)), Some(Point::new(5.0, 0.0)));
    }

    #[test]
    fn test_custom_radius() {
        let lines = [seg(0.0, 0.0, 10.0, 0.0)];
        let magnet = Magnet::with_radius(2.0);
        assert!(magnet.find(&lines, Point::new(3.0, 0.0)).is_none());
        assert!(magnet.find(&lines, Point::new(1.0, 1.0)).is_some());
    }
}
