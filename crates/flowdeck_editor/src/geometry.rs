// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection-path geometry: cubic Bézier curves through reroute points.
//!
//! The single primitive is [`curve`]; everything else composes it. All
//! coordinates here are unscaled graph coordinates; converting from the
//! render surface's screen space is the caller's job.

use flowdeck_graph::PathPoint;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// A point in unscaled graph coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl Point {
    /// Create a point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(self, other: Self) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<PathPoint> for Point {
    fn from(p: PathPoint) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<Point> for PathPoint {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

/// An axis-aligned rectangle (screen-space anchor geometry)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner
    pub min: Point,
    /// Bottom-right corner
    pub max: Point,
}

impl Rect {
    /// Build from corners
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Geometric center
    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Whether the rect contains a point
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// One cubic Bézier span of a path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicSegment {
    /// Start point
    pub from: Point,
    /// First control point
    pub ctrl1: Point,
    /// Second control point
    pub ctrl2: Point,
    /// End point
    pub to: Point,
}

impl CubicSegment {
    /// Evaluate the curve at `t` in `[0, 1]`
    pub fn point_at(&self, t: f64) -> Point {
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        Point::new(
            a * self.from.x + b * self.ctrl1.x + c * self.ctrl2.x + d * self.to.x,
            a * self.from.y + b * self.ctrl1.y + c * self.ctrl2.y + d * self.to.y,
        )
    }
}

/// A path descriptor: one or more chained cubic segments.
///
/// The render surface decides how to stroke it; the descriptor offers the
/// raw segments, an SVG path-data string, and a polyline sampling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathDescriptor {
    segments: Vec<CubicSegment>,
}

impl PathDescriptor {
    /// Wrap a list of chained segments
    pub fn from_segments(segments: Vec<CubicSegment>) -> Self {
        Self { segments }
    }

    /// The raw segments, in path order
    pub fn segments(&self) -> &[CubicSegment] {
        &self.segments
    }

    /// Start point of the path
    pub fn start(&self) -> Option<Point> {
        self.segments.first().map(|s| s.from)
    }

    /// End point of the path
    pub fn end(&self) -> Option<Point> {
        self.segments.last().map(|s| s.to)
    }

    /// SVG path data (`M x y C ...` with one `C` per segment)
    pub fn svg_path(&self) -> String {
        let mut d = String::new();
        for (i, seg) in self.segments.iter().enumerate() {
            if i == 0 {
                let _ = write!(d, "M {} {} ", seg.from.x, seg.from.y);
            }
            let _ = write!(
                d,
                "C {} {} {} {} {} {} ",
                seg.ctrl1.x, seg.ctrl1.y, seg.ctrl2.x, seg.ctrl2.y, seg.to.x, seg.to.y
            );
        }
        d.trim_end().to_owned()
    }

    /// Sample the path as a polyline, `samples` points per segment
    pub fn flatten(&self, samples: usize) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.segments.len() * samples + 1);
        for (i, seg) in self.segments.iter().enumerate() {
            let start = usize::from(i != 0);
            for step in start..=samples {
                points.push(seg.point_at(step as f64 / samples as f64));
            }
        }
        points
    }
}

/// Build one cubic segment between two points.
///
/// The control-point horizontal offset is `|end.x - start.x| * curvature`
/// and both control points are vertically aligned with their endpoint,
/// giving the characteristic horizontal S-curve for any vertical offset.
pub fn curve(start: Point, end: Point, curvature: f64) -> PathDescriptor {
    PathDescriptor::from_segments(vec![cubic(start, end, curvature)])
}

fn cubic(start: Point, end: Point, curvature: f64) -> CubicSegment {
    let offset = (end.x - start.x).abs() * curvature;
    CubicSegment {
        from: start,
        ctrl1: Point::new(start.x + offset, start.y),
        ctrl2: Point::new(end.x - offset, end.y),
        to: end,
    }
}

/// Curvature parameters for multi-segment reroute paths
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvatureProfile {
    /// Curvature of the first and last segment
    pub start_end: f64,
    /// Curvature of interior segments
    pub mid: f64,
}

impl Default for CurvatureProfile {
    fn default() -> Self {
        Self {
            start_end: 0.5,
            mid: 0.5,
        }
    }
}

fn chain(start: Point, via: &[Point], end: Point, profile: CurvatureProfile) -> Vec<CubicSegment> {
    let mut stops = Vec::with_capacity(via.len() + 2);
    stops.push(start);
    stops.extend_from_slice(via);
    stops.push(end);

    let count = stops.len() - 1;
    (0..count)
        .map(|i| {
            let curvature = if i == 0 || i == count - 1 {
                profile.start_end
            } else {
                profile.mid
            };
            cubic(stops[i], stops[i + 1], curvature)
        })
        .collect()
}

/// Build a path through reroute points as one continuous descriptor
pub fn routed_path(
    start: Point,
    via: &[Point],
    end: Point,
    profile: CurvatureProfile,
) -> PathDescriptor {
    PathDescriptor::from_segments(chain(start, via, end, profile))
}

/// Build a path through reroute points as independently addressable
/// per-segment descriptors (required when points are draggable)
pub fn routed_segments(
    start: Point,
    via: &[Point],
    end: Point,
    profile: CurvatureProfile,
) -> Vec<PathDescriptor> {
    chain(start, via, end, profile)
        .into_iter()
        .map(|seg| PathDescriptor::from_segments(vec![seg]))
        .collect()
}

/// Index of the segment nearest to `probe`.
///
/// This is the insertion ordinal for a new reroute point: a point dropped
/// on segment `i` goes into the points list at index `i`.
pub fn nearest_segment(segments: &[CubicSegment], probe: Point) -> usize {
    const SAMPLES: usize = 16;
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, seg) in segments.iter().enumerate() {
        for step in 0..=SAMPLES {
            let d = seg.point_at(step as f64 / SAMPLES as f64).distance(probe);
            if d < best_distance {
                best_distance = d;
                best = i;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_control_offsets() {
        // curve(0,0 -> 100,0) at curvature 0.5: control x-offsets equal 50
        let path = curve(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 0.5);
        let seg = path.segments()[0];
        assert_eq!(seg.ctrl1, Point::new(50.0, 0.0));
        assert_eq!(seg.ctrl2, Point::new(50.0, 0.0));
        assert_eq!(seg.from, Point::new(0.0, 0.0));
        assert_eq!(seg.to, Point::new(100.0, 0.0));
    }

    #[test]
    fn test_curve_offset_is_direction_independent() {
        // Right-to-left keeps the same |dx|-scaled offset, mirrored
        let path = curve(Point::new(100.0, 0.0), Point::new(0.0, 50.0), 0.5);
        let seg = path.segments()[0];
        assert_eq!(seg.ctrl1, Point::new(150.0, 0.0));
        assert_eq!(seg.ctrl2, Point::new(-50.0, 50.0));
    }

    #[test]
    fn test_routed_path_concatenates_independent_curves() {
        // One reroute point: the chained path equals two independently
        // computed two-point curves through that point.
        let start = Point::new(0.0, 0.0);
        let mid = Point::new(60.0, 40.0);
        let end = Point::new(200.0, 10.0);
        let profile = CurvatureProfile::default();

        let chained = routed_path(start, &[mid], end, profile);
        let first = curve(start, mid, profile.start_end);
        let second = curve(mid, end, profile.start_end);

        assert_eq!(chained.segments().len(), 2);
        assert_eq!(chained.segments()[0], first.segments()[0]);
        assert_eq!(chained.segments()[1], second.segments()[0]);
    }

    #[test]
    fn test_interior_segments_use_mid_curvature() {
        let profile = CurvatureProfile {
            start_end: 0.5,
            mid: 0.25,
        };
        let via = [Point::new(100.0, 0.0), Point::new(200.0, 0.0)];
        let path = routed_path(Point::new(0.0, 0.0), &via, Point::new(300.0, 0.0), profile);

        let segs = path.segments();
        assert_eq!(segs.len(), 3);
        // First and last: offset 100 * 0.5, interior: 100 * 0.25
        assert_eq!(segs[0].ctrl1.x, 50.0);
        assert_eq!(segs[1].ctrl1.x, 125.0);
        assert_eq!(segs[2].ctrl1.x, 250.0);
    }

    #[test]
    fn test_per_segment_descriptors_match_collapsed() {
        let start = Point::new(0.0, 0.0);
        let via = [Point::new(50.0, 50.0)];
        let end = Point::new(100.0, 0.0);
        let profile = CurvatureProfile::default();

        let collapsed = routed_path(start, &via, end, profile);
        let separate = routed_segments(start, &via, end, profile);
        assert_eq!(separate.len(), 2);
        assert_eq!(separate[0].segments()[0], collapsed.segments()[0]);
        assert_eq!(separate[1].segments()[0], collapsed.segments()[1]);
    }

    #[test]
    fn test_svg_path_data() {
        let path = curve(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 0.5);
        assert_eq!(path.svg_path(), "M 0 0 C 5 0 5 0 10 0");
    }

    #[test]
    fn test_flatten_shares_segment_joints() {
        let path = routed_path(
            Point::new(0.0, 0.0),
            &[Point::new(10.0, 10.0)],
            Point::new(20.0, 0.0),
            CurvatureProfile::default(),
        );
        let polyline = path.flatten(8);
        // 2 segments, 8 samples each, joint not duplicated
        assert_eq!(polyline.len(), 17);
        assert_eq!(polyline[0], Point::new(0.0, 0.0));
        assert_eq!(polyline[16], Point::new(20.0, 0.0));
    }

    #[test]
    fn test_nearest_segment_picks_insertion_ordinal() {
        let segs = chain(
            Point::new(0.0, 0.0),
            &[Point::new(100.0, 0.0)],
            Point::new(200.0, 0.0),
            CurvatureProfile::default(),
        );
        assert_eq!(nearest_segment(&segs, Point::new(30.0, 5.0)), 0);
        assert_eq!(nearest_segment(&segs, Point::new(170.0, 5.0)), 1);
    }
}
