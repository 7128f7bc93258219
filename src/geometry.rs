//! Geometry primitives and polygon utilities.
//!
//! This module provides the pure geometry the rest of the crate builds on:
//! - Points, axis-aligned bounding boxes and IOU
//! - Polygon area, validation, smoothing and simplification
//! - Hit tests (ray casting for polygons, bbox containment for rectangles)
//! - Scaling between drawing-surface and video-frame pixel spaces

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum distance between two cyclically-consecutive polygon vertices.
pub const MIN_VERTEX_SPACING: f32 = 1.0;

/// Minimum shoelace area of a committable polygon.
pub const MIN_POLYGON_AREA: f32 = 10.0;

/// Minimum number of vertices of a committable polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

// ============================================================================
// Core Geometry Types
// ============================================================================

/// A 2D point. Surface or frame pixel space depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Midpoint between this point and another.
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Top-left corner X coordinate
    pub x: f32,
    /// Top-left corner Y coordinate
    pub y: f32,
    /// Width of the box
    pub width: f32,
    /// Height of the box
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a bounding box from two opposite corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        let x = p1.x.min(p2.x);
        let y = p1.y.min(p2.y);
        let width = (p1.x - p2.x).abs();
        let height = (p1.y - p2.y).abs();
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a bounding box from its center and size.
    pub fn from_center(center: Point, width: f32, height: f32) -> Self {
        Self::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            width,
            height,
        )
    }

    /// Smallest box enclosing all points, or None for an empty slice.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;

        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Get the center point of the box.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if a point is inside the box (edges included).
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Get the area of the box.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Intersection-over-union with another box. Zero when the union is empty.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let overlap_w =
            ((self.x + self.width).min(other.x + other.width) - self.x.max(other.x)).max(0.0);
        let overlap_h =
            ((self.y + self.height).min(other.y + other.height) - self.y.max(other.y)).max(0.0);
        let intersection = overlap_w * overlap_h;
        let union = self.area() + other.area() - intersection;

        if union > 0.0 { intersection / union } else { 0.0 }
    }

    /// The four corners as a quad: top-left, top-right, bottom-right, bottom-left.
    pub fn to_quad(&self) -> Vec<Point> {
        vec![
            Point::new(self.x, self.y),
            Point::new(self.x + self.width, self.y),
            Point::new(self.x + self.width, self.y + self.height),
            Point::new(self.x, self.y + self.height),
        ]
    }
}

/// Derive the 4-point rectangle outline from two corners as clicked.
///
/// The order follows the drag direction from `start`: start, (end.x, start.y),
/// end, (start.x, end.y). For a top-left to bottom-right drag this is
/// top-left, top-right, bottom-right, bottom-left.
pub fn rectangle_from_corners(start: Point, end: Point) -> Vec<Point> {
    vec![
        start,
        Point::new(end.x, start.y),
        end,
        Point::new(start.x, end.y),
    ]
}

// ============================================================================
// Validation
// ============================================================================

/// Reasons a polygon cannot be committed as an annotation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// Fewer than three vertices
    #[error("Polygon must have at least 3 points")]
    TooFewPoints,

    /// Two cyclically-consecutive vertices closer than one unit
    #[error("Polygon has duplicate points")]
    DuplicatePoints,

    /// Enclosed area below the minimum
    #[error("Polygon area too small")]
    AreaTooSmall,
}

/// Shoelace area of a polygon (absolute value).
pub fn area(polygon: &[Point]) -> f32 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }

    let mut twice_area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += polygon[i].x * polygon[j].y;
        twice_area -= polygon[j].x * polygon[i].y;
    }

    twice_area.abs() / 2.0
}

/// Check that a polygon is committable.
///
/// Checks run in order: vertex count, vertex spacing, area.
pub fn validate(polygon: &[Point]) -> Result<(), GeometryError> {
    if polygon.len() < MIN_POLYGON_VERTICES {
        return Err(GeometryError::TooFewPoints);
    }

    let n = polygon.len();
    for i in 0..n {
        let next = &polygon[(i + 1) % n];
        if polygon[i].distance_to(next) < MIN_VERTEX_SPACING {
            return Err(GeometryError::DuplicatePoints);
        }
    }

    if area(polygon) < MIN_POLYGON_AREA {
        return Err(GeometryError::AreaTooSmall);
    }

    Ok(())
}

// ============================================================================
// Smoothing / Simplification
// ============================================================================

/// Move every vertex toward the midpoint of its cyclic neighbours.
///
/// `factor` is clamped to [0, 1]: 0 leaves the polygon unchanged, 1 replaces
/// each vertex by the neighbour midpoint. Polygons with fewer than three
/// vertices are returned as-is.
pub fn smooth(polygon: &[Point], factor: f32) -> Vec<Point> {
    let n = polygon.len();
    if n < 3 {
        return polygon.to_vec();
    }

    let factor = factor.clamp(0.0, 1.0);
    (0..n)
        .map(|i| {
            let prev = &polygon[(i + n - 1) % n];
            let curr = &polygon[i];
            let next = &polygon[(i + 1) % n];
            let mid = prev.midpoint(next);
            Point::new(
                curr.x + factor * (mid.x - curr.x),
                curr.y + factor * (mid.y - curr.y),
            )
        })
        .collect()
}

/// Drop vertices that lie within `tolerance` of the segment joining the
/// previously kept vertex and the next raw vertex.
///
/// Single left-to-right pass; first and last vertices are always kept.
/// Polygons of three or fewer vertices are returned as-is.
pub fn simplify(polygon: &[Point], tolerance: f32) -> Vec<Point> {
    let n = polygon.len();
    if n <= 3 {
        return polygon.to_vec();
    }

    let mut kept = Vec::with_capacity(n);
    kept.push(polygon[0]);

    for i in 1..n - 1 {
        let prev = kept[kept.len() - 1];
        let curr = polygon[i];
        let next = polygon[i + 1];

        if point_to_segment_distance(&curr, &prev, &next) > tolerance {
            kept.push(curr);
        }
    }

    kept.push(polygon[n - 1]);
    kept
}

/// Distance from a point to the closest point of a segment.
pub fn point_to_segment_distance(point: &Point, start: &Point, end: &Point) -> f32 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let len_sq = dx * dx + dy * dy;

    // Degenerate segment: distance to its single point
    if len_sq == 0.0 {
        return point.distance_to(start);
    }

    let t = ((point.x - start.x) * dx + (point.y - start.y) * dy) / len_sq;
    let closest = if t < 0.0 {
        *start
    } else if t > 1.0 {
        *end
    } else {
        Point::new(start.x + t * dx, start.y + t * dy)
    };

    point.distance_to(&closest)
}

// ============================================================================
// Hit Testing
// ============================================================================

/// Point-in-polygon test using the ray casting parity rule.
pub fn point_in_polygon(point: &Point, polygon: &[Point]) -> bool {
    if polygon.len() < MIN_POLYGON_VERTICES {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let vi = &polygon[i];
        let vj = &polygon[j];

        if ((vi.y > point.y) != (vj.y > point.y))
            && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Bounding-box containment test for a 4-point rectangle outline.
pub fn point_in_rectangle(point: &Point, rectangle: &[Point]) -> bool {
    if rectangle.len() != 4 {
        return false;
    }

    BoundingBox::from_points(rectangle).is_some_and(|bbox| bbox.contains(point))
}

// ============================================================================
// Coordinate Spaces
// ============================================================================

/// Pixel dimensions of a drawing surface or a video frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Independent x/y scale factors between the drawing surface and the
/// native video frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceScale {
    /// Frame pixels per surface pixel, horizontally
    pub x: f32,
    /// Frame pixels per surface pixel, vertically
    pub y: f32,
}

impl SurfaceScale {
    /// Scale factors `native / surface` per axis.
    ///
    /// A zero or negative dimension on either side yields a factor of 1 on that axis.
    pub fn between(surface: Size, frame: Size) -> Self {
        fn factor(native: f32, surface: f32) -> f32 {
            if native > 0.0 && surface > 0.0 {
                native / surface
            } else {
                1.0
            }
        }

        Self {
            x: factor(frame.width, surface.width),
            y: factor(frame.height, surface.height),
        }
    }

    /// Surface coordinates to frame pixel coordinates.
    pub fn to_frame(&self, point: Point) -> Point {
        Point::new(point.x * self.x, point.y * self.y)
    }

    /// Frame pixel coordinates to surface coordinates.
    pub fn to_surface(&self, point: Point) -> Point {
        Point::new(point.x / self.x, point.y / self.y)
    }

    /// Map a whole polygon from frame pixels to surface coordinates.
    pub fn polygon_to_surface(&self, polygon: &[Point]) -> Vec<Point> {
        polygon.iter().map(|p| self.to_surface(*p)).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
