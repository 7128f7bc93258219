//! Annotation types and data structures.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::geometry::{self, Point};

/// Opaque, client-generated annotation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(String);

impl AnnotationId {
    /// Wrap an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier: creation millis plus a process-wide sequence.
    pub fn generate() -> Self {
        static SEQUENCE: AtomicU64 = AtomicU64::new(0);
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}-{}", unix_millis(), seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnnotationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AnnotationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Milliseconds since the Unix epoch (0 if the clock is before the epoch).
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The geometric kind of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// Free-form closed polygon (3+ vertices)
    Polygon,
    /// Axis-aligned rectangle stored as 4 corners
    Rectangle,
}

impl AnnotationKind {
    /// Get the display name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationKind::Polygon => "polygon",
            AnnotationKind::Rectangle => "rectangle",
        }
    }
}

/// A labeled shape tied to one video frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Unique identifier.
    pub id: AnnotationId,
    /// Frame this annotation belongs to (store key).
    pub frame_number: u64,
    /// Playback time of the frame in seconds.
    pub timestamp: f64,
    /// Polygon or rectangle.
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    /// Vertices in drawing-surface coordinates.
    pub points: Vec<Point>,
    /// Category label.
    pub category: String,
    /// Model confidence, only for AI-derived annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
}

impl Annotation {
    /// Create a new annotation with a generated id and the current creation time.
    pub fn new(
        frame_number: u64,
        timestamp: f64,
        kind: AnnotationKind,
        points: Vec<Point>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: AnnotationId::generate(),
            frame_number,
            timestamp,
            kind,
            points,
            category: category.into(),
            confidence: None,
            created_at: Some(unix_millis()),
        }
    }

    /// Replace the generated id.
    pub fn with_id(mut self, id: impl Into<AnnotationId>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach a model confidence (clamped to [0, 1]).
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    /// Check if a surface point hits this annotation.
    ///
    /// Polygons use the ray casting test, rectangles their bounding box.
    pub fn contains_point(&self, point: &Point) -> bool {
        match self.kind {
            AnnotationKind::Polygon => geometry::point_in_polygon(point, &self.points),
            AnnotationKind::Rectangle => geometry::point_in_rectangle(point, &self.points),
        }
    }

    /// Index of the first vertex within `radius` of `point`.
    pub fn vertex_near(&self, point: &Point, radius: f32) -> Option<usize> {
        self.points
            .iter()
            .position(|v| v.distance_to(point) < radius)
    }

    /// Points after moving vertex `index` to `target`.
    ///
    /// Rectangles stay axis-aligned: the outline is re-derived from the
    /// dragged corner and the opposite corner.
    pub fn points_with_vertex_moved(&self, index: usize, target: Point) -> Option<Vec<Point>> {
        if index >= self.points.len() {
            return None;
        }

        match self.kind {
            AnnotationKind::Polygon => {
                let mut points = self.points.clone();
                points[index] = target;
                Some(points)
            }
            AnnotationKind::Rectangle => {
                if self.points.len() != 4 {
                    return None;
                }
                let anchor = self.points[(index + 2) % 4];
                let bbox = geometry::BoundingBox::from_corners(anchor, target);
                Some(bbox.to_quad())
            }
        }
    }

    /// Apply a partial update.
    pub fn apply(&mut self, patch: &AnnotationPatch) {
        if let Some(points) = &patch.points {
            self.points = points.clone();
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(confidence) = patch.confidence {
            self.confidence = confidence;
        }
    }
}

/// Partial update of an annotation's mutable fields.
///
/// Id, frame number and timestamp are fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPatch {
    pub points: Option<Vec<Point>>,
    pub kind: Option<AnnotationKind>,
    pub category: Option<String>,
    /// `Some(None)` clears the confidence.
    pub confidence: Option<Option<f32>>,
}

impl AnnotationPatch {
    /// Patch that only replaces the points.
    pub fn points(points: Vec<Point>) -> Self {
        Self {
            points: Some(points),
            ..Default::default()
        }
    }

    /// Patch that only replaces the category.
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Default::default()
        }
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.points.is_none()
            && self.kind.is_none()
            && self.category.is_none()
            && self.confidence.is_none()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rectangle() -> Annotation {
        Annotation::new(
            0,
            0.0,
            AnnotationKind::Rectangle,
            geometry::rectangle_from_corners(Point::new(10.0, 10.0), Point::new(50.0, 40.0)),
            "Vehicle",
        )
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = AnnotationId::generate();
        let b = AnnotationId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_contains_point_by_kind() {
        let rect = rectangle();
        assert!(rect.contains_point(&Point::new(30.0, 20.0)));
        assert!(!rect.contains_point(&Point::new(60.0, 20.0)));

        let triangle = Annotation::new(
            0,
            0.0,
            AnnotationKind::Polygon,
            vec![
                Point::new(0.0, 0.0),
                Point::new(40.0, 0.0),
                Point::new(0.0, 40.0),
            ],
            "Pothole",
        );
        assert!(triangle.contains_point(&Point::new(5.0, 5.0)));
        assert!(!triangle.contains_point(&Point::new(35.0, 35.0)));
    }

    #[test]
    fn test_vertex_near() {
        let rect = rectangle();
        assert_eq!(rect.vertex_near(&Point::new(52.0, 12.0), 10.0), Some(1));
        assert_eq!(rect.vertex_near(&Point::new(30.0, 25.0), 10.0), None);
    }

    #[test]
    fn test_rectangle_vertex_drag_stays_axis_aligned() {
        let rect = rectangle();
        // Drag bottom-right corner (index 2); anchor is top-left
        let moved = rect
            .points_with_vertex_moved(2, Point::new(70.0, 60.0))
            .unwrap();
        assert_eq!(
            moved,
            vec![
                Point::new(10.0, 10.0),
                Point::new(70.0, 10.0),
                Point::new(70.0, 60.0),
                Point::new(10.0, 60.0),
            ]
        );
        assert!(rect.points_with_vertex_moved(4, Point::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_apply_patch() {
        let mut ann = rectangle().with_confidence(0.9);
        ann.apply(&AnnotationPatch::category("Traffic Sign"));
        assert_eq!(ann.category, "Traffic Sign");
        assert_eq!(ann.confidence, Some(0.9));

        ann.apply(&AnnotationPatch {
            confidence: Some(None),
            ..Default::default()
        });
        assert_eq!(ann.confidence, None);
        assert!(AnnotationPatch::default().is_empty());
    }

    #[test]
    fn test_serialized_field_names() {
        let ann = rectangle().with_id("a1");
        let json = serde_json::to_string(&ann).unwrap();
        assert!(json.contains("\"frameNumber\":0"));
        assert!(json.contains("\"type\":\"rectangle\""));
        assert!(!json.contains("confidence"));
    }
}
