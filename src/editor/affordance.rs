//! Fixed on-surface buttons.
//!
//! The renderer draws these at fixed positions relative to the drawing
//! surface origin; the editor hit-tests clicks against the same regions.

use crate::geometry::{BoundingBox, Point};

/// "Complete polygon" button, shown once a polygon has enough vertices.
pub const COMPLETE_POLYGON_REGION: BoundingBox = BoundingBox::new(10.0, 45.0, 120.0, 25.0);

/// "Accept" button, shown with a smart detection preview.
pub const ACCEPT_PREVIEW_REGION: BoundingBox = BoundingBox::new(10.0, 45.0, 150.0, 25.0);

/// "Reject" button, shown with a smart detection preview.
pub const REJECT_PREVIEW_REGION: BoundingBox = BoundingBox::new(170.0, 45.0, 100.0, 25.0);

/// A clickable button drawn over the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Affordance {
    CompletePolygon,
    AcceptPreview,
    RejectPreview,
}

impl Affordance {
    /// Hit region in surface coordinates.
    pub fn region(&self) -> BoundingBox {
        match self {
            Affordance::CompletePolygon => COMPLETE_POLYGON_REGION,
            Affordance::AcceptPreview => ACCEPT_PREVIEW_REGION,
            Affordance::RejectPreview => REJECT_PREVIEW_REGION,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Affordance::CompletePolygon => "Complete Polygon",
            Affordance::AcceptPreview => "✓ Accept",
            Affordance::RejectPreview => "✗ Reject",
        }
    }

    /// Whether a click lands on this button (edges included).
    pub fn hit(&self, point: &Point) -> bool {
        self.region().contains(point)
    }
}
