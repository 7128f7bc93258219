//! Transient editing state, one variant per tool mode.

use super::tool::ToolMode;
use crate::detection::{DetectionTicket, SmartDetection};
use crate::geometry::{self, Point};
use crate::model::AnnotationId;

/// Rectangle being drawn: the first corner plus the live pointer position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleDraft {
    pub start: Point,
    pub end: Point,
}

impl RectangleDraft {
    /// Outline as drawn from the start corner toward the pointer.
    pub fn outline(&self) -> Vec<Point> {
        geometry::rectangle_from_corners(self.start, self.end)
    }
}

/// A vertex of the selected annotation being dragged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexDrag {
    pub index: usize,
    /// Live pointer position
    pub position: Point,
}

/// Smart tool sub-state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SmartState {
    #[default]
    Idle,
    /// A request is in flight; other input is suppressed
    Detecting { ticket: DetectionTicket },
    /// A result waits for accept or reject
    Preview { detection: SmartDetection },
}

/// Everything the editor holds between events. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum EditingState {
    Polygon {
        points: Vec<Point>,
    },
    Rectangle {
        draft: Option<RectangleDraft>,
    },
    Edit {
        selected: Option<AnnotationId>,
        hovered: Option<usize>,
        drag: Option<VertexDrag>,
    },
    Delete,
    Smart(SmartState),
}

impl Default for EditingState {
    fn default() -> Self {
        Self::for_tool(ToolMode::default())
    }
}

impl EditingState {
    /// Fresh state for a tool.
    pub fn for_tool(tool: ToolMode) -> Self {
        match tool {
            ToolMode::Polygon => EditingState::Polygon { points: Vec::new() },
            ToolMode::Rectangle => EditingState::Rectangle { draft: None },
            ToolMode::Edit => EditingState::Edit {
                selected: None,
                hovered: None,
                drag: None,
            },
            ToolMode::Delete => EditingState::Delete,
            ToolMode::Smart => EditingState::Smart(SmartState::Idle),
        }
    }

    pub fn tool(&self) -> ToolMode {
        match self {
            EditingState::Polygon { .. } => ToolMode::Polygon,
            EditingState::Rectangle { .. } => ToolMode::Rectangle,
            EditingState::Edit { .. } => ToolMode::Edit,
            EditingState::Delete => ToolMode::Delete,
            EditingState::Smart(_) => ToolMode::Smart,
        }
    }

    /// Whether there is nothing to lose on reset.
    pub fn is_idle(&self) -> bool {
        *self == Self::for_tool(self.tool())
    }

    /// Points placed so far in the current drawing.
    pub fn in_progress_point_count(&self) -> usize {
        match self {
            EditingState::Polygon { points } => points.len(),
            EditingState::Rectangle { draft: Some(_) } => 1,
            _ => 0,
        }
    }

    pub fn selected(&self) -> Option<&AnnotationId> {
        match self {
            EditingState::Edit { selected, .. } => selected.as_ref(),
            _ => None,
        }
    }

    pub fn pending_ticket(&self) -> Option<DetectionTicket> {
        match self {
            EditingState::Smart(SmartState::Detecting { ticket }) => Some(*ticket),
            _ => None,
        }
    }

    pub fn preview(&self) -> Option<&SmartDetection> {
        match self {
            EditingState::Smart(SmartState::Preview { detection }) => Some(detection),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_tool_round_trips() {
        for tool in ToolMode::all() {
            let state = EditingState::for_tool(*tool);
            assert_eq!(state.tool(), *tool);
            assert!(state.is_idle());
            assert_eq!(state.in_progress_point_count(), 0);
        }
    }

    #[test]
    fn test_in_progress_counts() {
        let polygon = EditingState::Polygon {
            points: vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)],
        };
        assert_eq!(polygon.in_progress_point_count(), 2);
        assert!(!polygon.is_idle());

        let rectangle = EditingState::Rectangle {
            draft: Some(RectangleDraft {
                start: Point::new(0.0, 0.0),
                end: Point::new(3.0, 4.0),
            }),
        };
        assert_eq!(rectangle.in_progress_point_count(), 1);
    }
}
