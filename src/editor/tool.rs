//! Tool modes.

use serde::{Deserialize, Serialize};

/// The active interaction mode; decides how pointer events are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolMode {
    /// Click to place polygon vertices
    #[default]
    Polygon,
    /// Click two opposite corners
    Rectangle,
    /// Select an annotation and drag its vertices
    Edit,
    /// Click an annotation to delete it
    Delete,
    /// Double-click an object to detect it
    Smart,
}

impl ToolMode {
    /// Get the display name for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            ToolMode::Polygon => "Polygon",
            ToolMode::Rectangle => "Rectangle",
            ToolMode::Edit => "Edit",
            ToolMode::Delete => "Delete",
            ToolMode::Smart => "Smart",
        }
    }

    /// Get all available tools.
    pub fn all() -> &'static [ToolMode] {
        &[
            ToolMode::Polygon,
            ToolMode::Rectangle,
            ToolMode::Edit,
            ToolMode::Delete,
            ToolMode::Smart,
        ]
    }

    /// Manual drawing tools; selecting one pauses playback.
    pub fn is_drawing_tool(&self) -> bool {
        matches!(self, ToolMode::Polygon | ToolMode::Rectangle)
    }
}
