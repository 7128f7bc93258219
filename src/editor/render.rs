//! What the renderer needs to draw one frame of editor state.

use serde::Serialize;

use super::affordance::Affordance;
use super::state::{EditingState, SmartState, VertexDrag};
use super::tool::ToolMode;
use crate::detection::ModelStatus;
use crate::geometry::Point;
use crate::model::{Annotation, AnnotationId};

/// Status line shown over the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpHint {
    None,
    ClickToStart,
    NeedMorePoints { points: usize, needed: usize },
    PolygonReady { points: usize },
    AiDetecting,
    AiReady,
    AiLoading,
    AiUnavailable,
}

impl HelpHint {
    pub(crate) fn for_state(state: &EditingState, model: &ModelStatus) -> Self {
        match state {
            EditingState::Polygon { points } => match points.len() {
                0 => HelpHint::ClickToStart,
                n if n < crate::geometry::MIN_POLYGON_VERTICES => HelpHint::NeedMorePoints {
                    points: n,
                    needed: crate::geometry::MIN_POLYGON_VERTICES - n,
                },
                n => HelpHint::PolygonReady { points: n },
            },
            EditingState::Smart(SmartState::Detecting { .. }) => HelpHint::AiDetecting,
            EditingState::Smart(_) => match model {
                ModelStatus::Ready => HelpHint::AiReady,
                ModelStatus::Loading | ModelStatus::Unloaded => HelpHint::AiLoading,
                ModelStatus::Failed(_) => HelpHint::AiUnavailable,
            },
            _ => HelpHint::None,
        }
    }

    pub fn text(&self) -> Option<String> {
        let text = match self {
            HelpHint::None => return None,
            HelpHint::ClickToStart => "Click to start polygon".to_string(),
            HelpHint::NeedMorePoints { points, needed } => {
                format!("Click to add point ({points} points) - Need {needed} more")
            }
            HelpHint::PolygonReady { points } => {
                format!("Polygon ready ({points} points) - Click Complete button")
            }
            HelpHint::AiDetecting => "🤖 AI detection in progress...".to_string(),
            HelpHint::AiReady => "🎯 AI Ready - Double-click on any object".to_string(),
            HelpHint::AiLoading => "⏳ Loading AI model... Please wait".to_string(),
            HelpHint::AiUnavailable => "❌ AI model failed to load - Using fallback".to_string(),
        };
        Some(text)
    }
}

/// Pointer cursor to show over the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorHint {
    #[default]
    Default,
    Crosshair,
    Pointer,
    Grab,
    Grabbing,
}

impl CursorHint {
    pub(crate) fn for_state(state: &EditingState, playing: bool) -> Self {
        if playing {
            return CursorHint::Default;
        }
        match state {
            EditingState::Polygon { .. } | EditingState::Rectangle { .. } | EditingState::Smart(_) => {
                CursorHint::Crosshair
            }
            EditingState::Edit { drag: Some(_), .. } => CursorHint::Grabbing,
            EditingState::Edit {
                hovered: Some(_), ..
            } => CursorHint::Grab,
            EditingState::Edit { .. } | EditingState::Delete => CursorHint::Pointer,
        }
    }

    /// CSS cursor name.
    pub fn css_name(&self) -> &'static str {
        match self {
            CursorHint::Default => "default",
            CursorHint::Crosshair => "crosshair",
            CursorHint::Pointer => "pointer",
            CursorHint::Grab => "grab",
            CursorHint::Grabbing => "grabbing",
        }
    }
}

/// Borrowed snapshot of everything drawn over the current frame.
#[derive(Debug, Clone)]
pub struct Overlay<'a> {
    pub frame_number: u64,
    pub tool: ToolMode,
    /// While playing only committed annotations are drawn
    pub playing: bool,
    /// Annotations on the current frame, in store order
    pub annotations: &'a [Annotation],
    pub selected: Option<&'a AnnotationId>,
    pub hovered_vertex: Option<usize>,
    pub drag: Option<VertexDrag>,
    /// In-progress polygon vertices
    pub polygon: &'a [Point],
    /// In-progress rectangle outline
    pub rectangle: Option<Vec<Point>>,
    /// Smart detection preview outline
    pub preview: Option<&'a [Point]>,
    pub affordances: Vec<Affordance>,
    pub help: HelpHint,
    pub cursor: CursorHint,
}

impl<'a> Overlay<'a> {
    pub(crate) fn build(
        frame_number: u64,
        playing: bool,
        annotations: &'a [Annotation],
        state: &'a EditingState,
        model: &ModelStatus,
    ) -> Self {
        let mut overlay = Overlay {
            frame_number,
            tool: state.tool(),
            playing,
            annotations,
            selected: None,
            hovered_vertex: None,
            drag: None,
            polygon: &[],
            rectangle: None,
            preview: None,
            affordances: Vec::new(),
            help: HelpHint::None,
            cursor: CursorHint::for_state(state, playing),
        };

        if playing {
            return overlay;
        }

        overlay.help = HelpHint::for_state(state, model);
        match state {
            EditingState::Polygon { points } => {
                overlay.polygon = points;
                if points.len() >= crate::geometry::MIN_POLYGON_VERTICES {
                    overlay.affordances.push(Affordance::CompletePolygon);
                }
            }
            EditingState::Rectangle { draft } => {
                overlay.rectangle = draft.map(|d| d.outline());
            }
            EditingState::Edit {
                selected,
                hovered,
                drag,
            } => {
                overlay.selected = selected.as_ref();
                overlay.hovered_vertex = *hovered;
                overlay.drag = *drag;
            }
            EditingState::Smart(SmartState::Preview { detection }) => {
                overlay.preview = Some(&detection.polygon);
                overlay.affordances.push(Affordance::AcceptPreview);
                overlay.affordances.push(Affordance::RejectPreview);
            }
            EditingState::Smart(_) | EditingState::Delete => {}
        }

        overlay
    }

    /// Owned, serializable digest of this overlay.
    pub fn summary(&self) -> OverlaySummary {
        OverlaySummary {
            frame_number: self.frame_number,
            tool: self.tool,
            annotations: self.annotations.len(),
            selected: self.selected.cloned(),
            in_progress_points: self.polygon.len() + usize::from(self.rectangle.is_some()),
            preview: self.preview.is_some(),
            help: self.help.text(),
            cursor: self.cursor.css_name(),
        }
    }
}

/// Serializable digest of an overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySummary {
    pub frame_number: u64,
    pub tool: ToolMode,
    pub annotations: usize,
    pub selected: Option<AnnotationId>,
    pub in_progress_points: usize,
    pub preview: bool,
    pub help: Option<String>,
    pub cursor: &'static str,
}

/// Draws editor overlays.
pub trait Renderer {
    fn render(&mut self, overlay: &Overlay<'_>);
}

/// Renderer that keeps a digest of every overlay it was handed.
#[derive(Debug, Default)]
pub struct SummaryRenderer {
    frames: Vec<OverlaySummary>,
}

impl SummaryRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&OverlaySummary> {
        self.frames.last()
    }

    pub fn frames(&self) -> &[OverlaySummary] {
        &self.frames
    }
}

impl Renderer for SummaryRenderer {
    fn render(&mut self, overlay: &Overlay<'_>) {
        let summary = overlay.summary();
        log::trace!("Overlay: {:?}", summary);
        self.frames.push(summary);
    }
}
