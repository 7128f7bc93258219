//! Editing state machine.
//!
//! Pointer events from the drawing surface are interpreted according to the
//! active tool and turned into store commands or detection requests. The
//! engine owns transient drawing state; the host owns playback and frames.

mod affordance;
mod engine;
mod render;
mod state;
mod tool;

pub use affordance::{
    ACCEPT_PREVIEW_REGION, Affordance, COMPLETE_POLYGON_REGION, REJECT_PREVIEW_REGION,
};
pub use engine::{AnnotationEngine, EditingConfig, EventOutcome, PointerEvent, PointerEventKind};
pub use render::{CursorHint, HelpHint, Overlay, OverlaySummary, Renderer, SummaryRenderer};
pub use state::{EditingState, RectangleDraft, SmartState, VertexDrag};
pub use tool::ToolMode;

#[cfg(test)]
mod tests;
