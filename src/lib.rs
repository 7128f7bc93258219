//! RVAT - Road Video Annotation Tool
//!
//! Frame-accurate polygon and rectangle annotation of road survey video,
//! with undo/redo and click-to-detect object outlines.
//!
//! The host (a GUI or the `rvat-replay` driver) owns playback and forwards
//! pointer events to an [`AnnotationEngine`]; the engine keeps the
//! annotation store, the editing state and the detection requests.

pub mod config;
pub mod detection;
pub mod editor;
pub mod geometry;
pub mod model;
pub mod replay;
pub mod store;

pub use config::{ConfigError, EngineConfig, LogLevel};
pub use editor::{AnnotationEngine, EventOutcome, PointerEvent, PointerEventKind, ToolMode};
pub use model::{Annotation, AnnotationId, AnnotationKind};
pub use store::AnnotationStore;
