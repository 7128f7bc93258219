//! Headless session replay.
//!
//! A `SessionScript` is a JSON list of host commands (tool changes, frame
//! changes, pointer events, undo/redo) played against an engine over a
//! synthetic frame. Model output can be scripted per session; without it
//! the detector runs as if the model failed to load.
//!
//! ```json
//! {
//!   "frameWidth": 640,
//!   "frameHeight": 500,
//!   "detections": [{ "class": "car", "score": 0.9, "bbox": { "x": 100, "y": 100, "width": 80, "height": 60 } }],
//!   "commands": [
//!     { "command": "setTool", "tool": "smart" },
//!     { "command": "pointer", "kind": "doubleClick", "x": 140, "y": 130 },
//!     { "command": "waitForDetections" },
//!     { "command": "acceptPreview" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, EngineConfig};
use crate::detection::{
    DEFAULT_INPUT_SIZE, DetectionBackend, DetectionService, FrameSource, InlineDetector,
    ScriptedRuntime, StaticFrame, UnavailableRuntime,
};
use crate::editor::{
    AnnotationEngine, EventOutcome, OverlaySummary, PointerEvent, PointerEventKind,
    SummaryRenderer, ToolMode,
};
use crate::geometry::BoundingBox;
use crate::model::Annotation;
use crate::store::StoreSummary;

// ============================================================================
// Script
// ============================================================================

/// One object the scripted model reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedDetection {
    pub class: String,
    pub score: f32,
    /// Box in frame pixels
    pub bbox: BoundingBox,
}

/// A host action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    SetTool {
        tool: ToolMode,
    },
    #[serde(rename_all = "camelCase")]
    SetFrame {
        frame: u64,
        /// Defaults to the frame's time at the configured rate
        #[serde(default)]
        timestamp: Option<f64>,
    },
    SetPlaying {
        playing: bool,
    },
    SetCategory {
        category: String,
    },
    Pointer {
        kind: PointerEventKind,
        x: f32,
        y: f32,
    },
    Undo,
    Redo,
    ClearAll,
    /// Apply every finished detection
    WaitForDetections,
    AcceptPreview,
    RejectPreview,
}

fn default_frame_width() -> u32 {
    640
}

fn default_frame_height() -> u32 {
    500
}

/// A recorded editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionScript {
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
    /// Model output for every inference; `None` means the model never loads
    #[serde(default)]
    pub detections: Option<Vec<ScriptedDetection>>,
    pub commands: Vec<Command>,
}

impl SessionScript {
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> Result<Self, ReplayError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Scripted model answering with this session's detections.
    ///
    /// Frame-pixel boxes are converted to input-grid units.
    fn runtime(&self, detections: &[ScriptedDetection]) -> ScriptedRuntime {
        let grid = DEFAULT_INPUT_SIZE as f32;
        let scale_x = grid / self.frame_width as f32;
        let scale_y = grid / self.frame_height as f32;

        let boxes: Vec<(BoundingBox, &str, f32)> = detections
            .iter()
            .map(|d| {
                let bbox = BoundingBox::new(
                    d.bbox.x * scale_x,
                    d.bbox.y * scale_y,
                    d.bbox.width * scale_x,
                    d.bbox.height * scale_y,
                );
                (bbox, d.class.as_str(), d.score)
            })
            .collect();

        ScriptedRuntime::with_boxes(&boxes)
    }
}

// ============================================================================
// Replay
// ============================================================================

/// Final state of a replayed session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    /// Every annotation in insertion order
    pub annotations: Vec<Annotation>,
    pub summary: StoreSummary,
    /// Overlay after the last command
    pub overlay: Option<OverlaySummary>,
    /// Commands whose commit was refused by validation or the store
    pub rejected_commands: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Errors that can occur while replaying a session.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse session script: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid session script: {0}")]
    InvalidScript(String),
}

/// Play a script against a fresh engine.
pub fn run_script(script: &SessionScript, config: &EngineConfig) -> Result<ReplayReport, ReplayError> {
    config.validate()?;
    if script.frame_width == 0 || script.frame_height == 0 {
        return Err(ReplayError::InvalidScript(format!(
            "frame size {}x{} is empty",
            script.frame_width, script.frame_height
        )));
    }

    let service = match &script.detections {
        Some(detections) => {
            DetectionService::new(script.runtime(detections), config.detection.clone())
        }
        None => DetectionService::new(UnavailableRuntime::default(), config.detection.clone()),
    };
    let frames = StaticFrame::blank(script.frame_width, script.frame_height);
    let mut engine = AnnotationEngine::new(config, InlineDetector::new(service), frames);
    let mut renderer = SummaryRenderer::new();
    let mut rejected_commands = 0;

    log::info!("Replaying {} commands", script.commands.len());
    for (index, command) in script.commands.iter().enumerate() {
        let outcomes = apply(&mut engine, config, command);
        for outcome in &outcomes {
            log::debug!("#{} {:?} -> {:?}", index, command, outcome);
            if matches!(
                outcome,
                EventOutcome::Rejected(_) | EventOutcome::StoreRejected(_)
            ) {
                rejected_commands += 1;
            }
        }
        engine.render(&mut renderer);
    }

    engine.poll_detections();
    let report = ReplayReport {
        annotations: engine.all_annotations().into_iter().cloned().collect(),
        summary: engine.summary(),
        overlay: renderer.last().cloned(),
        rejected_commands,
        can_undo: engine.can_undo(),
        can_redo: engine.can_redo(),
    };
    engine.shutdown();

    log::info!(
        "Replay finished: {} annotations on {} frames",
        report.summary.total_annotations,
        report.summary.annotated_frames
    );
    Ok(report)
}

fn apply<B: DetectionBackend, F: FrameSource>(
    engine: &mut AnnotationEngine<B, F>,
    config: &EngineConfig,
    command: &Command,
) -> Vec<EventOutcome> {
    let outcome = match command {
        Command::SetTool { tool } => {
            if engine.set_tool(*tool) {
                engine.set_playing(false);
            }
            EventOutcome::StateChanged
        }
        Command::SetFrame { frame, timestamp } => {
            let timestamp = timestamp.unwrap_or(*frame as f64 / config.fps);
            engine.set_frame(*frame, timestamp);
            EventOutcome::StateChanged
        }
        Command::SetPlaying { playing } => {
            engine.set_playing(*playing);
            EventOutcome::StateChanged
        }
        Command::SetCategory { category } => {
            engine.set_category(category.clone());
            EventOutcome::StateChanged
        }
        Command::Pointer { kind, x, y } => engine.handle_pointer(PointerEvent::new(*kind, *x, *y)),
        Command::Undo => {
            engine.undo();
            EventOutcome::StateChanged
        }
        Command::Redo => {
            engine.redo();
            EventOutcome::StateChanged
        }
        Command::ClearAll => {
            engine.clear_all();
            EventOutcome::StateChanged
        }
        Command::WaitForDetections => return engine.poll_detections(),
        Command::AcceptPreview => engine.accept_preview(),
        Command::RejectPreview => engine.reject_preview(),
    };
    vec![outcome]
}
