//! Pointer-driven annotation engine.
//!
//! `AnnotationEngine` turns pointer events into store commands and
//! detection requests. Transient state lives in a tagged `EditingState`;
//! each pointer event kind has one dispatch function that matches on it.
//! Frame, tool and playback changes drop all transient state and bump the
//! generation so in-flight detections can be recognized as stale.

use serde::{Deserialize, Serialize};

use super::affordance::Affordance;
use super::render::{Overlay, Renderer};
use super::state::{EditingState, RectangleDraft, SmartState, VertexDrag};
use super::tool::ToolMode;
use crate::config::EngineConfig;
use crate::detection::{
    DetectionBackend, DetectionError, DetectionRequest, DetectionTicket, FrameSource, ModelStatus,
};
use crate::geometry::{
    self, BoundingBox, GeometryError, MIN_POLYGON_VERTICES, MIN_VERTEX_SPACING, Point, Size,
};
use crate::model::{Annotation, AnnotationId, AnnotationKind, AnnotationPatch};
use crate::store::{AnnotationStore, StoreError, StoreSummary};

// ============================================================================
// Configuration
// ============================================================================

/// Interaction tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditingConfig {
    /// Distance in surface pixels within which a vertex counts as hovered
    pub vertex_hover_radius: f32,
    /// Confidence stored on accepted smart detections
    pub accept_confidence: f32,
    /// Start loading the model when the smart tool is selected
    pub preload_on_smart: bool,
}

impl Default for EditingConfig {
    fn default() -> Self {
        Self {
            vertex_hover_radius: 10.0,
            accept_confidence: 0.85,
            preload_on_smart: true,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Kind of pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PointerEventKind {
    PrimaryClick,
    SecondaryClick,
    DoubleClick,
    Move,
    Down,
    Up,
}

/// Pointer input in drawing-surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub position: Point,
}

impl PointerEvent {
    pub fn new(kind: PointerEventKind, x: f32, y: f32) -> Self {
        Self {
            kind,
            position: Point::new(x, y),
        }
    }

    pub fn primary_click(x: f32, y: f32) -> Self {
        Self::new(PointerEventKind::PrimaryClick, x, y)
    }

    pub fn secondary_click(x: f32, y: f32) -> Self {
        Self::new(PointerEventKind::SecondaryClick, x, y)
    }

    pub fn double_click(x: f32, y: f32) -> Self {
        Self::new(PointerEventKind::DoubleClick, x, y)
    }

    pub fn moved(x: f32, y: f32) -> Self {
        Self::new(PointerEventKind::Move, x, y)
    }

    pub fn down(x: f32, y: f32) -> Self {
        Self::new(PointerEventKind::Down, x, y)
    }

    pub fn up(x: f32, y: f32) -> Self {
        Self::new(PointerEventKind::Up, x, y)
    }
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Nothing changed
    Ignored,
    /// Transient state changed (point added, draft moved, hover changed)
    StateChanged,
    /// A new annotation was added
    Committed(AnnotationId),
    /// An annotation's geometry was updated
    Modified(AnnotationId),
    /// An annotation was deleted
    Deleted(AnnotationId),
    SelectionChanged(Option<AnnotationId>),
    /// Geometry validation refused the commit; drawing state kept
    Rejected(GeometryError),
    /// The store refused the command
    StoreRejected(StoreError),
    DetectionRequested(DetectionTicket),
    /// The request could not be made
    DetectionAborted(DetectionError),
    /// A detection arrived and is shown as a preview
    PreviewReady(DetectionTicket),
    /// A detection arrived for an outdated request and was dropped
    DetectionDiscarded(DetectionTicket),
    PreviewAccepted(AnnotationId),
    PreviewRejected,
}

impl EventOutcome {
    /// Whether the store changed.
    pub fn mutated_store(&self) -> bool {
        matches!(
            self,
            EventOutcome::Committed(_)
                | EventOutcome::Modified(_)
                | EventOutcome::Deleted(_)
                | EventOutcome::PreviewAccepted(_)
        )
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Owns the annotation store and the editing state for one video.
pub struct AnnotationEngine<B: DetectionBackend, F: FrameSource> {
    store: AnnotationStore,
    backend: B,
    frames: F,
    editing: EditingConfig,
    surface: Size,
    fps: f64,
    state: EditingState,
    frame_number: u64,
    timestamp: f64,
    playing: bool,
    category: String,
    /// Bumped whenever transient state is dropped
    generation: u64,
    next_ticket: u64,
}

impl<B: DetectionBackend, F: FrameSource> AnnotationEngine<B, F> {
    pub fn new(config: &EngineConfig, backend: B, frames: F) -> Self {
        Self {
            store: AnnotationStore::new(config.history),
            backend,
            frames,
            editing: config.editing.clone(),
            surface: config.surface,
            fps: config.fps,
            state: EditingState::default(),
            frame_number: 0,
            timestamp: 0.0,
            playing: false,
            category: config.default_category.clone(),
            generation: 0,
            next_ticket: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Host inputs
    // ------------------------------------------------------------------------

    /// Switch tools. Returns true if the host should pause playback.
    pub fn set_tool(&mut self, tool: ToolMode) -> bool {
        let pause = tool.is_drawing_tool() && self.playing;

        if tool != self.state.tool() {
            log::info!("Tool: {} -> {}", self.state.tool().name(), tool.name());
            self.reset_transient(tool);

            if tool == ToolMode::Smart
                && self.editing.preload_on_smart
                && self.backend.model_status() == ModelStatus::Unloaded
            {
                self.backend.preload();
            }
        }

        pause
    }

    /// Move to another frame. Transient state is dropped if the frame changes.
    pub fn set_frame(&mut self, frame_number: u64, timestamp: f64) {
        self.timestamp = timestamp;
        if frame_number != self.frame_number {
            log::debug!("Frame: {} -> {}", self.frame_number, frame_number);
            self.frame_number = frame_number;
            self.reset_transient(self.state.tool());
        }
    }

    /// Move to the frame shown at `seconds` of playback.
    pub fn set_playback_time(&mut self, seconds: f64) {
        let frame = (seconds.max(0.0) * self.fps).floor() as u64;
        self.set_frame(frame, seconds);
    }

    pub fn set_playing(&mut self, playing: bool) {
        if playing != self.playing {
            log::debug!("Playback: {}", if playing { "playing" } else { "paused" });
            self.playing = playing;
            self.reset_transient(self.state.tool());
        }
    }

    /// Category used for new annotations.
    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
        log::debug!("Category: {}", self.category);
    }

    fn reset_transient(&mut self, tool: ToolMode) {
        self.state = EditingState::for_tool(tool);
        self.generation += 1;
    }

    /// Dispatch a pointer event. Everything is ignored while playing.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> EventOutcome {
        if self.playing {
            log::trace!("Ignoring {:?} during playback", event.kind);
            return EventOutcome::Ignored;
        }

        let p = event.position;
        log::trace!(
            "Pointer: tool={:?}, pos=({:.1}, {:.1}), kind={:?}",
            self.state.tool(),
            p.x,
            p.y,
            event.kind
        );

        match event.kind {
            PointerEventKind::PrimaryClick => self.on_primary_click(p),
            PointerEventKind::SecondaryClick => self.on_secondary_click(),
            PointerEventKind::DoubleClick => self.on_double_click(p),
            PointerEventKind::Move => self.on_move(p),
            PointerEventKind::Down => self.on_down(p),
            PointerEventKind::Up => self.on_up(p),
        }
    }

    // ------------------------------------------------------------------------
    // Event dispatch
    // ------------------------------------------------------------------------

    fn on_primary_click(&mut self, p: Point) -> EventOutcome {
        match self.state.tool() {
            ToolMode::Polygon => self.add_polygon_point(p),
            ToolMode::Rectangle => self.place_rectangle_corner(p),
            ToolMode::Edit => self.select_at(p),
            ToolMode::Delete => self.delete_at(p),
            ToolMode::Smart => {
                if self.state.preview().is_none() {
                    EventOutcome::Ignored
                } else if Affordance::AcceptPreview.hit(&p) {
                    self.accept_preview()
                } else if Affordance::RejectPreview.hit(&p) {
                    self.reject_preview()
                } else {
                    EventOutcome::Ignored
                }
            }
        }
    }

    fn on_secondary_click(&mut self) -> EventOutcome {
        if let EditingState::Polygon { points } = &mut self.state {
            return match points.len() {
                0 => EventOutcome::Ignored,
                1 => {
                    points.clear();
                    log::debug!("Polygon: cleared");
                    EventOutcome::StateChanged
                }
                _ => {
                    points.pop();
                    log::debug!("Polygon: removed last vertex ({} left)", points.len());
                    EventOutcome::StateChanged
                }
            };
        }

        if self.state.pending_ticket().is_some() || self.state.is_idle() {
            return EventOutcome::Ignored;
        }

        let had_selection = self.state.selected().is_some();
        let had_preview = self.state.preview().is_some();
        self.state = EditingState::for_tool(self.state.tool());
        log::debug!("Cleared transient state");

        if had_preview {
            EventOutcome::PreviewRejected
        } else if had_selection {
            EventOutcome::SelectionChanged(None)
        } else {
            EventOutcome::StateChanged
        }
    }

    fn on_double_click(&mut self, p: Point) -> EventOutcome {
        match self.state.tool() {
            ToolMode::Polygon if self.state.in_progress_point_count() >= MIN_POLYGON_VERTICES => {
                self.finalize_polygon()
            }
            ToolMode::Smart if self.state.is_idle() => self.request_detection(p),
            _ => EventOutcome::Ignored,
        }
    }

    fn on_move(&mut self, p: Point) -> EventOutcome {
        match &mut self.state {
            EditingState::Rectangle { draft: Some(draft) } => {
                draft.end = p;
                EventOutcome::StateChanged
            }
            EditingState::Edit {
                drag: Some(drag), ..
            } => {
                drag.position = p;
                EventOutcome::StateChanged
            }
            EditingState::Edit {
                selected: Some(id),
                hovered,
                drag: None,
            } => {
                let radius = self.editing.vertex_hover_radius;
                let vertex = self
                    .store
                    .get(id)
                    .and_then(|annotation| annotation.vertex_near(&p, radius));
                if vertex == *hovered {
                    EventOutcome::Ignored
                } else {
                    *hovered = vertex;
                    EventOutcome::StateChanged
                }
            }
            _ => EventOutcome::Ignored,
        }
    }

    fn on_down(&mut self, p: Point) -> EventOutcome {
        match &mut self.state {
            EditingState::Edit {
                selected: Some(_),
                hovered: Some(index),
                drag,
            } if drag.is_none() => {
                *drag = Some(VertexDrag {
                    index: *index,
                    position: p,
                });
                log::debug!("Edit: started dragging vertex {}", index);
                EventOutcome::StateChanged
            }
            _ => EventOutcome::Ignored,
        }
    }

    fn on_up(&mut self, p: Point) -> EventOutcome {
        let (id, drag) = match &mut self.state {
            EditingState::Edit {
                selected: Some(id),
                drag,
                ..
            } => match drag.take() {
                Some(drag) => (id.clone(), drag),
                None => return EventOutcome::Ignored,
            },
            _ => return EventOutcome::Ignored,
        };

        let Some(annotation) = self.store.get(&id) else {
            return EventOutcome::Ignored;
        };
        let Some(points) = annotation.points_with_vertex_moved(drag.index, p) else {
            return EventOutcome::Ignored;
        };
        if points == annotation.points {
            log::debug!("Edit: vertex {} released in place", drag.index);
            return EventOutcome::StateChanged;
        }

        if let Err(e) = geometry::validate(&points) {
            log::warn!("Edit: vertex move rejected: {}", e);
            return EventOutcome::Rejected(e);
        }

        match self.store.update(&id, &AnnotationPatch::points(points)) {
            Ok(_) => {
                log::debug!("Edit: moved vertex {} of {}", drag.index, id);
                EventOutcome::Modified(id)
            }
            Err(e) => EventOutcome::StoreRejected(e),
        }
    }

    // ------------------------------------------------------------------------
    // Tool actions
    // ------------------------------------------------------------------------

    fn add_polygon_point(&mut self, p: Point) -> EventOutcome {
        let EditingState::Polygon { points } = &mut self.state else {
            return EventOutcome::Ignored;
        };

        if points.len() >= MIN_POLYGON_VERTICES && Affordance::CompletePolygon.hit(&p) {
            return self.finalize_polygon();
        }

        // Hosts deliver click, click, dblclick at one spot
        if points
            .last()
            .is_some_and(|last| last.distance_to(&p) < MIN_VERTEX_SPACING)
        {
            return EventOutcome::Ignored;
        }

        points.push(p);
        log::debug!(
            "Polygon: added vertex {} at ({:.1}, {:.1})",
            points.len(),
            p.x,
            p.y
        );
        EventOutcome::StateChanged
    }

    fn finalize_polygon(&mut self) -> EventOutcome {
        let EditingState::Polygon { points } = &self.state else {
            return EventOutcome::Ignored;
        };

        if let Err(e) = geometry::validate(points) {
            log::warn!("Polygon rejected: {}", e);
            return EventOutcome::Rejected(e);
        }

        let annotation = self.new_annotation(AnnotationKind::Polygon, points.clone());
        self.commit(annotation, ToolMode::Polygon)
    }

    fn place_rectangle_corner(&mut self, p: Point) -> EventOutcome {
        let EditingState::Rectangle { draft } = &mut self.state else {
            return EventOutcome::Ignored;
        };

        let start = match draft {
            Some(current) => {
                current.end = p;
                current.start
            }
            None => {
                *draft = Some(RectangleDraft { start: p, end: p });
                log::debug!("Rectangle: started at ({:.1}, {:.1})", p.x, p.y);
                return EventOutcome::StateChanged;
            }
        };

        let points = BoundingBox::from_corners(start, p).to_quad();
        if let Err(e) = geometry::validate(&points) {
            log::warn!("Rectangle rejected: {}", e);
            return EventOutcome::Rejected(e);
        }

        let annotation = self.new_annotation(AnnotationKind::Rectangle, points);
        self.commit(annotation, ToolMode::Rectangle)
    }

    fn select_at(&mut self, p: Point) -> EventOutcome {
        let hit = self.hit_test(&p);
        let EditingState::Edit {
            selected,
            hovered,
            drag,
        } = &mut self.state
        else {
            return EventOutcome::Ignored;
        };

        *selected = hit.clone();
        *hovered = None;
        *drag = None;
        log::debug!("Edit: selection {:?}", hit);
        EventOutcome::SelectionChanged(hit)
    }

    fn delete_at(&mut self, p: Point) -> EventOutcome {
        let Some(id) = self.hit_test(&p) else {
            return EventOutcome::Ignored;
        };

        match self.store.delete(&id) {
            Ok(_) => EventOutcome::Deleted(id),
            Err(e) => EventOutcome::StoreRejected(e),
        }
    }

    fn request_detection(&mut self, click: Point) -> EventOutcome {
        let frame = if self.frames.is_ready() {
            self.frames.capture()
        } else {
            None
        };
        let Some(frame) = frame else {
            log::info!("Smart detection skipped: frame capture unavailable");
            return EventOutcome::DetectionAborted(DetectionError::FrameCaptureUnavailable);
        };

        let ticket = DetectionTicket {
            id: self.next_ticket,
            generation: self.generation,
        };
        self.next_ticket += 1;

        self.backend.submit(DetectionRequest {
            ticket,
            frame,
            click,
            surface: self.surface,
        });
        self.state = EditingState::Smart(SmartState::Detecting { ticket });
        log::info!(
            "Smart detection #{} requested at ({:.1}, {:.1})",
            ticket.id,
            click.x,
            click.y
        );
        EventOutcome::DetectionRequested(ticket)
    }

    /// Commit the pending smart preview.
    pub fn accept_preview(&mut self) -> EventOutcome {
        let Some(detection) = self.state.preview() else {
            return EventOutcome::Ignored;
        };

        if let Err(e) = geometry::validate(&detection.polygon) {
            log::warn!("Smart preview rejected: {}", e);
            return EventOutcome::Rejected(e);
        }

        let annotation = self
            .new_annotation(AnnotationKind::Polygon, detection.polygon.clone())
            .with_confidence(self.editing.accept_confidence);
        match self.commit(annotation, ToolMode::Smart) {
            EventOutcome::Committed(id) => EventOutcome::PreviewAccepted(id),
            other => other,
        }
    }

    /// Drop the pending smart preview.
    pub fn reject_preview(&mut self) -> EventOutcome {
        if self.state.preview().is_none() {
            return EventOutcome::Ignored;
        }
        self.state = EditingState::Smart(SmartState::Idle);
        log::debug!("Smart preview rejected");
        EventOutcome::PreviewRejected
    }

    /// Apply finished detections. Stale ones are dropped.
    pub fn poll_detections(&mut self) -> Vec<EventOutcome> {
        let mut outcomes = Vec::new();

        while let Some(response) = self.backend.poll() {
            let ticket = response.ticket;
            if ticket.generation != self.generation || self.state.pending_ticket() != Some(ticket)
            {
                log::debug!(
                    "Discarding stale detection #{} (generation {}, current {})",
                    ticket.id,
                    ticket.generation,
                    self.generation
                );
                outcomes.push(EventOutcome::DetectionDiscarded(ticket));
                continue;
            }

            let detection = response.detection;
            log::info!(
                "Detected: {} ({:.1}% confidence)",
                detection.object_class,
                detection.confidence * 100.0
            );
            self.state = EditingState::Smart(SmartState::Preview { detection });
            outcomes.push(EventOutcome::PreviewReady(ticket));
        }

        outcomes
    }

    fn new_annotation(&self, kind: AnnotationKind, points: Vec<Point>) -> Annotation {
        Annotation::new(
            self.frame_number,
            self.timestamp,
            kind,
            points,
            self.category.clone(),
        )
    }

    /// Add to the store; on success reset the tool's transient state.
    fn commit(&mut self, annotation: Annotation, tool: ToolMode) -> EventOutcome {
        match self.store.add(annotation) {
            Ok(id) => {
                self.state = EditingState::for_tool(tool);
                EventOutcome::Committed(id)
            }
            Err(e) => {
                log::warn!("Commit refused: {}", e);
                EventOutcome::StoreRejected(e)
            }
        }
    }

    /// First annotation on the current frame containing the point.
    fn hit_test(&self, p: &Point) -> Option<AnnotationId> {
        self.store
            .frame(self.frame_number)
            .iter()
            .find(|annotation| annotation.contains_point(p))
            .map(|annotation| annotation.id.clone())
    }

    // ------------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        let undone = self.store.undo();
        if undone {
            self.prune_selection();
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.store.redo();
        if redone {
            self.prune_selection();
        }
        redone
    }

    /// Remove every annotation and forget the history.
    pub fn clear_all(&mut self) {
        self.store.clear_all();
        self.prune_selection();
    }

    fn prune_selection(&mut self) {
        if let EditingState::Edit {
            selected,
            hovered,
            drag,
        } = &mut self.state
        {
            if selected.as_ref().is_some_and(|id| self.store.get(id).is_none()) {
                *selected = None;
                *hovered = None;
                *drag = None;
            }
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    /// Every annotation in insertion order.
    pub fn all_annotations(&self) -> Vec<&Annotation> {
        self.store.all()
    }

    /// Annotations on the current frame.
    pub fn current_annotations(&self) -> &[Annotation] {
        self.store.frame(self.frame_number)
    }

    pub fn summary(&self) -> StoreSummary {
        self.store.summary()
    }

    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    pub fn in_progress_point_count(&self) -> usize {
        self.state.in_progress_point_count()
    }

    pub fn state(&self) -> &EditingState {
        &self.state
    }

    pub fn tool(&self) -> ToolMode {
        self.state.tool()
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a smart detection is in flight.
    pub fn is_detecting(&self) -> bool {
        self.state.pending_ticket().is_some()
    }

    /// Requests submitted to the backend without a polled response.
    pub fn pending_detections(&self) -> usize {
        self.backend.pending_count()
    }

    pub fn model_status(&self) -> ModelStatus {
        self.backend.model_status()
    }

    pub fn surface(&self) -> Size {
        self.surface
    }

    pub fn frames_mut(&mut self) -> &mut F {
        &mut self.frames
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Overlay for the current frame.
    pub fn overlay(&self) -> Overlay<'_> {
        Overlay::build(
            self.frame_number,
            self.playing,
            self.store.frame(self.frame_number),
            &self.state,
            &self.backend.model_status(),
        )
    }

    pub fn render(&self, renderer: &mut dyn Renderer) {
        renderer.render(&self.overlay());
    }

    /// Release the detection model.
    pub fn shutdown(&mut self) {
        self.backend.shutdown();
    }
}
