//! Tests for the smart detection tool.

use super::*;
use crate::detection::{CapturedFrame, DetectionError, ModelStatus, ScriptedRuntime};
use crate::editor::{
    ACCEPT_PREVIEW_REGION, Affordance, EditingState, HelpHint, REJECT_PREVIEW_REGION, SmartState,
};
use crate::geometry::BoundingBox;
use crate::model::AnnotationKind;

/// A car at surface (100, 100, 100, 100) once mapped from the 640 grid onto a 640x500 frame.
fn car_runtime() -> ScriptedRuntime {
    ScriptedRuntime::with_boxes(&[(BoundingBox::new(100.0, 128.0, 100.0, 128.0), "car", 0.9)])
}

fn request(engine: &mut TestEngine, x: f32, y: f32) -> EventOutcome {
    engine.handle_pointer(PointerEvent::double_click(x, y))
}

fn accept(engine: &mut TestEngine) -> EventOutcome {
    let button = ACCEPT_PREVIEW_REGION.center();
    click(engine, button.x, button.y)
}

#[test]
fn test_detection_preview_and_accept() {
    let mut engine = engine_with(car_runtime());
    engine.set_tool(ToolMode::Smart);
    engine.set_category("Vehicle");
    assert_eq!(engine.model_status(), ModelStatus::Ready, "preloaded on tool select");
    assert_eq!(engine.overlay().help, HelpHint::AiReady);

    let EventOutcome::DetectionRequested(ticket) = request(&mut engine, 150.0, 150.0) else {
        panic!("detection not requested");
    };
    assert!(engine.is_detecting());
    assert_eq!(
        engine.overlay().help.text().as_deref(),
        Some("🤖 AI detection in progress...")
    );

    assert_eq!(engine.poll_detections(), vec![EventOutcome::PreviewReady(ticket)]);

    let detection = engine.state().preview().expect("preview").clone();
    assert_eq!(detection.object_class, "car");
    let bbox = BoundingBox::from_points(&detection.polygon).unwrap();
    assert!((bbox.x - 100.0).abs() < 1e-3);
    assert!((bbox.y - 100.0).abs() < 1e-3);
    assert!((bbox.width - 100.0).abs() < 1e-3);
    assert!((bbox.height - 100.0).abs() < 1e-3);

    let overlay = engine.overlay();
    assert!(overlay.preview.is_some());
    assert_eq!(
        overlay.affordances,
        vec![Affordance::AcceptPreview, Affordance::RejectPreview]
    );
    assert!(engine.store().is_empty(), "nothing committed before accept");

    let EventOutcome::PreviewAccepted(id) = accept(&mut engine) else {
        panic!("preview not accepted");
    };
    let annotation = engine.store().get(&id).unwrap();
    assert_eq!(annotation.kind, AnnotationKind::Polygon);
    assert_eq!(annotation.category, "Vehicle");
    assert_eq!(annotation.confidence, Some(0.85));
    assert_eq!(annotation.points, detection.polygon);
    assert!(matches!(engine.state(), EditingState::Smart(SmartState::Idle)));
}

#[test]
fn test_unavailable_model_falls_back_to_square() {
    let mut engine = engine();
    engine.set_tool(ToolMode::Smart);
    assert!(matches!(engine.model_status(), ModelStatus::Failed(_)));
    assert_eq!(
        engine.overlay().help.text().as_deref(),
        Some("❌ AI model failed to load - Using fallback")
    );

    request(&mut engine, 200.0, 150.0);
    engine.poll_detections();

    let detection = engine.state().preview().expect("preview");
    assert!(detection.is_fallback());
    assert_eq!(detection.object_class, "unknown");
    assert_eq!(
        detection.polygon,
        BoundingBox::new(160.0, 110.0, 80.0, 80.0).to_quad()
    );

    assert!(matches!(accept(&mut engine), EventOutcome::PreviewAccepted(_)));
    assert_eq!(engine.current_annotations()[0].confidence, Some(0.85));
}

#[test]
fn test_reject_button_discards_preview() {
    let mut engine = engine_with(car_runtime());
    engine.set_tool(ToolMode::Smart);
    request(&mut engine, 150.0, 150.0);
    engine.poll_detections();

    let button = REJECT_PREVIEW_REGION.center();
    assert_eq!(click(&mut engine, button.x, button.y), EventOutcome::PreviewRejected);
    assert!(engine.store().is_empty());
    assert!(engine.state().is_idle());
}

#[test]
fn test_secondary_click_rejects_preview() {
    let mut engine = engine_with(car_runtime());
    engine.set_tool(ToolMode::Smart);
    request(&mut engine, 150.0, 150.0);
    engine.poll_detections();

    assert_eq!(
        engine.handle_pointer(PointerEvent::secondary_click(0.0, 0.0)),
        EventOutcome::PreviewRejected
    );
    assert!(engine.store().is_empty());
}

#[test]
fn test_clicks_off_the_buttons_keep_preview() {
    let mut engine = engine_with(car_runtime());
    engine.set_tool(ToolMode::Smart);
    request(&mut engine, 150.0, 150.0);
    engine.poll_detections();

    assert_eq!(click(&mut engine, 400.0, 400.0), EventOutcome::Ignored);
    assert_eq!(request(&mut engine, 150.0, 150.0), EventOutcome::Ignored);
    assert!(engine.state().preview().is_some());
}

#[test]
fn test_input_suppressed_while_detecting() {
    let mut engine = engine_with(car_runtime());
    engine.set_tool(ToolMode::Smart);
    request(&mut engine, 150.0, 150.0);

    assert_eq!(request(&mut engine, 300.0, 300.0), EventOutcome::Ignored);
    assert_eq!(click(&mut engine, 150.0, 150.0), EventOutcome::Ignored);
    assert_eq!(
        engine.handle_pointer(PointerEvent::secondary_click(0.0, 0.0)),
        EventOutcome::Ignored
    );
    assert_eq!(engine.pending_detections(), 1, "only one request in flight");
}

#[test]
fn test_stale_detection_is_discarded_after_frame_change() {
    let mut engine = engine_with(car_runtime());
    engine.set_tool(ToolMode::Smart);
    let EventOutcome::DetectionRequested(ticket) = request(&mut engine, 150.0, 150.0) else {
        panic!("detection not requested");
    };

    engine.set_frame(1, 1.0 / 30.0);

    assert_eq!(
        engine.poll_detections(),
        vec![EventOutcome::DetectionDiscarded(ticket)]
    );
    assert!(engine.state().preview().is_none());
    assert!(engine.state().is_idle());
    assert!(engine.store().is_empty());
}

#[test]
fn test_stale_detection_is_discarded_after_tool_round_trip() {
    let mut engine = engine_with(car_runtime());
    engine.set_tool(ToolMode::Smart);
    let EventOutcome::DetectionRequested(ticket) = request(&mut engine, 150.0, 150.0) else {
        panic!("detection not requested");
    };

    engine.set_tool(ToolMode::Edit);
    engine.set_tool(ToolMode::Smart);

    assert_eq!(
        engine.poll_detections(),
        vec![EventOutcome::DetectionDiscarded(ticket)]
    );
    assert!(engine.state().is_idle());
}

#[test]
fn test_capture_unavailable_aborts_request() {
    let mut engine = engine_with(car_runtime());
    engine.set_tool(ToolMode::Smart);
    engine.frames_mut().set_frame(None);

    assert_eq!(
        request(&mut engine, 150.0, 150.0),
        EventOutcome::DetectionAborted(DetectionError::FrameCaptureUnavailable)
    );
    assert!(engine.state().is_idle());
    assert_eq!(engine.pending_detections(), 0);

    engine
        .frames_mut()
        .set_frame(Some(CapturedFrame::solid(640, 500, [90, 90, 90])));
    assert!(matches!(
        request(&mut engine, 150.0, 150.0),
        EventOutcome::DetectionRequested(_)
    ));
}

#[test]
fn test_accept_preview_directly() {
    let mut engine = engine_with(car_runtime());
    engine.set_tool(ToolMode::Smart);
    assert_eq!(engine.accept_preview(), EventOutcome::Ignored);
    assert_eq!(engine.reject_preview(), EventOutcome::Ignored);

    request(&mut engine, 150.0, 150.0);
    engine.poll_detections();

    assert!(matches!(engine.accept_preview(), EventOutcome::PreviewAccepted(_)));
    assert_eq!(engine.store().len(), 1);
    assert!(engine.undo());
    assert!(engine.store().is_empty());
}
