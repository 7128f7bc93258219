//! Scenario tests for the annotation engine.
//!
//! Each test drives an engine through pointer events the way a host would
//! and checks the store, the editing state and the overlay.

mod edit_tests;
mod smart_tests;

use super::{AnnotationEngine, EventOutcome, PointerEvent, ToolMode};
use crate::config::EngineConfig;
use crate::detection::{
    DetectionConfig, DetectionService, InlineDetector, ModelRuntime, StaticFrame,
    UnavailableRuntime,
};
use crate::geometry::Point;
use crate::model::AnnotationId;

type TestEngine = AnnotationEngine<InlineDetector, StaticFrame>;

/// Engine over a blank 640x500 frame whose model never loads.
fn engine() -> TestEngine {
    engine_with(UnavailableRuntime::default())
}

/// Engine over a blank 640x500 frame with the given model.
fn engine_with(runtime: impl ModelRuntime + 'static) -> TestEngine {
    let config = EngineConfig::default();
    let detection = DetectionConfig {
        warm_up: false,
        ..config.detection.clone()
    };
    let backend = InlineDetector::new(DetectionService::new(runtime, detection));
    AnnotationEngine::new(&config, backend, StaticFrame::blank(640, 500))
}

fn click(engine: &mut TestEngine, x: f32, y: f32) -> EventOutcome {
    engine.handle_pointer(PointerEvent::primary_click(x, y))
}

/// Draw and finalize a polygon through pointer events.
///
/// The closing double-click arrives the way hosts send it: a second click on
/// the last vertex followed by the double-click itself.
fn draw_polygon(engine: &mut TestEngine, points: &[(f32, f32)]) -> AnnotationId {
    engine.set_tool(ToolMode::Polygon);
    for &(x, y) in points {
        click(engine, x, y);
    }
    let last = points[points.len() - 1];
    click(engine, last.0, last.1);
    match engine.handle_pointer(PointerEvent::double_click(last.0, last.1)) {
        EventOutcome::Committed(id) => id,
        other => panic!("polygon not committed: {:?}", other),
    }
}

/// Draw a rectangle through two clicks.
fn draw_rectangle(engine: &mut TestEngine, start: (f32, f32), end: (f32, f32)) -> AnnotationId {
    engine.set_tool(ToolMode::Rectangle);
    click(engine, start.0, start.1);
    match click(engine, end.0, end.1) {
        EventOutcome::Committed(id) => id,
        other => panic!("rectangle not committed: {:?}", other),
    }
}

fn pts(points: &[(f32, f32)]) -> Vec<Point> {
    points.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

const TRIANGLE: [(f32, f32); 3] = [(200.0, 200.0), (300.0, 200.0), (250.0, 300.0)];
