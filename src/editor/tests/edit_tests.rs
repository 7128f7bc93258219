//! Tests for selection and vertex dragging.

use super::*;
use crate::editor::{CursorHint, EditingState};
use crate::geometry::GeometryError;

/// Engine with one triangle on frame 0, edit tool active and the triangle selected.
fn selected_triangle() -> (TestEngine, AnnotationId) {
    let mut engine = engine();
    let id = draw_polygon(&mut engine, &TRIANGLE);
    engine.set_tool(ToolMode::Edit);
    assert_eq!(
        click(&mut engine, 250.0, 230.0),
        EventOutcome::SelectionChanged(Some(id.clone()))
    );
    (engine, id)
}

#[test]
fn test_click_selects_and_clears() {
    let (mut engine, id) = selected_triangle();
    assert_eq!(engine.state().selected(), Some(&id));
    assert_eq!(engine.overlay().selected, Some(&id));

    assert_eq!(
        click(&mut engine, 600.0, 450.0),
        EventOutcome::SelectionChanged(None)
    );
    assert_eq!(engine.state().selected(), None);
}

#[test]
fn test_hover_tracks_nearest_vertex() {
    let (mut engine, _) = selected_triangle();

    assert_eq!(
        engine.handle_pointer(PointerEvent::moved(305.0, 203.0)),
        EventOutcome::StateChanged
    );
    assert_eq!(engine.overlay().hovered_vertex, Some(1));
    assert_eq!(engine.overlay().cursor, CursorHint::Grab);

    // Same vertex again: nothing new
    assert_eq!(
        engine.handle_pointer(PointerEvent::moved(302.0, 201.0)),
        EventOutcome::Ignored
    );

    engine.handle_pointer(PointerEvent::moved(400.0, 400.0));
    assert_eq!(engine.overlay().hovered_vertex, None);
    assert_eq!(engine.overlay().cursor, CursorHint::Pointer);
}

#[test]
fn test_drag_moves_vertex() {
    let (mut engine, id) = selected_triangle();

    engine.handle_pointer(PointerEvent::moved(300.0, 200.0));
    assert_eq!(
        engine.handle_pointer(PointerEvent::down(300.0, 200.0)),
        EventOutcome::StateChanged
    );
    assert_eq!(engine.overlay().cursor, CursorHint::Grabbing);

    engine.handle_pointer(PointerEvent::moved(320.0, 210.0));
    assert_eq!(
        engine.overlay().drag.map(|d| d.position),
        Some(Point::new(320.0, 210.0))
    );

    assert_eq!(
        engine.handle_pointer(PointerEvent::up(320.0, 210.0)),
        EventOutcome::Modified(id.clone())
    );

    let annotation = engine.store().get(&id).unwrap();
    assert_eq!(annotation.points[1], Point::new(320.0, 210.0));
    assert_eq!(engine.state().selected(), Some(&id), "selection survives");
    assert_eq!(engine.store().undo_description(), Some("Update annotation"));

    assert!(engine.undo());
    assert_eq!(
        engine.store().get(&id).unwrap().points,
        pts(&TRIANGLE),
        "undo restores the original vertex"
    );
}

#[test]
fn test_invalid_drag_is_discarded() {
    let (mut engine, id) = selected_triangle();

    engine.handle_pointer(PointerEvent::moved(250.0, 300.0));
    engine.handle_pointer(PointerEvent::down(250.0, 300.0));

    // Flatten onto the opposite edge
    let outcome = engine.handle_pointer(PointerEvent::up(250.0, 200.0));

    assert_eq!(outcome, EventOutcome::Rejected(GeometryError::AreaTooSmall));
    assert_eq!(engine.store().get(&id).unwrap().points, pts(&TRIANGLE));
    assert!(matches!(
        engine.state(),
        EditingState::Edit {
            selected: Some(_),
            drag: None,
            ..
        }
    ));
}

#[test]
fn test_release_in_place_adds_no_history() {
    let (mut engine, id) = selected_triangle();

    engine.handle_pointer(PointerEvent::moved(300.0, 200.0));
    engine.handle_pointer(PointerEvent::down(300.0, 200.0));
    assert_eq!(
        engine.handle_pointer(PointerEvent::up(300.0, 200.0)),
        EventOutcome::StateChanged
    );

    assert_eq!(engine.store().get(&id).unwrap().points, pts(&TRIANGLE));
    assert_eq!(engine.store().undo_description(), Some("Add annotation"));
    assert!(engine.overlay().drag.is_none());
}

#[test]
fn test_down_without_hover_is_ignored() {
    let (mut engine, _) = selected_triangle();
    assert_eq!(
        engine.handle_pointer(PointerEvent::down(250.0, 230.0)),
        EventOutcome::Ignored
    );
    assert_eq!(
        engine.handle_pointer(PointerEvent::up(260.0, 240.0)),
        EventOutcome::Ignored
    );
}

#[test]
fn test_rectangle_corner_drag_stays_axis_aligned() {
    let mut engine = engine();
    let id = draw_rectangle(&mut engine, (100.0, 100.0), (200.0, 200.0));
    engine.set_tool(ToolMode::Edit);
    click(&mut engine, 150.0, 150.0);

    // Drag the bottom-right corner outward
    engine.handle_pointer(PointerEvent::moved(200.0, 200.0));
    engine.handle_pointer(PointerEvent::down(200.0, 200.0));
    let outcome = engine.handle_pointer(PointerEvent::up(250.0, 260.0));

    assert_eq!(outcome, EventOutcome::Modified(id.clone()));
    assert_eq!(
        engine.store().get(&id).unwrap().points,
        pts(&[(100.0, 100.0), (250.0, 100.0), (250.0, 260.0), (100.0, 260.0)])
    );
}

#[test]
fn test_undo_prunes_stale_selection() {
    let (mut engine, id) = selected_triangle();

    assert!(engine.undo());

    assert!(engine.store().get(&id).is_none());
    assert_eq!(engine.state().selected(), None);

    assert!(engine.redo());
    assert!(engine.store().get(&id).is_some());
}

#[test]
fn test_secondary_click_clears_selection() {
    let (mut engine, _) = selected_triangle();
    assert_eq!(
        engine.handle_pointer(PointerEvent::secondary_click(0.0, 0.0)),
        EventOutcome::SelectionChanged(None)
    );
    assert!(engine.state().is_idle());
}

#[test]
fn test_topmost_is_first_in_store_order() {
    let mut engine = engine();
    let first = draw_rectangle(&mut engine, (100.0, 100.0), (300.0, 300.0));
    let _second = draw_rectangle(&mut engine, (150.0, 150.0), (250.0, 250.0));

    engine.set_tool(ToolMode::Edit);
    assert_eq!(
        click(&mut engine, 200.0, 200.0),
        EventOutcome::SelectionChanged(Some(first))
    );
}
