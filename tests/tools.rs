mod common;

use canvas_engine::canvas::RasterBuffer;
use canvas_engine::tools::DispatchState;
use canvas_engine::tools::settings::ShapeKind;
use canvas_engine::{
    Color, EngineError, InputEvent, Modifiers, OperationKind, Pixel, ToolKind, ToolSwitch, Vec2,
};

use common::{changed_pixels, doc, is_background, stroke};

#[test]
fn cancel_restores_pre_stroke_pixels() {
    let mut doc = doc(64, 64);
    stroke(&mut doc, &[(10.0, 10.0), (20.0, 10.0)]);
    let before = doc.render().unwrap();
    let entries = doc.history().undo_len();

    doc.handle_event(InputEvent::down(5.0, 40.0)).unwrap();
    doc.handle_event(InputEvent::moved(60.0, 40.0)).unwrap();
    assert_ne!(doc.render().unwrap(), before);
    doc.handle_event(InputEvent::Cancel).unwrap();

    assert_eq!(doc.dispatch_state(), DispatchState::Idle);
    assert_eq!(doc.render().unwrap(), before);
    assert_eq!(doc.history().undo_len(), entries);
}

#[test]
fn lost_capture_and_escape_cancel_too() {
    let mut doc = doc(32, 32);
    let before = doc.render().unwrap();

    doc.handle_event(InputEvent::down(5.0, 5.0)).unwrap();
    doc.handle_event(InputEvent::LostCapture).unwrap();
    assert_eq!(doc.render().unwrap(), before);

    doc.handle_event(InputEvent::down(5.0, 5.0)).unwrap();
    doc.handle_event(InputEvent::key('\u{1b}')).unwrap();
    assert!(!doc.is_stroke_active());
    assert_eq!(doc.render().unwrap(), before);
    assert!(!doc.history().can_undo());
}

#[test]
fn release_outside_canvas_discards_the_stroke() {
    let mut doc = doc(64, 64);
    let before = doc.render().unwrap();

    doc.handle_event(InputEvent::down(10.0, 10.0)).unwrap();
    doc.handle_event(InputEvent::moved(200.0, 10.0)).unwrap();
    doc.handle_event(InputEvent::up(200.0, 10.0)).unwrap();

    assert_eq!(doc.render().unwrap(), before);
    assert!(!doc.history().can_undo());
}

#[test]
fn out_of_bounds_moves_are_clamped() {
    let mut doc = doc(64, 64);
    doc.handle_event(InputEvent::down(32.0, 32.0)).unwrap();
    doc.handle_event(InputEvent::moved(500.0, 32.0)).unwrap();
    doc.handle_event(InputEvent::up(63.0, 32.0)).unwrap();
    let composite = doc.render().unwrap();
    assert!(!is_background(composite.pixel(63, 32)));
    assert_eq!(doc.history().undo_len(), 1);
}

#[test]
fn pointer_leave_commits() {
    let mut doc = doc(64, 64);
    doc.handle_event(InputEvent::down(10.0, 10.0)).unwrap();
    doc.handle_event(InputEvent::moved(30.0, 10.0)).unwrap();
    doc.handle_event(InputEvent::PointerLeave { timestamp: 5 }).unwrap();
    assert!(!doc.is_stroke_active());
    assert_eq!(doc.history().undo_len(), 1);
}

#[test]
fn tool_switch_is_refused_mid_stroke() {
    let mut doc = doc(32, 32);
    doc.handle_event(InputEvent::down(4.0, 4.0)).unwrap();
    assert_eq!(doc.select_tool(ToolKind::Eraser), ToolSwitch::Refused);
    doc.handle_event(InputEvent::key('e')).unwrap();
    assert_eq!(doc.active_tool(), ToolKind::Brush);
    assert!(matches!(doc.add_layer(), Err(EngineError::StrokeInProgress)));

    assert_eq!(doc.cancel_and_select_tool(ToolKind::Eraser), ToolSwitch::Switched);
    assert!(!doc.is_stroke_active());
    assert!(!doc.history().can_undo());
}

#[test]
fn unknown_tool_name_is_rejected() {
    let mut doc = doc(8, 8);
    assert!(matches!(
        doc.select_tool_named("smudge"),
        Err(EngineError::ToolNotFound(name)) if name == "smudge"
    ));
    assert_eq!(doc.active_tool(), ToolKind::Brush);
    doc.handle_event(InputEvent::key('m')).unwrap();
    assert_eq!(doc.active_tool(), ToolKind::RectSelect);
}

#[test]
fn settings_survive_tool_switches() {
    let mut doc = doc(8, 8);
    doc.update_settings(|s| {
        s.brush.size = 33.0;
        s.eraser.size = 5000.0;
    });
    doc.select_tool(ToolKind::Eraser);
    doc.select_tool(ToolKind::Brush);
    assert_eq!(doc.settings().brush.size, 33.0);
    assert_eq!(doc.settings().eraser.size, 1000.0);
}

#[test]
fn eraser_clears_painted_pixels() {
    let mut doc = doc(64, 64);
    doc.fill_selection(Color::black()).unwrap();
    doc.select_tool(ToolKind::Eraser);
    stroke(&mut doc, &[(32.0, 32.0)]);

    let layer = doc.layer(doc.active_layer_id().unwrap()).unwrap();
    assert_eq!(layer.raster().pixel(32, 32), Pixel::TRANSPARENT);
    assert_eq!(layer.raster().pixel(2, 2), Pixel::BLACK);
    assert_eq!(doc.history().last().unwrap().kind, OperationKind::Stroke);
}

#[test]
fn pen_draws_a_one_pixel_line() {
    let mut doc = doc(32, 32);
    doc.select_tool(ToolKind::Pen);
    let before = doc.render().unwrap();
    stroke(&mut doc, &[(2.5, 10.5), (20.5, 10.5)]);

    let changed = changed_pixels(&before, &doc.render().unwrap());
    assert_eq!(changed.len(), 19);
    assert!(changed.iter().all(|&(_, y)| y == 10));
}

#[test]
fn clone_copies_from_the_source_point() {
    let mut doc = doc(64, 64);
    doc.update_settings(|s| s.brush.color = Color::rgba(0, 160, 0, 255));
    stroke(&mut doc, &[(10.0, 10.0)]);

    doc.select_tool(ToolKind::Clone);
    doc.update_settings(|s| {
        s.clone.hardness = 100.0;
        s.clone.size = 6.0;
    });
    doc.handle_event(InputEvent::down_with(10.0, 10.0, Modifiers::alt())).unwrap();
    doc.handle_event(InputEvent::up(10.0, 10.0)).unwrap();
    assert_eq!(doc.clone_source(), Some(Vec2::new(10.0, 10.0)));
    assert_eq!(doc.history().undo_len(), 1);

    stroke(&mut doc, &[(40.0, 40.0)]);
    let layer = doc.layer(doc.active_layer_id().unwrap()).unwrap();
    assert_eq!(layer.raster().pixel(40, 40), layer.raster().pixel(10, 10));
    assert_eq!(doc.history().undo_len(), 2);
}

#[test]
fn clone_without_source_does_nothing() {
    let mut doc = doc(32, 32);
    doc.select_tool(ToolKind::Clone);
    stroke(&mut doc, &[(10.0, 10.0), (20.0, 20.0)]);
    assert!(!doc.history().can_undo());
}

#[test]
fn rect_select_drag_and_modifiers() {
    let mut doc = doc(64, 64);
    doc.select_tool(ToolKind::RectSelect);
    stroke(&mut doc, &[(10.0, 10.0), (30.0, 30.0)]);
    let sel = doc.selection().expect("selection made");
    assert!(sel.contains(20, 20));
    assert!(!sel.contains(40, 40));

    doc.handle_event(InputEvent::down_with(35.0, 35.0, Modifiers::shift())).unwrap();
    doc.handle_event(InputEvent::up(50.0, 50.0)).unwrap();
    let sel = doc.selection().unwrap();
    assert!(sel.contains(20, 20) && sel.contains(40, 40));

    doc.handle_event(InputEvent::down_with(0.0, 0.0, Modifiers::alt())).unwrap();
    doc.handle_event(InputEvent::up(25.0, 25.0)).unwrap();
    let sel = doc.selection().unwrap();
    assert!(!sel.contains(20, 20) && sel.contains(28, 28));

    // A plain click clears.
    stroke(&mut doc, &[(5.0, 5.0)]);
    assert!(doc.selection().is_none());
    assert_eq!(doc.history().undo_len(), 4);
    assert!(doc.history().last().unwrap().kind == OperationKind::SelectionChange);
}

#[test]
fn lasso_selection_confines_painting() {
    let mut doc = doc(64, 64);
    doc.select_tool(ToolKind::LassoSelect);
    stroke(
        &mut doc,
        &[(10.0, 10.0), (50.0, 10.0), (50.0, 50.0), (10.0, 50.0), (10.0, 12.0)],
    );
    assert!(doc.selection().unwrap().contains(30, 30));

    doc.select_tool(ToolKind::Brush);
    doc.update_settings(|s| s.brush.size = 30.0);
    stroke(&mut doc, &[(10.0, 30.0)]);
    let composite = doc.render().unwrap();
    assert!(!is_background(composite.pixel(14, 30)));
    assert!(is_background(composite.pixel(5, 30)));
}

#[test]
fn gradient_runs_between_the_drag_points() {
    let mut doc = doc(100, 10);
    doc.select_tool(ToolKind::Gradient);
    stroke(&mut doc, &[(0.0, 5.0), (100.0, 5.0)]);

    let composite = doc.render().unwrap();
    let left = composite.pixel(0, 5);
    let mid = composite.pixel(50, 5);
    let right = composite.pixel(99, 5);
    assert!(left.r < 5 && right.r > 250);
    assert!((120..=135).contains(&mid.r), "mid = {mid:?}");
    assert_eq!(doc.history().last().unwrap().kind, OperationKind::Fill);
}

#[test]
fn shape_previews_replace_each_other() {
    let mut doc = doc(64, 64);
    doc.select_tool(ToolKind::Shape);
    doc.update_settings(|s| {
        s.shape.kind = ShapeKind::Rectangle;
        s.shape.filled = true;
        s.shape.color = Color::rgba(200, 0, 0, 255);
    });
    doc.handle_event(InputEvent::down(10.0, 10.0)).unwrap();
    doc.handle_event(InputEvent::moved(60.0, 60.0)).unwrap();
    doc.handle_event(InputEvent::moved(30.0, 30.0)).unwrap();
    doc.handle_event(InputEvent::up(30.0, 30.0)).unwrap();

    let composite = doc.render().unwrap();
    assert!(!is_background(composite.pixel(20, 20)));
    assert!(is_background(composite.pixel(45, 45)));
    assert_eq!(doc.history().undo_len(), 1);
}

#[test]
fn move_tool_shifts_layer_content() {
    let mut doc = doc(64, 64);
    stroke(&mut doc, &[(10.0, 10.0)]);
    let id = doc.active_layer_id().unwrap();
    let original = doc.layer(id).unwrap().raster().pixel(10, 10);

    doc.select_tool(ToolKind::Move);
    stroke(&mut doc, &[(10.0, 10.0), (40.0, 20.0)]);

    let raster = doc.layer(id).unwrap().raster();
    assert_eq!(raster.pixel(10, 10), Pixel::TRANSPARENT);
    assert_eq!(raster.pixel(40, 20), original);
    assert_eq!(doc.history().last().unwrap().kind, OperationKind::Transform);

    doc.undo();
    assert_eq!(doc.layer(id).unwrap().raster().pixel(10, 10), original);
}

#[test]
fn secondary_button_is_ignored() {
    let mut doc = doc(16, 16);
    doc.handle_event(InputEvent::PointerDown {
        pos: Vec2::new(4.0, 4.0),
        pressure: Some(0.5),
        button: canvas_engine::PointerButton::Secondary,
        modifiers: Modifiers::NONE,
        timestamp: 0,
    })
    .unwrap();
    assert!(!doc.is_stroke_active());
}

#[test]
fn move_tool_drops_pixels_outside_the_selection() {
    let mut doc = doc(64, 64);
    stroke(&mut doc, &[(10.0, 10.0)]);
    let id = doc.active_layer_id().unwrap();
    doc.set_selection(Some(canvas_engine::SelectionRegion::aliased(
        canvas_engine::SelectionShape::Rectangle {
            x: 0.0,
            y: 0.0,
            width: 20.0,
            height: 20.0,
        },
    )))
    .unwrap();

    doc.select_tool(ToolKind::Move);
    stroke(&mut doc, &[(10.0, 10.0), (40.0, 40.0)]);

    let raster = doc.layer(id).unwrap().raster();
    assert!(!doc.selection().unwrap().contains(40, 40));
    assert_eq!(raster.pixel(40, 40), Pixel::TRANSPARENT);
    assert_eq!(raster.pixel(10, 10), Pixel::TRANSPARENT);
}

#[test]
fn move_tool_keeps_pixels_landing_inside_the_selection() {
    let mut doc = doc(64, 64);
    stroke(&mut doc, &[(10.0, 10.0)]);
    let id = doc.active_layer_id().unwrap();
    let original = doc.layer(id).unwrap().raster().pixel(10, 10);
    doc.set_selection(Some(canvas_engine::SelectionRegion::aliased(
        canvas_engine::SelectionShape::Rectangle {
            x: 0.0,
            y: 0.0,
            width: 64.0,
            height: 30.0,
        },
    )))
    .unwrap();

    doc.select_tool(ToolKind::Move);
    stroke(&mut doc, &[(10.0, 10.0), (40.0, 10.0)]);

    let raster = doc.layer(id).unwrap().raster();
    assert_eq!(raster.pixel(40, 10), original);
    assert_eq!(raster.pixel(10, 10), Pixel::TRANSPARENT);
}

fn jittery_stroke(doc: &mut canvas_engine::Document) -> canvas_engine::Composite {
    doc.update_settings(|s| {
        s.brush.size = 12.0;
        s.brush.dynamics.size_jitter = 60.0;
        s.brush.dynamics.opacity_jitter = 40.0;
        s.brush.dynamics.scatter = 50.0;
    });
    stroke(doc, &[(8.0, 32.0), (56.0, 32.0)]);
    doc.render().unwrap()
}

#[test]
fn seeded_dynamics_are_reproducible() {
    let first = jittery_stroke(&mut doc(64, 64));
    let second = jittery_stroke(&mut doc(64, 64));
    assert_eq!(first, second);

    let mut reseeded = doc(64, 64);
    reseeded.seed_rng(9001);
    assert_ne!(jittery_stroke(&mut reseeded), first);
}

fn single_dab(pressure: Option<f32>) -> (Pixel, usize) {
    let mut doc = doc(40, 40);
    let before = doc.render().unwrap();
    doc.handle_event(InputEvent::PointerDown {
        pos: Vec2::new(20.0, 20.0),
        pressure,
        button: canvas_engine::PointerButton::Primary,
        modifiers: Modifiers::NONE,
        timestamp: 0,
    })
    .unwrap();
    doc.handle_event(InputEvent::up(20.0, 20.0)).unwrap();
    let after = doc.render().unwrap();
    let raster = doc.layer(doc.active_layer_id().unwrap()).unwrap().raster();
    (raster.pixel(20, 20), changed_pixels(&before, &after).len())
}

#[test]
fn pressure_scales_dab_opacity_and_size() {
    let (full, full_area) = single_dab(None);
    let (half, half_area) = single_dab(Some(0.5));
    assert_eq!(full.a, 255);
    assert!((120..=136).contains(&half.a), "half pressure alpha = {}", half.a);
    assert!(half_area < full_area, "{half_area} vs {full_area}");
}

#[test]
fn pressure_on_moves_lightens_the_stroke() {
    let mut light = doc(64, 16);
    light.update_settings(|s| s.brush.spacing = 400.0);
    light.handle_event(InputEvent::down(4.0, 8.0)).unwrap();
    light
        .handle_event(InputEvent::moved_with_pressure(44.0, 8.0, 0.2))
        .unwrap();
    light.handle_event(InputEvent::up(44.0, 8.0)).unwrap();

    let raster = light.layer(light.active_layer_id().unwrap()).unwrap().raster();
    assert_eq!(raster.pixel(4, 8).a, 255);
    let tail = raster.pixel(44, 8).a;
    assert!(tail > 0 && tail < 100, "tail alpha = {tail}");
}
