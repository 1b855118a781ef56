mod common;

use canvas_engine::canvas::RasterBuffer;
use canvas_engine::selection::{MAX_FEATHER, Selection, SelectionOp};
use canvas_engine::{Color, CombineOp, SelectionRegion, SelectionShape, Vec2};

use common::doc;

const W: u32 = 64;
const H: u32 = 48;

fn rect(x: f32, y: f32, width: f32, height: f32) -> SelectionRegion {
    SelectionRegion::new(SelectionShape::Rectangle {
        x,
        y,
        width,
        height,
    })
}

fn ellipse() -> SelectionRegion {
    SelectionRegion::new(SelectionShape::Ellipse {
        center: Vec2::new(32.0, 24.0),
        radius_x: 20.0,
        radius_y: 12.0,
    })
}

#[test]
fn add_then_intersect_matches_stepwise_document_edits() {
    let s = rect(0.0, 0.0, 30.0, 30.0);
    let r1 = ellipse();
    let r2 = rect(10.0, 10.0, 40.0, 20.0);

    let base = Selection::from_region(W, H, s.clone());
    let direct = Selection::combine_region(
        Some(&Selection::combine_region(Some(&base), W, H, CombineOp::Add, r1.clone())),
        W,
        H,
        CombineOp::Intersect,
        r2.clone(),
    );

    let mut doc = doc(W, H);
    doc.set_selection(Some(s)).unwrap();
    doc.combine_selection(CombineOp::Add, r1.clone()).unwrap();
    doc.combine_selection(CombineOp::Intersect, r2.clone()).unwrap();
    assert_eq!(doc.selection().unwrap().mask(), direct.mask());

    // Same result through mask-level combination.
    let masks = base
        .combine(CombineOp::Add, &Selection::from_region(W, H, r1))
        .combine(CombineOp::Intersect, &Selection::from_region(W, H, r2));
    assert_eq!(masks.mask(), direct.mask());
}

#[test]
fn add_and_intersect_commute_subtract_does_not() {
    let a = Selection::from_region(W, H, rect(0.0, 0.0, 40.0, 40.0));
    let b = Selection::from_region(W, H, ellipse());

    for op in [CombineOp::Add, CombineOp::Intersect] {
        assert_eq!(a.combine(op, &b).mask(), b.combine(op, &a).mask());
    }
    assert_ne!(
        a.combine(CombineOp::Subtract, &b).mask(),
        b.combine(CombineOp::Subtract, &a).mask()
    );

    // Adding then subtracting R removes R; subtracting then adding keeps it.
    let r = Selection::from_region(W, H, rect(30.0, 30.0, 20.0, 10.0));
    let add_sub = a.combine(CombineOp::Add, &r).combine(CombineOp::Subtract, &r);
    let sub_add = a.combine(CombineOp::Subtract, &r).combine(CombineOp::Add, &r);
    assert!(!add_sub.contains(45, 35));
    assert!(sub_add.contains(45, 35));
}

#[test]
fn combining_without_a_selection_starts_from_full_canvas() {
    let mut doc = doc(W, H);
    doc.combine_selection(CombineOp::Subtract, rect(0.0, 0.0, 10.0, 10.0))
        .unwrap();
    let sel = doc.selection().unwrap();
    assert!(!sel.contains(5, 5));
    assert!(sel.contains(50, 40));
}

#[test]
fn feather_softens_the_edge() {
    let hard = Selection::from_region(W, H, SelectionRegion::aliased(ellipse().shape));
    let soft = Selection::from_region(W, H, ellipse().with_feather(4.0));

    assert_eq!(hard.value_at(32, 24), 255);
    assert_eq!(soft.value_at(32, 24), 255);
    let edge = soft.value_at(12, 24);
    assert!(edge > 0 && edge < 255, "edge = {edge}");
    assert!(hard.mask().iter().all(|&v| v == 0 || v == 255));
}

#[test]
fn fills_scale_by_feathered_coverage() {
    let mut doc = doc(W, H);
    doc.set_selection(Some(rect(16.0, 16.0, 32.0, 16.0).with_feather(3.0)))
        .unwrap();
    doc.fill_selection(Color::black()).unwrap();

    let raster = doc.layer(doc.active_layer_id().unwrap()).unwrap().raster();
    let inner = raster.pixel(32, 24);
    let edge = raster.pixel(16, 24);
    let outside = raster.pixel(2, 2);
    assert_eq!(inner.a, 255);
    assert!(edge.a > 0 && edge.a < 255);
    assert_eq!(outside.a, 0);
}

#[test]
fn unbounded_feather_is_clamped_on_documents() {
    let mut doc = doc(W, H);
    doc.set_selection(Some(rect(8.0, 8.0, 40.0, 30.0).with_feather(f32::INFINITY)))
        .unwrap();
    doc.combine_selection(CombineOp::Add, ellipse().with_feather(1.0e12))
        .unwrap();
    let sel = doc.selection().unwrap();
    assert_eq!(sel.mask().len(), (W * H) as usize);
    let feathers: Vec<f32> = sel
        .ops()
        .iter()
        .filter_map(|op| match op {
            SelectionOp::Replace(region) | SelectionOp::Combine { region, .. } => {
                Some(region.feather)
            }
            _ => None,
        })
        .collect();
    assert_eq!(feathers, vec![MAX_FEATHER, MAX_FEATHER]);
}
