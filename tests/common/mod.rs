#![allow(dead_code)]

use canvas_engine::{Composite, Document, EngineConfig, InputEvent, Pixel};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn config() -> EngineConfig {
    EngineConfig {
        tile_size: 32,
        rng_seed: Some(42),
        ..EngineConfig::default()
    }
}

pub fn doc(width: u32, height: u32) -> Document {
    init_logging();
    Document::with_config(width, height, config()).unwrap()
}

/// Press at the first point, drag through the rest, release at the last.
pub fn stroke(doc: &mut Document, points: &[(f32, f32)]) {
    let (first, rest) = points.split_first().expect("stroke needs a point");
    doc.handle_event(InputEvent::down(first.0, first.1)).unwrap();
    for &(x, y) in rest {
        doc.handle_event(InputEvent::moved(x, y)).unwrap();
    }
    let last = points.last().unwrap_or(first);
    doc.handle_event(InputEvent::up(last.0, last.1)).unwrap();
}

pub fn changed_pixels(before: &Composite, after: &Composite) -> Vec<(u32, u32)> {
    assert_eq!((before.width, before.height), (after.width, after.height));
    let mut out = Vec::new();
    for y in 0..before.height {
        for x in 0..before.width {
            if before.pixel(x, y) != after.pixel(x, y) {
                out.push((x, y));
            }
        }
    }
    out
}

pub fn is_background(px: Pixel) -> bool {
    px == Pixel::WHITE
}
