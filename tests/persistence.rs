mod common;

use canvas_engine::canvas::TiledRaster;
use canvas_engine::canvas::raster::RasterBuffer;
use canvas_engine::io::{self, DirStore, DocumentFile, MemoryStore, RasterStore};
use canvas_engine::{
    BlendMode, Color, Document, EngineError, Pixel, SelectionRegion, SelectionShape, ToolKind,
};

use common::{config, doc};

fn aliased_rect(x: f32, y: f32, width: f32, height: f32) -> SelectionRegion {
    SelectionRegion::aliased(SelectionShape::Rectangle {
        x,
        y,
        width,
        height,
    })
}

/// Two layers of opaque content plus non-default props, selection and tool.
fn sample_document() -> Document {
    let mut doc = doc(48, 32);
    doc.set_selection(Some(aliased_rect(0.0, 0.0, 30.0, 20.0))).unwrap();
    doc.fill_selection(Color::rgba(250, 40, 10, 255)).unwrap();

    let top = doc.add_layer().unwrap();
    doc.set_selection(Some(aliased_rect(20.0, 10.0, 28.0, 22.0))).unwrap();
    doc.fill_selection(Color::rgba(10, 40, 250, 255)).unwrap();
    doc.set_layer_opacity(top, 70).unwrap();
    doc.set_layer_blend_mode(top, BlendMode::Screen).unwrap();
    doc.rename_layer(top, "highlights").unwrap();

    doc.update_settings(|s| {
        s.brush.size = 24.0;
        s.selection.feather = 3.0;
    });
    doc.select_tool(ToolKind::Gradient);
    doc
}

fn payload(width: u32, height: u32, px: Pixel) -> Vec<u8> {
    let mut raster = TiledRaster::new(width, height, 16);
    raster.fill(raster.bounds(), px);
    io::encode_raster(&raster).unwrap()
}

#[test]
fn save_and_load_round_trip() {
    let original = sample_document();
    let mut store = MemoryStore::new();
    let json = io::save_json(&original, &mut store).unwrap();
    assert_eq!(store.len(), 2);

    let loaded = io::load_json(&json, &store, config()).unwrap();
    assert_eq!(loaded.render().unwrap(), original.render().unwrap());
    assert_eq!(loaded.active_tool(), ToolKind::Gradient);
    assert_eq!(loaded.settings(), original.settings());
    assert_eq!(loaded.active_layer_id(), original.active_layer_id());
    assert_eq!(loaded.selection(), original.selection());
    assert!(!loaded.history().can_undo());

    let ids: Vec<_> = original.layers().layers().iter().map(|l| l.id()).collect();
    let loaded_ids: Vec<_> = loaded.layers().layers().iter().map(|l| l.id()).collect();
    assert_eq!(ids, loaded_ids);
    let top = loaded.layer(ids[1]).unwrap();
    assert_eq!(top.name, "highlights");
    assert_eq!(top.opacity(), 70);
    assert_eq!(top.blend_mode(), BlendMode::Screen);
}

#[test]
fn version_one_documents_load_with_defaults() {
    let mut store = MemoryStore::new();
    store.put("bg", payload(16, 8, Pixel::WHITE)).unwrap();
    let json = r#"{
        "width": 16,
        "height": 8,
        "layers": [
            {
                "id": "5c4c1c1e-8f0e-4d0a-9a57-6c1b8a0e2f11",
                "name": "Background",
                "opacity": 40,
                "blend_mode": "multiply",
                "raster": {"key": "bg"}
            }
        ],
        "selection": ["all"]
    }"#;
    let doc = io::load_json(json, &store, config()).unwrap();
    let layer = &doc.layers().layers()[0];
    assert_eq!(layer.name, "Background");
    assert_eq!(layer.opacity(), 40);
    assert_eq!(layer.blend_mode(), BlendMode::Normal);
    assert!(layer.is_visible());
    assert!(doc.selection().is_none());
    assert_eq!(doc.active_tool(), ToolKind::Brush);
    assert_eq!(doc.active_layer_id(), Some(layer.id()));
}

#[test]
fn strict_load_rejects_and_recover_keeps_valid_layers() {
    let original = sample_document();
    let mut store = MemoryStore::new();
    let mut file = io::save(&original, &mut store).unwrap();
    let extra = original.layers().layers()[0].id();
    file.layers.push(io::LayerRecord {
        id: "not-a-uuid".into(),
        name: "broken".into(),
        opacity: 100,
        blend_mode: BlendMode::Normal,
        visible: true,
        raster: io::RasterRef { key: "x".into() },
    });
    store.remove(&file.layers[1].raster.key);

    let err = io::load(&file, &store, config()).unwrap_err();
    let EngineError::DocumentCorrupt { dropped, .. } = err else {
        panic!("expected DocumentCorrupt, got {err}");
    };
    let indices: Vec<_> = dropped.iter().map(|d| d.index).collect();
    assert_eq!(indices, vec![1, 2]);
    assert!(dropped[0].reason.contains("missing payload"));
    assert_eq!(dropped[1].id, "not-a-uuid");

    let recovered = io::recover(&file, &store, config()).unwrap();
    assert_eq!(recovered.dropped.len(), 2);
    assert_eq!(recovered.document.layers().len(), 1);
    assert_eq!(recovered.document.layers().layers()[0].id(), extra);
    // The saved active layer was dropped; the topmost survivor takes over.
    assert_eq!(recovered.document.active_layer_id(), Some(extra));
}

#[test]
fn mismatched_payload_and_bad_header_are_corrupt() {
    let mut store = MemoryStore::new();
    store.put("small", payload(4, 4, Pixel::BLACK)).unwrap();
    let json = r#"{
        "version": 2,
        "width": 16,
        "height": 8,
        "layers": [{"id": "0f8fad5b-d9cb-469f-a165-70867728950e", "raster": {"key": "small"}}]
    }"#;
    let file = DocumentFile::from_json(json).unwrap();
    let recovered = io::recover(&file, &store, config()).unwrap();
    assert!(recovered.dropped[0].reason.contains("4x4"));
    assert!(recovered.document.layers().is_empty());

    let future = DocumentFile { version: 9, ..file.clone() };
    assert!(matches!(
        io::load(&future, &store, config()),
        Err(EngineError::DocumentCorrupt { .. })
    ));
    let empty = DocumentFile { width: 0, ..file };
    assert!(matches!(
        io::load(&empty, &store, config()),
        Err(EngineError::DocumentCorrupt { .. })
    ));
}

#[test]
fn directory_store_round_trip() {
    let dir = std::env::temp_dir().join(format!("canvas-engine-{}", uuid::Uuid::new_v4()));
    let original = sample_document();
    let mut store = DirStore::new(&dir);
    let file = io::save(&original, &mut store).unwrap();

    let loaded = io::load(&file, &store, config()).unwrap();
    assert_eq!(loaded.render().unwrap(), original.render().unwrap());
    assert_eq!(store.get("missing").unwrap(), None);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn out_of_range_selection_feather_is_corrupt() {
    let mut store = MemoryStore::new();
    store.put("bg", payload(16, 8, Pixel::WHITE)).unwrap();
    let json = r#"{
        "version": 2,
        "width": 16,
        "height": 8,
        "layers": [{"id": "0f8fad5b-d9cb-469f-a165-70867728950e", "raster": {"key": "bg"}}],
        "selection": [
            {"replace": {"shape": {"kind": "rectangle", "x": 0, "y": 0, "width": 8, "height": 8}}},
            {"combine": {"op": "add", "region": {
                "shape": {"kind": "ellipse", "center": {"x": 8, "y": 4}, "radius_x": 3, "radius_y": 3},
                "feather": 1e30
            }}}
        ]
    }"#;
    let file = DocumentFile::from_json(json).unwrap();
    let err = io::load(&file, &store, config()).unwrap_err();
    let EngineError::DocumentCorrupt { reason, dropped } = err else {
        panic!("expected DocumentCorrupt, got {err}");
    };
    assert!(reason.contains("selection op 1"), "{reason}");
    assert!(dropped.is_empty());
    assert!(io::recover(&file, &store, config()).is_err());
}
