//! Saving and loading documents through a [`RasterStore`].

pub mod format;
pub mod store;

use std::collections::HashSet;

use uuid::Uuid;

use crate::canvas::layer::{Layer, LayerId, LayerProps};
use crate::canvas::raster::RasterBuffer;
use crate::config::EngineConfig;
use crate::document::Document;
use crate::error::{EngineError, Result};
use crate::selection::Selection;

pub use format::{DocumentFile, FORMAT_VERSION, LayerRecord, RasterRef};
pub use store::{DirStore, MemoryStore, RasterStore, decode_raster, encode_raster};

/// A layer record that failed validation on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedLayer {
    /// Position in the saved layer list.
    pub index: usize,
    pub id: String,
    pub reason: String,
}

/// Result of a best-effort load.
pub struct Recovered {
    pub document: Document,
    pub dropped: Vec<DroppedLayer>,
}

/// Write every layer's pixels to `store` and describe the document.
pub fn save(doc: &Document, store: &mut dyn RasterStore) -> Result<DocumentFile> {
    let mut layers = Vec::with_capacity(doc.layers().len());
    for layer in doc.layers().layers() {
        let key = format!("{}/{}", doc.id(), layer.id());
        store.put(&key, encode_raster(layer.raster())?)?;
        let props = layer.props();
        layers.push(LayerRecord {
            id: layer.id().to_string(),
            name: layer.name.clone(),
            opacity: props.opacity,
            blend_mode: props.blend_mode,
            visible: props.visible,
            raster: RasterRef { key },
        });
    }
    log::debug!("saved document {} with {} layers", doc.id(), layers.len());
    Ok(DocumentFile {
        version: FORMAT_VERSION,
        width: doc.width(),
        height: doc.height(),
        layers,
        active_layer: doc.layers().active_index(),
        selection: doc.selection().map(|s| s.ops().to_vec()).unwrap_or_default(),
        active_tool: doc.active_tool(),
        settings: doc.settings().clone(),
    })
}

/// Strict load: any invalid layer fails the whole document.
pub fn load(file: &DocumentFile, store: &dyn RasterStore, config: EngineConfig) -> Result<Document> {
    let (document, dropped) = rebuild(file, store, config)?;
    if !dropped.is_empty() {
        return Err(EngineError::DocumentCorrupt {
            reason: format!("{} of {} layers failed validation", dropped.len(), file.layers.len()),
            dropped,
        });
    }
    Ok(document)
}

/// Best-effort load keeping every layer that validates.
pub fn recover(file: &DocumentFile, store: &dyn RasterStore, config: EngineConfig) -> Result<Recovered> {
    let (document, dropped) = rebuild(file, store, config)?;
    for d in &dropped {
        log::warn!("dropped layer #{} ({}): {}", d.index, d.id, d.reason);
    }
    Ok(Recovered { document, dropped })
}

pub fn save_json(doc: &Document, store: &mut dyn RasterStore) -> Result<String> {
    save(doc, store)?.to_json()
}

pub fn load_json(json: &str, store: &dyn RasterStore, config: EngineConfig) -> Result<Document> {
    load(&DocumentFile::from_json(json)?, store, config)
}

fn corrupt(reason: impl Into<String>) -> EngineError {
    EngineError::DocumentCorrupt {
        reason: reason.into(),
        dropped: Vec::new(),
    }
}

fn rebuild(
    file: &DocumentFile,
    store: &dyn RasterStore,
    config: EngineConfig,
) -> Result<(Document, Vec<DroppedLayer>)> {
    if file.version == 0 || file.version > FORMAT_VERSION {
        return Err(corrupt(format!("unsupported format version {}", file.version)));
    }
    if file.width == 0 || file.height == 0 {
        return Err(corrupt(format!(
            "invalid canvas dimensions {}x{}",
            file.width, file.height
        )));
    }

    if file.version >= 2 {
        for (i, op) in file.selection.iter().enumerate() {
            op.validate()
                .map_err(|reason| corrupt(format!("selection op {i}: {reason}")))?;
        }
    }

    let mut seen = HashSet::new();
    let mut layers = Vec::new();
    let mut dropped = Vec::new();
    let mut active = None;
    for (index, record) in file.layers.iter().enumerate() {
        match restore_layer(file, record, store, config.tile_size, &mut seen) {
            Ok(layer) => {
                if file.active_layer == Some(index) {
                    active = Some(layers.len());
                }
                layers.push(layer);
            }
            Err(reason) => dropped.push(DroppedLayer {
                index,
                id: record.id.clone(),
                reason,
            }),
        }
    }

    let selection = if file.version >= 2 {
        Selection::from_ops(file.width, file.height, &file.selection)
    } else {
        None
    };
    let settings = if file.version >= 2 {
        file.settings.clone()
    } else {
        Default::default()
    };
    let document = Document::from_parts(
        config,
        file.width,
        file.height,
        layers,
        active,
        selection,
        file.active_tool,
        settings,
    )?;
    Ok((document, dropped))
}

fn restore_layer(
    file: &DocumentFile,
    record: &LayerRecord,
    store: &dyn RasterStore,
    tile_size: u32,
    seen: &mut HashSet<Uuid>,
) -> std::result::Result<Layer, String> {
    let uuid = Uuid::parse_str(&record.id).map_err(|e| format!("invalid id: {e}"))?;
    if !seen.insert(uuid) {
        return Err("duplicate layer id".into());
    }
    if record.opacity > 100 {
        return Err(format!("opacity {} out of range", record.opacity));
    }
    let bytes = store
        .get(&record.raster.key)
        .map_err(|e| format!("cannot read payload `{}`: {e}", record.raster.key))?
        .ok_or_else(|| format!("missing payload `{}`", record.raster.key))?;
    let raster = decode_raster(&bytes, tile_size).map_err(|e| format!("undecodable payload: {e}"))?;
    if raster.width() != file.width || raster.height() != file.height {
        return Err(format!(
            "payload is {}x{}, canvas is {}x{}",
            raster.width(),
            raster.height(),
            file.width,
            file.height
        ));
    }
    let mut layer = Layer::with_id(LayerId(uuid), record.name.clone(), raster);
    layer.set_props(LayerProps {
        opacity: record.opacity,
        blend_mode: if file.version >= 2 {
            record.blend_mode
        } else {
            Default::default()
        },
        visible: record.visible,
    });
    Ok(layer)
}
