use serde::{Deserialize, Serialize};

use crate::canvas::blend::BlendMode;
use crate::error::Result;
use crate::selection::SelectionOp;
use crate::tools::ToolKind;
use crate::tools::settings::ToolSettings;

/// Version written by [`crate::io::save`]. Version 1 files carry no blend
/// modes, selection or tool settings.
pub const FORMAT_VERSION: u32 = 2;

fn default_version() -> u32 {
    1
}

fn default_opacity() -> u8 {
    100
}

fn default_visible() -> bool {
    true
}

/// Where a layer's pixels live in the raster store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterRef {
    pub key: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_opacity")]
    pub opacity: u8,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default = "default_visible")]
    pub visible: bool,
    pub raster: RasterRef,
}

/// Structural description of a document. Pixels are stored separately.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentFile {
    #[serde(default = "default_version")]
    pub version: u32,
    pub width: u32,
    pub height: u32,
    /// Bottom to top.
    pub layers: Vec<LayerRecord>,
    #[serde(default)]
    pub active_layer: Option<usize>,
    #[serde(default)]
    pub selection: Vec<SelectionOp>,
    #[serde(default)]
    pub active_tool: ToolKind,
    #[serde(default)]
    pub settings: ToolSettings,
}

impl DocumentFile {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_one_fields_take_defaults() {
        let json = r#"{
            "width": 8,
            "height": 4,
            "layers": [{"id": "a", "raster": {"key": "k"}}]
        }"#;
        let file = DocumentFile::from_json(json).unwrap();
        assert_eq!(file.version, 1);
        assert_eq!(file.active_layer, None);
        assert!(file.selection.is_empty());
        assert_eq!(file.active_tool, ToolKind::Brush);
        assert_eq!(file.settings, ToolSettings::default());

        let layer = &file.layers[0];
        assert_eq!(layer.opacity, 100);
        assert_eq!(layer.blend_mode, BlendMode::Normal);
        assert!(layer.visible);
        assert!(layer.name.is_empty());
    }
}
