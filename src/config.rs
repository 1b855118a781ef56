use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::tools::shortcuts::{ShortcutBinding, ShortcutMap};
use crate::utils::color::Pixel;

/// Engine tunables, loadable from JSON. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Edge length of raster tiles in pixels.
    pub tile_size: u32,
    /// Maximum number of undoable entries.
    pub history_depth: usize,
    /// Largest full-resolution layer allowed, in bytes.
    pub max_layer_bytes: u64,
    /// Upper bound on allocated tile memory across all layers. Layer
    /// duplication, fills and suggestions are refused up front; a stroke that
    /// crosses it is rolled back when it ends.
    pub max_document_bytes: u64,
    /// Pixels a background task may process per tick.
    pub frame_budget_pixels: u64,
    /// Straight-alpha RGBA the compositor starts from.
    pub background: [u8; 4],
    /// Seed for brush dynamics; `None` seeds from the OS.
    pub rng_seed: Option<u64>,
    /// Empty means the built-in bindings.
    pub shortcuts: Vec<ShortcutBinding>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tile_size: 64,
            history_depth: 100,
            max_layer_bytes: 16384 * 16384 * 4,
            max_document_bytes: 4u64 << 30,
            frame_budget_pixels: 1u64 << 20,
            background: [255, 255, 255, 255],
            rng_seed: None,
            shortcuts: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::debug!("loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(8..=1024).contains(&self.tile_size) {
            return Err(EngineError::Config(format!(
                "tile_size must be between 8 and 1024, got {}",
                self.tile_size
            )));
        }
        if self.history_depth == 0 {
            return Err(EngineError::Config("history_depth must be at least 1".into()));
        }
        if self.frame_budget_pixels == 0 {
            return Err(EngineError::Config("frame_budget_pixels must be positive".into()));
        }
        if self.max_layer_bytes > self.max_document_bytes {
            return Err(EngineError::Config(
                "max_layer_bytes exceeds max_document_bytes".into(),
            ));
        }
        self.shortcut_map()?;
        Ok(())
    }

    pub fn shortcut_map(&self) -> Result<ShortcutMap> {
        ShortcutMap::from_bindings(&self.shortcuts)
    }

    pub fn background_pixel(&self) -> Pixel {
        let [r, g, b, a] = self.background;
        Pixel::from_rgba_unmultiplied(r, g, b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolKind;

    #[test]
    fn empty_json_is_the_default() {
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"tile_size": 3}"#),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"history_depth": 0}"#),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str("not json"),
            Err(EngineError::Json(_))
        ));
    }

    #[test]
    fn shortcut_conflicts_fail_validation() {
        let json = r#"{"shortcuts": [
            {"key": "x", "tool": "brush"},
            {"key": "x", "tool": "move"}
        ]}"#;
        assert!(matches!(
            EngineConfig::from_json_str(json),
            Err(EngineError::ShortcutConflict { key: 'x', .. })
        ));

        let json = r#"{"shortcuts": [{"key": "x", "tool": "gradient"}]}"#;
        let config = EngineConfig::from_json_str(json).unwrap();
        assert_eq!(config.shortcut_map().unwrap().tool_for('x'), Some(ToolKind::Gradient));
    }
}
