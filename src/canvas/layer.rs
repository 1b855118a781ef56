use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::blend::BlendMode;
use crate::canvas::raster::TiledRaster;

/// A unique identifier for a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub Uuid);

impl LayerId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compositing properties of a layer, recorded as a unit by history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerProps {
    pub opacity: u8,
    pub blend_mode: BlendMode,
    pub visible: bool,
}

impl Default for LayerProps {
    fn default() -> Self {
        Self {
            opacity: 100,
            blend_mode: BlendMode::Normal,
            visible: true,
        }
    }
}

/// Single painting layer with its own opacity, visibility and tile storage.
#[derive(Debug, Clone)]
pub struct Layer {
    id: LayerId,
    pub name: String,
    props: LayerProps,
    raster: TiledRaster,
}

impl Layer {
    /// Blank layer; tile data is allocated lazily on first paint.
    pub fn new(name: impl Into<String>, width: u32, height: u32, tile_size: u32) -> Self {
        Self::with_id(LayerId::new(), name, TiledRaster::new(width, height, tile_size))
    }

    pub fn with_id(id: LayerId, name: impl Into<String>, raster: TiledRaster) -> Self {
        Self {
            id,
            name: name.into(),
            props: LayerProps::default(),
            raster,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Opacity in percent, 0..=100.
    pub fn opacity(&self) -> u8 {
        self.props.opacity
    }

    pub fn set_opacity(&mut self, opacity: u8) {
        self.props.opacity = opacity.min(100);
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.props.blend_mode
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.props.blend_mode = mode;
    }

    pub fn is_visible(&self) -> bool {
        self.props.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.props.visible = visible;
    }

    pub fn props(&self) -> LayerProps {
        self.props
    }

    pub fn set_props(&mut self, props: LayerProps) {
        self.props = LayerProps {
            opacity: props.opacity.min(100),
            ..props
        };
    }

    pub fn raster(&self) -> &TiledRaster {
        &self.raster
    }

    pub fn raster_mut(&mut self) -> &mut TiledRaster {
        &mut self.raster
    }

    /// Copy of this layer's content and properties under a new id.
    pub fn duplicate(&self) -> Layer {
        Layer {
            id: LayerId::new(),
            name: format!("{} copy", self.name),
            props: self.props,
            raster: self.raster.clone(),
        }
    }
}
