use rayon::prelude::*;

use crate::canvas::blend::{BlendMode, opacity_scale};
use crate::canvas::layer::{Layer, LayerId, LayerProps};
use crate::error::{EngineError, Result};
use crate::utils::color::Pixel;
use crate::utils::profiler::ScopeTimer;

/// Flattened result of compositing every visible layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Composite {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Pixel>,
}

impl Composite {
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Straight-alpha RGBA copy for encoders and external collaborators.
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for px in &self.pixels {
            bytes.extend_from_slice(&px.to_rgba_unmultiplied());
        }
        image::RgbaImage::from_raw(self.width, self.height, bytes)
            .unwrap_or_else(|| image::RgbaImage::new(self.width, self.height))
    }
}

/// Ordered layers, bottom to top, plus the active layer index.
#[derive(Debug, Clone)]
pub struct LayerStack {
    width: u32,
    height: u32,
    tile_size: u32,
    layers: Vec<Layer>,
    active: Option<usize>,
    created: u32,
}

impl LayerStack {
    /// Empty stack; callers add the first layer.
    pub fn new(width: u32, height: u32, tile_size: u32) -> Self {
        Self {
            width,
            height,
            tile_size,
            layers: Vec::new(),
            active: None,
            created: 0,
        }
    }

    /// Rebuild a stack from loaded layers. An out-of-range active index falls
    /// back to the topmost layer.
    pub fn from_layers(
        width: u32,
        height: u32,
        tile_size: u32,
        layers: Vec<Layer>,
        active: Option<usize>,
    ) -> Self {
        let active = match active {
            _ if layers.is_empty() => None,
            Some(idx) if idx < layers.len() => Some(idx),
            _ => Some(layers.len() - 1),
        };
        Self {
            width,
            height,
            tile_size,
            created: layers.len() as u32,
            layers,
            active,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.active.and_then(|idx| self.layers.get(idx))
    }

    pub fn active_id(&self) -> Option<LayerId> {
        self.active_layer().map(Layer::id)
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id() == id)
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id() == id)
    }

    pub(crate) fn layer_at_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    fn require(&self, id: LayerId) -> Result<usize> {
        self.index_of(id).ok_or(EngineError::LayerNotFound(id))
    }

    /// Blank layer named after the creation counter, not yet inserted.
    pub fn blank_layer(&mut self) -> Layer {
        self.created += 1;
        Layer::new(
            format!("Layer {}", self.created),
            self.width,
            self.height,
            self.tile_size,
        )
    }

    /// Push a blank layer on top and make it active.
    pub fn add_layer(&mut self) -> (usize, LayerId) {
        let layer = self.blank_layer();
        let id = layer.id();
        let index = self.layers.len();
        self.insert_layer(index, layer);
        (index, id)
    }

    /// Insert a layer at `index` (clamped) and make it active.
    pub fn insert_layer(&mut self, index: usize, layer: Layer) -> usize {
        let index = index.min(self.layers.len());
        self.layers.insert(index, layer);
        self.active = Some(index);
        index
    }

    /// Remove a layer. If it was active, the topmost remaining layer becomes
    /// active; removing the last layer leaves the stack empty.
    pub fn delete_layer(&mut self, id: LayerId) -> Result<(usize, Layer)> {
        let index = self.require(id)?;
        let removed = self.layers.remove(index);
        self.active = match self.active {
            _ if self.layers.is_empty() => None,
            Some(active) if active == index => Some(self.layers.len() - 1),
            Some(active) if active > index => Some(active - 1),
            other => other,
        };
        Ok((index, removed))
    }

    /// Move a layer to `new_index` (clamped). Returns the old index.
    pub fn reorder(&mut self, id: LayerId, new_index: usize) -> Result<usize> {
        let from = self.require(id)?;
        let to = new_index.min(self.layers.len() - 1);
        if from == to {
            return Ok(from);
        }
        let active_id = self.active_id();
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        self.active = active_id.and_then(|a| self.index_of(a));
        Ok(from)
    }

    pub fn set_active(&mut self, id: LayerId) -> Result<()> {
        let index = self.require(id)?;
        self.active = Some(index);
        Ok(())
    }

    /// Apply new properties, returning the previous ones.
    pub fn set_props(&mut self, id: LayerId, props: LayerProps) -> Result<LayerProps> {
        let layer = self.get_mut(id).ok_or(EngineError::LayerNotFound(id))?;
        let before = layer.props();
        layer.set_props(props);
        Ok(before)
    }

    pub fn set_opacity(&mut self, id: LayerId, opacity: u8) -> Result<LayerProps> {
        let props = self.props_of(id)?;
        self.set_props(id, LayerProps { opacity, ..props })
    }

    pub fn set_blend_mode(&mut self, id: LayerId, blend_mode: BlendMode) -> Result<LayerProps> {
        let props = self.props_of(id)?;
        self.set_props(id, LayerProps { blend_mode, ..props })
    }

    pub fn set_visibility(&mut self, id: LayerId, visible: bool) -> Result<LayerProps> {
        let props = self.props_of(id)?;
        self.set_props(id, LayerProps { visible, ..props })
    }

    fn props_of(&self, id: LayerId) -> Result<LayerProps> {
        self.get(id)
            .map(Layer::props)
            .ok_or(EngineError::LayerNotFound(id))
    }

    /// Composite the whole stack in one go.
    pub fn render(&self, background: Pixel) -> Result<Composite> {
        let _timer = ScopeTimer::new("render");
        let mut job = RenderJob::new(self.width, self.height, background)?;
        job.step(self, self.height);
        Ok(job.finish())
    }

    /// Composite one row into `row`, which must be `width` pixels long.
    fn composite_row(&self, y: u32, background: Pixel, row: &mut [Pixel]) {
        row.fill(background);
        let ts = self.tile_size;
        let ty = y / ts;
        let local_row = ((y % ts) * ts) as usize;
        for layer in &self.layers {
            if !layer.is_visible() {
                continue;
            }
            let scale = opacity_scale(layer.opacity());
            let mode = layer.blend_mode();
            let raster = layer.raster();
            let mut x = 0u32;
            while x < self.width {
                let tx = x / ts;
                let span_end = ((tx + 1) * ts).min(self.width);
                if let Some(tile) = raster.tile(tx, ty) {
                    for gx in x..span_end {
                        let src = tile[local_row + (gx % ts) as usize].scale_alpha(scale);
                        if src.a == 0 {
                            continue;
                        }
                        let dst = &mut row[gx as usize];
                        *dst = mode.blend(src, *dst);
                    }
                }
                x = span_end;
            }
        }
    }
}

/// Resumable composite that processes a bounded number of rows per step,
/// so area-scaled renders can be spread over several loop turns.
#[derive(Debug)]
pub struct RenderJob {
    width: u32,
    height: u32,
    background: Pixel,
    next_row: u32,
    pixels: Vec<Pixel>,
}

impl RenderJob {
    /// Allocate the output buffer up front; fails instead of aborting on OOM.
    pub fn new(width: u32, height: u32, background: Pixel) -> Result<Self> {
        let len = width as usize * height as usize;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| EngineError::AllocationFailure {
                operation: "render",
                layer: None,
                bytes: len as u64 * 4,
            })?;
        pixels.resize(len, background);
        Ok(Self {
            width,
            height,
            background,
            next_row: 0,
            pixels,
        })
    }

    pub fn is_done(&self) -> bool {
        self.next_row >= self.height
    }

    /// Rows composited so far.
    pub fn progress(&self) -> u32 {
        self.next_row
    }

    /// Composite up to `max_rows` rows. Returns true once every row is done.
    pub fn step(&mut self, stack: &LayerStack, max_rows: u32) -> bool {
        if self.is_done() || self.width == 0 {
            self.next_row = self.height;
            return true;
        }
        let first = self.next_row;
        let last = (first + max_rows.max(1)).min(self.height);
        let w = self.width as usize;
        let background = self.background;
        let slice = &mut self.pixels[first as usize * w..last as usize * w];
        slice
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(i, row)| stack.composite_row(first + i as u32, background, row));
        self.next_row = last;
        self.is_done()
    }

    pub fn finish(self) -> Composite {
        Composite {
            width: self.width,
            height: self.height,
            pixels: self.pixels,
        }
    }
}
