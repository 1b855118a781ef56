use std::collections::HashMap;

use crate::canvas::history::RasterPatch;
use crate::canvas::layer::LayerId;
use crate::canvas::raster::{RasterBuffer, TiledRaster};
use crate::utils::color::Pixel;
use crate::utils::rect::Rect;

/// Pre-stroke contents of every tile an in-flight operation has touched.
///
/// The first write into a tile snapshots it, so the operation can either be
/// rolled back exactly or turned into a patch covering only the touched rectangle.
#[derive(Debug, Default)]
pub struct StrokeJournal {
    before: HashMap<(u32, u32), Option<Box<[Pixel]>>>,
    dirty: Rect,
}

impl StrokeJournal {
    pub fn new() -> Self {
        Self {
            before: HashMap::new(),
            dirty: Rect::empty(),
        }
    }

    /// Rectangle of pixels written since the journal started (or was last restored).
    pub fn dirty(&self) -> Rect {
        self.dirty
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty()
    }

    /// Tiles that did not exist before the first journaled write.
    pub fn new_tiles(&self) -> usize {
        self.before.values().filter(|t| t.is_none()).count()
    }

    fn record(&mut self, raster: &TiledRaster, x: u32, y: u32) {
        let key = raster.tile_coords(x, y);
        self.before
            .entry(key)
            .or_insert_with(|| raster.tile(key.0, key.1).map(|t| t.to_vec().into_boxed_slice()));
        self.dirty.include(x as i32, y as i32);
    }

    /// The pixel as it was before the first journaled write.
    pub fn original_pixel(&self, raster: &TiledRaster, x: u32, y: u32) -> Pixel {
        if x >= raster.width() || y >= raster.height() {
            return Pixel::TRANSPARENT;
        }
        let key = raster.tile_coords(x, y);
        match self.before.get(&key) {
            Some(Some(tile)) => {
                let ts = raster.tile_size();
                tile[((y % ts) * ts + x % ts) as usize]
            }
            Some(None) => Pixel::TRANSPARENT,
            None => raster.pixel(x, y),
        }
    }

    /// Put every journaled tile back but keep the snapshots, so a preview can
    /// be redrawn from the original state.
    pub fn restore(&mut self, raster: &mut TiledRaster) {
        for (key, tile) in &self.before {
            raster.replace_tile(*key, tile.clone());
        }
        self.dirty = Rect::empty();
    }

    /// Undo every journaled write and forget the snapshots.
    pub fn rollback(&mut self, raster: &mut TiledRaster) {
        for (key, tile) in self.before.drain() {
            raster.replace_tile(key, tile);
        }
        self.dirty = Rect::empty();
    }

    /// Build a before/after patch over the dirty rectangle. Returns `None`
    /// when nothing actually changed.
    pub fn into_patch(self, raster: &TiledRaster, layer: LayerId) -> Option<RasterPatch> {
        let rect = self.dirty.clamp_to(raster.width(), raster.height());
        if rect.is_empty() {
            return None;
        }
        let before: Vec<Pixel> = rect
            .pixels()
            .map(|(x, y)| self.original_pixel(raster, x as u32, y as u32))
            .collect();
        let after = raster.read_block(rect);
        if before == after {
            return None;
        }
        Some(RasterPatch {
            layer,
            rect,
            before,
            after,
        })
    }
}

/// Raster wrapper that journals each tile before its first modification.
pub struct JournaledRaster<'a> {
    raster: &'a mut TiledRaster,
    journal: &'a mut StrokeJournal,
}

impl<'a> JournaledRaster<'a> {
    pub fn new(raster: &'a mut TiledRaster, journal: &'a mut StrokeJournal) -> Self {
        Self { raster, journal }
    }

    /// Pixel value before this operation touched it.
    pub fn original_pixel(&self, x: u32, y: u32) -> Pixel {
        self.journal.original_pixel(&*self.raster, x, y)
    }

    pub fn restore(&mut self) {
        self.journal.restore(&mut *self.raster);
    }
}

impl RasterBuffer for JournaledRaster<'_> {
    fn width(&self) -> u32 {
        self.raster.width()
    }

    fn height(&self) -> u32 {
        self.raster.height()
    }

    fn pixel(&self, x: u32, y: u32) -> Pixel {
        self.raster.pixel(x, y)
    }

    fn set_pixel(&mut self, x: u32, y: u32, px: Pixel) {
        if x >= self.raster.width() || y >= self.raster.height() {
            return;
        }
        if self.raster.pixel(x, y) == px {
            return;
        }
        self.journal.record(&*self.raster, x, y);
        self.raster.set_pixel(x, y, px);
    }
}
