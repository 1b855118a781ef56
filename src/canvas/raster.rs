use std::collections::HashMap;

use crate::canvas::blend::PaintOp;
use crate::utils::color::Pixel;
use crate::utils::rect::Rect;
use crate::utils::vector::{Vec2, distance_to_segment};

/// Pixel store primitives shared by every tool.
///
/// Tools only ever talk to this trait, so the same interpolation and
/// dab code runs against a plain layer raster or a journaling wrapper.
pub trait RasterBuffer {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Read a pixel; out-of-range coordinates read as transparent.
    fn pixel(&self, x: u32, y: u32) -> Pixel;

    /// Write a pixel; out-of-range coordinates are ignored.
    fn set_pixel(&mut self, x: u32, y: u32, px: Pixel);

    fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width() as i32, self.height() as i32)
    }

    /// Composite `src` onto the pixel at (x, y).
    fn composite_pixel(&mut self, x: u32, y: u32, src: Pixel, op: PaintOp) {
        let dst = self.pixel(x, y);
        let out = op.apply(src, dst);
        if out != dst {
            self.set_pixel(x, y, out);
        }
    }

    /// Copy a block out in row-major order. The rect is clamped to the buffer.
    fn read_block(&self, rect: Rect) -> Vec<Pixel> {
        let rect = rect.clamp_to(self.width(), self.height());
        rect.pixels()
            .map(|(x, y)| self.pixel(x as u32, y as u32))
            .collect()
    }

    /// Write a row-major block. `rect` must lie inside the buffer and match `data`.
    fn write_block(&mut self, rect: Rect, data: &[Pixel]) {
        debug_assert_eq!(rect.area(), data.len());
        for ((x, y), px) in rect.pixels().zip(data.iter()) {
            self.set_pixel(x as u32, y as u32, *px);
        }
    }

    fn fill(&mut self, rect: Rect, px: Pixel) {
        for (x, y) in rect.clamp_to(self.width(), self.height()).pixels() {
            self.set_pixel(x as u32, y as u32, px);
        }
    }

    fn clear_region(&mut self, rect: Rect) {
        self.fill(rect, Pixel::TRANSPARENT);
    }

    /// Draw a segment of the given width. `weight` scales the source per pixel
    /// (selection coverage); pixels with zero weight are left untouched.
    fn draw_segment(
        &mut self,
        from: Vec2,
        to: Vec2,
        width: f32,
        src: Pixel,
        op: PaintOp,
        weight: &dyn Fn(u32, u32) -> f32,
    ) {
        let half = (width.max(1.0)) / 2.0;
        let bbox = Rect::new(
            (from.x.min(to.x) - half).floor() as i32,
            (from.y.min(to.y) - half).floor() as i32,
            (from.x.max(to.x) + half).ceil() as i32 + 1,
            (from.y.max(to.y) + half).ceil() as i32 + 1,
        )
        .clamp_to(self.width(), self.height());

        for (x, y) in bbox.pixels() {
            let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            if distance_to_segment(center, from, to) > half {
                continue;
            }
            let w = weight(x as u32, y as u32);
            if w <= 0.0 {
                continue;
            }
            let scaled = src.scale_alpha((w.min(1.0) * 255.0).round() as u32);
            self.composite_pixel(x as u32, y as u32, scaled, op);
        }
    }
}

/// Tiled layer storage. Tiles are allocated on first write; a missing tile
/// reads as fully transparent.
#[derive(Clone, Debug)]
pub struct TiledRaster {
    width: u32,
    height: u32,
    tile_size: u32,
    tiles: HashMap<(u32, u32), Box<[Pixel]>>,
}

impl TiledRaster {
    pub fn new(width: u32, height: u32, tile_size: u32) -> Self {
        Self {
            width,
            height,
            tile_size: tile_size.max(1),
            tiles: HashMap::new(),
        }
    }

    /// Size of a tile edge in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Tile coordinates holding the pixel at (x, y).
    #[inline]
    pub fn tile_coords(&self, x: u32, y: u32) -> (u32, u32) {
        (x / self.tile_size, y / self.tile_size)
    }

    #[inline]
    fn local_index(&self, x: u32, y: u32) -> usize {
        let lx = x % self.tile_size;
        let ly = y % self.tile_size;
        (ly * self.tile_size + lx) as usize
    }

    pub fn tile(&self, tx: u32, ty: u32) -> Option<&[Pixel]> {
        self.tiles.get(&(tx, ty)).map(|t| &t[..])
    }

    /// Mutable tile access, allocating a transparent tile if absent.
    pub fn tile_mut(&mut self, tx: u32, ty: u32) -> &mut [Pixel] {
        let len = (self.tile_size * self.tile_size) as usize;
        self.tiles
            .entry((tx, ty))
            .or_insert_with(|| vec![Pixel::TRANSPARENT; len].into_boxed_slice())
    }

    /// Swap a tile's storage, returning what was there.
    pub fn replace_tile(
        &mut self,
        key: (u32, u32),
        tile: Option<Box<[Pixel]>>,
    ) -> Option<Box<[Pixel]>> {
        match tile {
            Some(data) => self.tiles.insert(key, data),
            None => self.tiles.remove(&key),
        }
    }

    pub fn allocated_tiles(&self) -> usize {
        self.tiles.len()
    }

    /// Unallocated tiles overlapping `rect`, i.e. what writing all of it would allocate.
    pub fn missing_tiles(&self, rect: Rect) -> usize {
        let rect = rect.clamp_to(self.width, self.height);
        if rect.is_empty() {
            return 0;
        }
        let ts = self.tile_size as i32;
        let mut missing = 0;
        for ty in rect.top / ts..=(rect.bottom - 1) / ts {
            for tx in rect.left / ts..=(rect.right - 1) / ts {
                if !self.tiles.contains_key(&(tx as u32, ty as u32)) {
                    missing += 1;
                }
            }
        }
        missing
    }

    /// Bytes one allocated tile occupies.
    pub fn tile_bytes(&self) -> u64 {
        self.tile_size as u64 * self.tile_size as u64 * 4
    }

    /// Keys of allocated tiles in a stable order.
    pub fn tile_keys(&self) -> Vec<(u32, u32)> {
        let mut keys: Vec<_> = self.tiles.keys().copied().collect();
        keys.sort_unstable_by_key(|&(tx, ty)| (ty, tx));
        keys
    }

    /// True when no pixel carries any alpha.
    pub fn is_blank(&self) -> bool {
        self.tiles.values().all(|t| t.iter().all(|p| p.a == 0))
    }

    /// Pixel-wise equality regardless of which tiles happen to be allocated.
    pub fn content_eq(&self, other: &TiledRaster) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.read_block(self.bounds()) == other.read_block(other.bounds())
    }

    /// Bounding box of every pixel with non-zero alpha.
    pub fn content_bounds(&self) -> Rect {
        let mut bounds = Rect::empty();
        for ((tx, ty), data) in &self.tiles {
            for (i, px) in data.iter().enumerate() {
                if px.a == 0 {
                    continue;
                }
                let x = tx * self.tile_size + i as u32 % self.tile_size;
                let y = ty * self.tile_size + i as u32 / self.tile_size;
                if x < self.width && y < self.height {
                    bounds.include(x as i32, y as i32);
                }
            }
        }
        bounds
    }
}

impl RasterBuffer for TiledRaster {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn pixel(&self, x: u32, y: u32) -> Pixel {
        if x >= self.width || y >= self.height {
            return Pixel::TRANSPARENT;
        }
        let (tx, ty) = self.tile_coords(x, y);
        match self.tiles.get(&(tx, ty)) {
            Some(tile) => tile[self.local_index(x, y)],
            None => Pixel::TRANSPARENT,
        }
    }

    #[inline]
    fn set_pixel(&mut self, x: u32, y: u32, px: Pixel) {
        if x >= self.width || y >= self.height {
            return;
        }
        let (tx, ty) = self.tile_coords(x, y);
        if px == Pixel::TRANSPARENT && !self.tiles.contains_key(&(tx, ty)) {
            return;
        }
        let idx = self.local_index(x, y);
        self.tile_mut(tx, ty)[idx] = px;
    }

    fn read_block(&self, rect: Rect) -> Vec<Pixel> {
        let rect = rect.clamp_to(self.width, self.height);
        let mut out = vec![Pixel::TRANSPARENT; rect.area()];
        if rect.is_empty() {
            return out;
        }
        let row_len = rect.width() as usize;
        for y in rect.top as u32..rect.bottom as u32 {
            let row = (y - rect.top as u32) as usize * row_len;
            let mut x = rect.left as u32;
            while x < rect.right as u32 {
                let (tx, ty) = self.tile_coords(x, y);
                let span_end = ((tx + 1) * self.tile_size).min(rect.right as u32);
                if let Some(tile) = self.tiles.get(&(tx, ty)) {
                    let start = self.local_index(x, y);
                    let len = (span_end - x) as usize;
                    let dst = row + (x - rect.left as u32) as usize;
                    out[dst..dst + len].copy_from_slice(&tile[start..start + len]);
                }
                x = span_end;
            }
        }
        out
    }

    fn write_block(&mut self, rect: Rect, data: &[Pixel]) {
        debug_assert_eq!(rect.area(), data.len());
        if rect.is_empty() {
            return;
        }
        let row_len = rect.width() as usize;
        for y in rect.top.max(0) as u32..(rect.bottom as u32).min(self.height) {
            let row = (y as i32 - rect.top) as usize * row_len;
            let mut x = rect.left.max(0) as u32;
            let right = (rect.right as u32).min(self.width);
            while x < right {
                let (tx, ty) = self.tile_coords(x, y);
                let span_end = ((tx + 1) * self.tile_size).min(right);
                let len = (span_end - x) as usize;
                let src = row + (x as i32 - rect.left) as usize;
                let src = &data[src..src + len];
                let needs_tile =
                    self.tiles.contains_key(&(tx, ty)) || src.iter().any(|p| p.a != 0);
                if needs_tile {
                    let start = self.local_index(x, y);
                    self.tile_mut(tx, ty)[start..start + len].copy_from_slice(src);
                }
                x = span_end;
            }
        }
    }
}
