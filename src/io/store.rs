use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use image::{ImageFormat, RgbaImage};

use crate::canvas::raster::{RasterBuffer, TiledRaster};
use crate::error::Result;
use crate::utils::color::Pixel;

/// Keyed blob storage for layer payloads.
pub trait RasterStore {
    fn put(&mut self, key: &str, data: Vec<u8>) -> Result<()>;

    /// `Ok(None)` when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        self.blobs.remove(key)
    }
}

impl RasterStore for MemoryStore {
    fn put(&mut self, key: &str, data: Vec<u8>) -> Result<()> {
        self.blobs.insert(key.to_string(), data);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).cloned())
    }
}

/// One PNG file per key inside a directory.
#[derive(Clone, Debug)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.root.join(format!("{name}.png"))
    }
}

impl RasterStore for DirStore {
    fn put(&mut self, key: &str, data: Vec<u8>) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.path_for(key), data)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Encode a layer as straight-alpha PNG.
pub fn encode_raster(raster: &TiledRaster) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(raster.width() as usize * raster.height() as usize * 4);
    for px in raster.read_block(raster.bounds()) {
        bytes.extend_from_slice(&px.to_rgba_unmultiplied());
    }
    let image = RgbaImage::from_raw(raster.width(), raster.height(), bytes)
        .unwrap_or_else(|| RgbaImage::new(raster.width(), raster.height()));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Decode a PNG payload. Fully transparent pixels leave their tiles unallocated.
pub fn decode_raster(bytes: &[u8], tile_size: u32) -> Result<TiledRaster> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8();
    let mut raster = TiledRaster::new(image.width(), image.height(), tile_size);
    for (x, y, px) in image.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        if a > 0 {
            raster.set_pixel(x, y, Pixel::from_rgba_unmultiplied(r, g, b, a));
        }
    }
    Ok(raster)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_pixels_survive_png() {
        let mut raster = TiledRaster::new(20, 12, 8);
        raster.set_pixel(3, 4, Pixel::from_rgba_premultiplied(200, 10, 30, 255));
        raster.set_pixel(19, 11, Pixel::WHITE);

        let bytes = encode_raster(&raster).unwrap();
        let decoded = decode_raster(&bytes, 8).unwrap();
        assert!(decoded.content_eq(&raster));
        assert_eq!(decoded.allocated_tiles(), 2);
    }

    #[test]
    fn memory_store_misses_are_none() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("nope").unwrap(), None);
        store.put("k", vec![1, 2]).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(vec![1, 2]));
        assert_eq!(store.len(), 1);
    }
}
