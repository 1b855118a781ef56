use std::path::Path;

use image::{DynamicImage, ImageFormat};

use crate::canvas::stack::Composite;
use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    PNG,
    JPEG,
    TIFF,
}

impl ExportFormat {
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::PNG => "PNG",
            ExportFormat::JPEG => "JPEG",
            ExportFormat::TIFF => "TIFF",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::PNG => "png",
            ExportFormat::JPEG => "jpg",
            ExportFormat::TIFF => "tiff",
        }
    }

    /// Guess from a file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ExportFormat::PNG),
            "jpg" | "jpeg" => Some(ExportFormat::JPEG),
            "tif" | "tiff" => Some(ExportFormat::TIFF),
            _ => None,
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            ExportFormat::PNG => ImageFormat::Png,
            ExportFormat::JPEG => ImageFormat::Jpeg,
            ExportFormat::TIFF => ImageFormat::Tiff,
        }
    }
}

/// Write a flattened composite to disk.
pub fn export_composite(composite: &Composite, path: &Path, format: ExportFormat) -> Result<()> {
    let rgba = composite.to_rgba_image();
    // JPEG has no alpha channel.
    let image = match format {
        ExportFormat::JPEG => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).to_rgb8()),
        _ => DynamicImage::ImageRgba8(rgba),
    };
    image.save_with_format(path, format.image_format())?;
    log::info!("exported {}x{} {} to {}", composite.width, composite.height, format.label(), path.display());
    Ok(())
}
