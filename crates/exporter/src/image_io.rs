//! PNG writer for `ImageData`

use std::path::Path;

use contracts::{ImageData, ImageFormat};

use crate::error::{ExportError, Result};

/// Save an image as PNG; BGRA buffers are converted to RGBA first.
pub fn save_png(path: &Path, image: &ImageData) -> Result<()> {
    if !image.is_well_formed() {
        return Err(ExportError::Image {
            path: path.to_path_buf(),
            source: image::ImageError::Parameter(image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::DimensionMismatch,
            )),
        });
    }

    let encode = |data: &[u8], color: image::ColorType| {
        image::save_buffer(path, data, image.width, image.height, color).map_err(|source| {
            ExportError::Image {
                path: path.to_path_buf(),
                source,
            }
        })
    };

    match image.format {
        ImageFormat::Rgb8 => encode(&image.data, image::ColorType::Rgb8),
        ImageFormat::Rgba8 => encode(&image.data, image::ColorType::Rgba8),
        ImageFormat::Gray8 => encode(&image.data, image::ColorType::L8),
        ImageFormat::Bgra8 => {
            let mut rgba = image.data.to_vec();
            for chunk in rgba.chunks_exact_mut(4) {
                chunk.swap(0, 2);
            }
            encode(&rgba, image::ColorType::Rgba8)
        }
    }
}
