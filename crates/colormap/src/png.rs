//! PNG encoding of rendered rasters.

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use uhimon_core::raster::{Raster, RasterElement};

use crate::render::{raster_to_rgba, ColormapParams};

/// Errors from image encoding.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("RGBA buffer of {len} bytes does not match {width}x{height}")]
    BufferSize { len: usize, width: u32, height: u32 },

    #[error("image dimensions {rows}x{cols} exceed the PNG limit")]
    TooLarge { rows: usize, cols: usize },

    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Encode a row-major RGBA8 buffer as PNG.
pub fn encode_rgba_png(rgba: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(EncodeError::BufferSize {
            len: rgba.len(),
            width,
            height,
        });
    }
    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(rgba, width, height, ColorType::Rgba8)?;
    Ok(out)
}

/// Colorize `raster` with `params` and encode it as an RGBA PNG, one image
/// pixel per raster cell with row 0 at the top.
pub fn render_png<T: RasterElement>(
    raster: &Raster<T>,
    params: &ColormapParams,
) -> Result<Vec<u8>, EncodeError> {
    let (rows, cols) = raster.shape();
    let (Ok(height), Ok(width)) = (u32::try_from(rows), u32::try_from(cols)) else {
        return Err(EncodeError::TooLarge { rows, cols });
    };
    encode_rgba_png(&raster_to_rgba(raster, params), width, height)
}
