//! Tile decoding: decompression, predictor reversal and sample conversion.
//!
//! Supports DEFLATE (via `flate2`), LZW (via `weezl`) and uncompressed tiles,
//! with TIFF horizontal differencing (predictor 2) undone afterwards.

use uhimon_core::RasterElement;

use crate::error::{CloudError, Result};
use crate::ifd::Endian;

/// TIFF compression codes.
pub mod compression {
    pub const NONE: u16 = 1;
    pub const LZW: u16 = 5;
    pub const DEFLATE: u16 = 8;
    pub const ADOBE_DEFLATE: u16 = 32946;
}

/// TIFF predictor codes.
pub mod predictor {
    pub const NONE: u16 = 1;
    pub const HORIZONTAL: u16 = 2;
}

/// TIFF sample format codes.
pub mod sample_format {
    pub const UNSIGNED_INT: u16 = 1;
    pub const SIGNED_INT: u16 = 2;
    pub const FLOAT: u16 = 3;
}

/// Decompress raw tile bytes according to the compression method.
pub fn decompress_tile(data: &[u8], compression_code: u16, expected_size: usize) -> Result<Vec<u8>> {
    match compression_code {
        compression::NONE => Ok(data.to_vec()),

        #[cfg(feature = "deflate")]
        compression::DEFLATE | compression::ADOBE_DEFLATE => {
            use std::io::Read;
            // zlib-wrapped per the TIFF spec; some writers emit raw deflate
            let mut out = Vec::with_capacity(expected_size);
            if flate2::read::ZlibDecoder::new(data).read_to_end(&mut out).is_ok() {
                return Ok(out);
            }
            out.clear();
            flate2::read::DeflateDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|e| CloudError::Decompress(format!("DEFLATE: {e}")))?;
            Ok(out)
        }

        #[cfg(feature = "lzw")]
        compression::LZW => weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
            .decode(data)
            .map_err(|e| CloudError::Decompress(format!("LZW: {e}"))),

        other => Err(CloudError::UnsupportedCompression(other)),
    }
}

/// Reverse horizontal differencing in place.
///
/// `row_len` is the number of samples per tile row; each sample is
/// `bytes_per_sample` wide and stored in `endian` order.
pub fn undo_horizontal_predictor(
    buf: &mut [u8],
    row_len: usize,
    bytes_per_sample: usize,
    endian: Endian,
) -> Result<()> {
    let row_bytes = row_len * bytes_per_sample;
    if row_bytes == 0 {
        return Ok(());
    }

    for row in buf.chunks_mut(row_bytes) {
        match bytes_per_sample {
            1 => {
                for i in 1..row.len() {
                    row[i] = row[i].wrapping_add(row[i - 1]);
                }
            }
            2 => {
                let mut prev = 0u16;
                for (i, px) in row.chunks_exact_mut(2).enumerate() {
                    let v = endian.u16(px);
                    let cur = if i == 0 { v } else { v.wrapping_add(prev) };
                    endian.write_u16(px, cur);
                    prev = cur;
                }
            }
            4 => {
                let mut prev = 0u32;
                for (i, px) in row.chunks_exact_mut(4).enumerate() {
                    let v = endian.u32(px);
                    let cur = if i == 0 { v } else { v.wrapping_add(prev) };
                    endian.write_u32(px, cur);
                    prev = cur;
                }
            }
            other => {
                return Err(CloudError::Decompress(format!(
                    "horizontal predictor with {other}-byte samples"
                )))
            }
        }
    }
    Ok(())
}

/// Decode samples stored in `endian` order into `T`.
///
/// Values that do not fit `T` become `T::default_nodata()`.
pub fn decode_samples<T: RasterElement>(
    raw: &[u8],
    bits_per_sample: u16,
    sample_format: u16,
    endian: Endian,
) -> Result<Vec<T>> {
    let convert = |v: f64| T::from_f64(v);

    let values: Vec<T> = match (bits_per_sample, sample_format) {
        (8, sample_format::UNSIGNED_INT) => raw.iter().map(|&b| convert(b as f64)).collect(),
        (8, sample_format::SIGNED_INT) => raw.iter().map(|&b| convert(b as i8 as f64)).collect(),
        (16, sample_format::UNSIGNED_INT) => raw
            .chunks_exact(2)
            .map(|b| convert(endian.u16(b) as f64))
            .collect(),
        (16, sample_format::SIGNED_INT) => raw
            .chunks_exact(2)
            .map(|b| convert(endian.u16(b) as i16 as f64))
            .collect(),
        (32, sample_format::UNSIGNED_INT) => raw
            .chunks_exact(4)
            .map(|b| convert(endian.u32(b) as f64))
            .collect(),
        (32, sample_format::SIGNED_INT) => raw
            .chunks_exact(4)
            .map(|b| convert(endian.u32(b) as i32 as f64))
            .collect(),
        (32, sample_format::FLOAT) => raw
            .chunks_exact(4)
            .map(|b| convert(endian.f32(b) as f64))
            .collect(),
        (64, sample_format::FLOAT) => raw.chunks_exact(8).map(|b| convert(endian.f64(b))).collect(),
        (bps, sf) => return Err(CloudError::UnsupportedDataType { bps, sf }),
    };

    Ok(values)
}
