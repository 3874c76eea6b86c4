//! GeoTIFF georeferencing from resolved IFD tags.
//!
//! Reads ModelPixelScale + ModelTiepoint (or ModelTransformation), the
//! GeoKeyDirectory CRS keys and GDAL_NODATA.

use uhimon_core::crs::CRS;
use uhimon_core::raster::GeoTransform;

use crate::error::{CloudError, Result};
use crate::ifd::{tags, ResolvedTags};

/// GeoKey ids carrying an EPSG code.
const GEOGRAPHIC_TYPE_KEY: u64 = 2048;
const PROJECTED_CS_TYPE_KEY: u64 = 3072;
/// GeoKey value meaning "user-defined", i.e. no EPSG code.
const USER_DEFINED: u64 = 32767;

/// GeoTIFF metadata of the full-resolution image.
#[derive(Debug, Clone)]
pub struct GeoTiffMeta {
    pub geo_transform: GeoTransform,
    pub crs: Option<CRS>,
    pub nodata: Option<f64>,
}

impl GeoTiffMeta {
    /// Tags that must be resolved before calling [`GeoTiffMeta::from_tags`].
    pub const GEO_TAGS: [u16; 5] = [
        tags::MODEL_PIXEL_SCALE,
        tags::MODEL_TIEPOINT,
        tags::MODEL_TRANSFORMATION,
        tags::GEO_KEY_DIRECTORY,
        tags::GDAL_NODATA,
    ];

    pub fn from_tags(t: &ResolvedTags) -> Result<Self> {
        let geo_transform = geotransform(t).ok_or_else(|| CloudError::InvalidTiff {
            reason: "no ModelPixelScale/ModelTiepoint or ModelTransformation".into(),
        })?;

        Ok(Self {
            geo_transform,
            crs: crs(t),
            nodata: t
                .ascii(tags::GDAL_NODATA)
                .and_then(|s| s.trim().parse::<f64>().ok()),
        })
    }
}

fn geotransform(t: &ResolvedTags) -> Option<GeoTransform> {
    let scale = t.floats(tags::MODEL_PIXEL_SCALE);
    let tiepoint = t.floats(tags::MODEL_TIEPOINT);

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint maps raster (i, j) to model (x, y)
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    // row-major 4x4 matrix
    let m = t.floats(tags::MODEL_TRANSFORMATION);
    (m.len() >= 16).then(|| GeoTransform {
        origin_x: m[3],
        origin_y: m[7],
        pixel_width: m[0],
        pixel_height: m[5],
        row_rotation: m[1],
        col_rotation: m[4],
    })
}

/// EPSG code from the GeoKeyDirectory; projected wins over geographic.
fn crs(t: &ResolvedTags) -> Option<CRS> {
    let dir = t.uints(tags::GEO_KEY_DIRECTORY);
    let header = dir.get(..4)?;
    let num_keys = header[3] as usize;

    let mut geographic = None;
    let mut projected = None;
    for key in dir[4..].chunks_exact(4).take(num_keys) {
        let (id, location, value) = (key[0], key[1], key[3]);
        if location != 0 || value == 0 || value == USER_DEFINED {
            continue;
        }
        match id {
            PROJECTED_CS_TYPE_KEY => projected = Some(value as u32),
            GEOGRAPHIC_TYPE_KEY => geographic = Some(value as u32),
            _ => {}
        }
    }

    projected.or(geographic).map(CRS::from_epsg)
}
