//! Nearest-neighbour resampling onto a common WGS84 grid.
//!
//! Every band of one analysis is warped onto the same [`TargetGrid`], so the
//! resulting rasters share shape, geotransform and CRS exactly.

use ndarray::Array2;
use uhimon_core::bbox::BoundingBox;
use uhimon_core::crs::CRS;
use uhimon_core::raster::{GeoTransform, Raster, RasterElement};

use crate::error::{CloudError, Result};
use crate::reproject::{self, Projection};
use crate::tile_index::MapRect;

/// Pixel grid covering a bounding box in EPSG:4326.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetGrid {
    bbox: BoundingBox,
    rows: usize,
    cols: usize,
    transform: GeoTransform,
}

impl TargetGrid {
    /// Grid of roughly `resolution_deg` pixels spanning `bbox` exactly.
    ///
    /// The pixel size is adjusted so a whole number of pixels fits each
    /// axis, then coarsened uniformly if either axis would exceed `max_dim`.
    pub fn for_bbox(bbox: BoundingBox, resolution_deg: f64, max_dim: usize) -> Result<Self> {
        if !resolution_deg.is_finite() || resolution_deg <= 0.0 {
            return Err(uhimon_core::Error::InvalidParameter {
                name: "resolution_deg",
                value: resolution_deg.to_string(),
                reason: "must be a positive number of degrees".into(),
            }
            .into());
        }
        if max_dim == 0 {
            return Err(uhimon_core::Error::InvalidParameter {
                name: "max_grid_dim",
                value: "0".into(),
                reason: "must be at least 1".into(),
            }
            .into());
        }

        let mut res = resolution_deg;
        let longest = bbox.width().max(bbox.height()) / res;
        if longest > max_dim as f64 {
            res *= longest / max_dim as f64;
        }

        let axis = |extent: f64| ((extent / res).round() as usize).clamp(1, max_dim);
        let cols = axis(bbox.width());
        let rows = axis(bbox.height());

        let transform = GeoTransform::from_bounds(
            bbox.min_lon(),
            bbox.min_lat(),
            bbox.max_lon(),
            bbox.max_lat(),
            cols,
            rows,
        );

        Ok(Self {
            bbox,
            rows,
            cols,
            transform,
        })
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> CRS {
        CRS::wgs84()
    }

    /// Envelope of this grid in `crs`, padded by `margin` map units so
    /// nearest-neighbour lookups at the edges still find a source pixel.
    pub fn footprint_in(&self, crs: &CRS, margin: f64) -> Result<MapRect> {
        Ok(reproject::bbox_to_crs(&self.bbox, crs)?.expand(margin))
    }

    /// Raster on this grid with every cell set to `fill`, marked as no-data.
    pub fn filled<T: RasterElement>(&self, fill: T) -> Raster<T> {
        Raster::filled(self.rows, self.cols, fill)
            .with_transform(self.transform)
            .with_crs(self.crs())
            .with_nodata(fill)
    }
}

/// Resample `source` onto `target`, sampling the source pixel that contains
/// each target pixel centre.
///
/// Target cells that fall outside the source, or on source no-data, receive
/// `fill`, which is also recorded as the output's no-data value.
pub fn warp_nearest<T: RasterElement>(
    source: &Raster<T>,
    target: &TargetGrid,
    fill: T,
) -> Result<Raster<T>> {
    let crs = source
        .crs()
        .ok_or_else(|| CloudError::UnsupportedCrs("source raster has no CRS".into()))?;
    let projection = Projection::for_crs(crs)?;

    let (rows, cols) = target.shape();
    let (src_rows, src_cols) = source.shape();
    let src_gt = source.transform();
    let src = source.data();

    let data = Array2::from_shape_fn((rows, cols), |(row, col)| {
        let (lon, lat) = target.transform().pixel_to_geo(col, row);
        let (x, y) = projection.forward(lon, lat);
        match src_gt.pixel_index(x, y, src_cols, src_rows) {
            Some(idx) if !source.is_nodata(src[idx]) => src[idx],
            _ => fill,
        }
    });

    Ok(Raster::from_array(data)
        .with_transform(*target.transform())
        .with_crs(target.crs())
        .with_nodata(fill))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use uhimon_core::crs::UtmZone;

    fn madrid_bbox() -> BoundingBox {
        BoundingBox::new(-3.72, 40.40, -3.69, 40.42).unwrap()
    }

    #[test]
    fn test_grid_spans_bbox_exactly() {
        let grid = TargetGrid::for_bbox(madrid_bbox(), 0.0003, 4096).unwrap();
        assert_eq!(grid.shape(), (67, 100));

        let (min_x, min_y, max_x, max_y) = grid.transform().bounds(100, 67);
        assert_relative_eq!(min_x, -3.72, epsilon = 1e-12);
        assert_relative_eq!(min_y, 40.40, epsilon = 1e-12);
        assert_relative_eq!(max_x, -3.69, epsilon = 1e-12);
        assert_relative_eq!(max_y, 40.42, epsilon = 1e-12);
    }

    #[test]
    fn test_grid_is_capped() {
        let bbox = BoundingBox::new(-4.0, 40.0, -3.0, 40.5).unwrap();
        let grid = TargetGrid::for_bbox(bbox, 0.0003, 500).unwrap();
        let (rows, cols) = grid.shape();
        assert_eq!(cols, 500);
        assert_eq!(rows, 250);
    }

    #[test]
    fn test_tiny_bbox_gets_one_pixel() {
        let bbox = BoundingBox::new(0.0, 0.0, 0.00001, 0.00001).unwrap();
        let grid = TargetGrid::for_bbox(bbox, 0.0003, 100).unwrap();
        assert_eq!(grid.shape(), (1, 1));
    }

    #[test]
    fn test_invalid_resolution() {
        assert!(TargetGrid::for_bbox(madrid_bbox(), 0.0, 100).is_err());
        assert!(TargetGrid::for_bbox(madrid_bbox(), 0.0003, 0).is_err());
    }

    #[test]
    fn test_warp_identity_grid() {
        let bbox = BoundingBox::new(0.0, 0.0, 2.0, 2.0).unwrap();
        let grid = TargetGrid::for_bbox(bbox, 1.0, 10).unwrap();
        let source = Raster::from_vec(vec![1u16, 2, 3, 0], 2, 2)
            .unwrap()
            .with_transform(*grid.transform())
            .with_crs(CRS::wgs84())
            .with_nodata(0);

        let out = warp_nearest(&source, &grid, 0).unwrap();
        assert_eq!(out.data().iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 0]);
        assert_eq!(out.nodata(), Some(0));
        assert!(source.ensure_same_grid(&out).is_ok());
    }

    #[test]
    fn test_warp_from_utm_samples_containing_pixel() {
        // 30 m UTM 30N raster whose values encode their own column index
        let zone = UtmZone { zone: 30, north: true };
        let bbox = madrid_bbox();
        let rect = reproject::bbox_to_crs(&bbox, &CRS::from_epsg(32630)).unwrap().expand(60.0);
        let cols = ((rect.max_x - rect.min_x) / 30.0).ceil() as usize;
        let rows = ((rect.max_y - rect.min_y) / 30.0).ceil() as usize;
        let src_gt = GeoTransform::new(rect.min_x, rect.max_y, 30.0, -30.0);
        let data = Array2::from_shape_fn((rows, cols), |(_, c)| (c + 1) as u16);
        let source = Raster::from_array(data)
            .with_transform(src_gt)
            .with_crs(CRS::from_epsg(32630))
            .with_nodata(0);

        let grid = TargetGrid::for_bbox(bbox, 0.0003, 4096).unwrap();
        let out = warp_nearest(&source, &grid, 0).unwrap();

        assert_eq!(out.valid_count(), out.len());
        for (row, col) in [(0, 0), (33, 50), (66, 99)] {
            let (lon, lat) = grid.transform().pixel_to_geo(col, row);
            let (e, _) = reproject::wgs84_to_utm(lon, lat, zone);
            let expected = ((e - rect.min_x) / 30.0).floor() as u16 + 1;
            assert_eq!(out.get(row, col).unwrap(), expected);
        }
    }

    #[test]
    fn test_warp_outside_source_is_fill() {
        let bbox = BoundingBox::new(10.0, 10.0, 12.0, 12.0).unwrap();
        let grid = TargetGrid::for_bbox(bbox, 1.0, 10).unwrap();
        let source = Raster::filled(2, 2, 7u16)
            .with_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0))
            .with_crs(CRS::wgs84());

        let out = warp_nearest(&source, &grid, 0).unwrap();
        assert_eq!(out.valid_count(), 0);
    }

    #[test]
    fn test_warp_requires_source_crs() {
        let grid = TargetGrid::for_bbox(madrid_bbox(), 0.001, 100).unwrap();
        let source: Raster<u16> = Raster::new(2, 2);
        assert!(warp_nearest(&source, &grid, 0).is_err());
    }
}
