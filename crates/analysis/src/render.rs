//! Rendering of derived grids to georeferenced PNG overlays.

use std::fmt;

use serde::{Deserialize, Serialize};
use uhimon_cloud::reproject::rect_to_wgs84;
use uhimon_cloud::MapRect;
use uhimon_colormap::{auto_params, render_png, ColorScheme};
use uhimon_core::{BoundingBox, Raster};

use crate::error::{AnalysisError, Result};

/// The derived grids an analysis produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridKind {
    Lst,
    Ndvi,
}

impl GridKind {
    pub fn scheme(&self) -> ColorScheme {
        match self {
            GridKind::Lst => ColorScheme::Thermal,
            GridKind::Ndvi => ColorScheme::Vegetation,
        }
    }
}

impl fmt::Display for GridKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GridKind::Lst => "LST",
            GridKind::Ndvi => "NDVI",
        })
    }
}

/// PNG image plus the WGS84 extent it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedGrid {
    pub png: Vec<u8>,
    pub bounds: BoundingBox,
}

/// Color-map `grid` with the scheme for `kind`, stretched over its own
/// valid range.
pub fn render_grid(grid: &Raster<f64>, kind: GridKind) -> Result<RenderedGrid> {
    let params = auto_params(grid, kind.scheme());
    let png = render_png(grid, &params).map_err(|e| AnalysisError::Render(e.to_string()))?;
    Ok(RenderedGrid {
        png,
        bounds: wgs84_bounds(grid)?,
    })
}

/// Extent of `grid` in WGS84, reprojecting when the grid is in another CRS.
pub fn wgs84_bounds(grid: &Raster<f64>) -> Result<BoundingBox> {
    match grid.crs() {
        Some(crs) if !crs.is_wgs84() => {
            let (min_x, min_y, max_x, max_y) = grid.bounds();
            rect_to_wgs84(&MapRect::new(min_x, min_y, max_x, max_y), crs)
                .map_err(|e| AnalysisError::Render(e.to_string()))
        }
        _ => grid
            .geographic_bounds()
            .map_err(|e| AnalysisError::Render(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uhimon_core::{GeoTransform, CRS};

    #[test]
    fn test_geographic_grid_bounds_pass_through() {
        let grid = Raster::filled(10, 20, 1.0)
            .with_transform(GeoTransform::from_bounds(-3.75, 40.40, -3.65, 40.45, 20, 10))
            .with_crs(CRS::wgs84());
        let b = wgs84_bounds(&grid).unwrap();
        let expected = BoundingBox::new(-3.75, 40.40, -3.65, 40.45).unwrap();
        assert!(b.approx_eq(&expected, 1e-12), "{b}");
        assert_eq!(b.to_leaflet(), [[40.40, -3.75], [40.45, -3.65]]);
    }

    #[test]
    fn test_projected_grid_bounds_are_reprojected() {
        // ~3 km square in UTM 30N near Madrid.
        let grid = Raster::filled(100, 100, 1.0)
            .with_transform(GeoTransform::new(440_000.0, 4_474_000.0, 30.0, -30.0))
            .with_crs(CRS::from_epsg(32630));
        let b = wgs84_bounds(&grid).unwrap();
        assert!(b.min_lon() > -3.8 && b.max_lon() < -3.6, "{b}");
        assert!(b.min_lat() > 40.3 && b.max_lat() < 40.5, "{b}");
        assert!(b.width() > 0.03 && b.height() > 0.02, "{b}");
    }

    #[test]
    fn test_render_produces_png_with_bounds() {
        let grid = Raster::from_vec(vec![30.0, 35.0, f64::NAN, 40.0], 2, 2)
            .unwrap()
            .with_transform(GeoTransform::from_bounds(0.0, 0.0, 1.0, 1.0, 2, 2))
            .with_crs(CRS::wgs84())
            .with_nodata(f64::NAN);
        let out = render_grid(&grid, GridKind::Lst).unwrap();
        assert!(out.png.starts_with(b"\x89PNG"));
        assert_eq!(out.bounds.to_array(), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_scheme_per_grid() {
        assert_eq!(GridKind::Lst.scheme(), ColorScheme::Thermal);
        assert_eq!(GridKind::Ndvi.scheme(), ColorScheme::Vegetation);
    }
}
