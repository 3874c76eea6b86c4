//! # uhimon core
//!
//! Core types shared by every uhimon crate.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced 2-D grid (band grids and derived grids)
//! - `GeoTransform`: affine pixel-to-map transformation
//! - `CRS`: coordinate reference system identity
//! - `BoundingBox`: validated WGS84 extent used for requests and image bounds

pub mod bbox;
pub mod crs;
pub mod error;
pub mod raster;

pub use bbox::BoundingBox;
pub use crs::{UtmZone, CRS};
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bbox::BoundingBox;
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
}
