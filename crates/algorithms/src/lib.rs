//! # uhimon algorithms
//!
//! Numeric core of the LST/NDVI analysis.
//!
//! ## Modules
//!
//! - **calibration**: Landsat Level-2 DN → temperature / reflectance, scalar normalized difference
//! - **imagery**: LST and NDVI grids built from band rasters
//! - **statistics**: summary statistics, Pearson correlation, UHI magnitude
//!
//! Derived grids use NaN as the invalid-cell marker.

pub mod calibration;
pub mod imagery;
pub mod statistics;

pub(crate) mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::calibration::{to_reflectance, to_temperature_celsius};
    pub use crate::imagery::{land_surface_temperature, ndvi, NdviParams};
    pub use crate::statistics::{
        pearson_correlation, summary_statistics, uhi_magnitude, Statistics,
    };
    pub use uhimon_core::prelude::*;
}
