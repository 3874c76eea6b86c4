//! Statistics over derived grids
//!
//! - **summary**: min/max/mean/std/percentiles over valid cells, UHI magnitude
//! - **correlation**: Pearson correlation over cells valid in both grids
//!
//! A cell is valid when it is finite and not the grid's no-data value.

pub mod correlation;
pub mod summary;

pub use correlation::pearson_correlation;
pub use summary::{summary_statistics, uhi_magnitude, valid_values, Statistics};
