//! # uhimon colormap
//!
//! Color mapping and PNG rendering for derived grids.
//!
//! Two fixed schemes cover the analysis outputs: [`ColorScheme::Thermal`]
//! for surface temperature and [`ColorScheme::Vegetation`] for NDVI. Values
//! are stretched between the grid's own min and max; invalid cells are
//! fully transparent.
//!
//! ## Usage
//!
//! ```
//! use uhimon_colormap::{auto_params, render_png, ColorScheme};
//! use uhimon_core::Raster;
//!
//! let lst = Raster::from_vec(vec![31.0, 35.5, f64::NAN, 40.2], 2, 2)
//!     .unwrap()
//!     .with_nodata(f64::NAN);
//! let params = auto_params(&lst, ColorScheme::Thermal);
//! let png = render_png(&lst, &params).unwrap();
//! assert!(png.starts_with(b"\x89PNG"));
//! ```

mod png;
mod render;
mod scheme;

pub use png::{encode_rgba_png, render_png, EncodeError};
pub use render::{auto_params, raster_to_rgba, ColormapParams};
pub use scheme::{evaluate, ColorScheme, ColorStop, Rgb};
