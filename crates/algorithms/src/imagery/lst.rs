//! Land surface temperature

use uhimon_core::raster::Raster;
use uhimon_core::Result;

use super::{build_output, map_cells};
use crate::calibration::{to_temperature_celsius, DN_NODATA};

/// Land surface temperature in °C from a Level-2 surface temperature band.
///
/// Cells holding the band's no-data DN (0 when the band declares none)
/// become NaN.
pub fn land_surface_temperature(thermal: &Raster<u16>) -> Result<Raster<f64>> {
    let (rows, cols) = thermal.shape();
    let nodata = thermal.nodata().unwrap_or(DN_NODATA);
    let dn = thermal.data();

    let data = map_cells(rows, cols, |row, col| {
        let v = dn[(row, col)];
        if v == nodata {
            f64::NAN
        } else {
            to_temperature_celsius(v as f64)
        }
    });

    build_output(thermal, data)
}
