//! Summary statistics

use serde::{Deserialize, Serialize};
use uhimon_core::raster::Raster;
use uhimon_core::{Error, Result};

/// Summary of the valid cells of one grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub median: f64,
    pub p25: f64,
    pub p75: f64,
    pub valid_count: usize,
}

impl Statistics {
    /// Statistics of `values`, or `None` when empty.
    ///
    /// Every value must be finite.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean,
            std: variance.sqrt(),
            median: percentile(&sorted, 0.5),
            p25: percentile(&sorted, 0.25),
            p75: percentile(&sorted, 0.75),
            valid_count: values.len(),
        })
    }

    /// max - min
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Linear-interpolated percentile of sorted, non-empty data; `q` in [0, 1].
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Valid cells of `grid` in row-major order.
pub fn valid_values(grid: &Raster<f64>) -> Vec<f64> {
    grid.data()
        .iter()
        .copied()
        .filter(|v| v.is_finite() && !grid.is_nodata(*v))
        .collect()
}

/// Statistics over the valid cells of `grid`.
///
/// Fails with [`Error::InsufficientData`] when fewer than `min_valid` cells
/// (and always when none) are valid.
pub fn summary_statistics(grid: &Raster<f64>, min_valid: usize) -> Result<Statistics> {
    let values = valid_values(grid);
    let required = min_valid.max(1);
    if values.len() < required {
        return Err(Error::InsufficientData {
            valid: values.len(),
            required,
        });
    }
    Statistics::from_values(&values).ok_or(Error::InsufficientData { valid: 0, required })
}

/// Urban heat island magnitude: `max - min` of the valid LST cells.
///
/// This is the scene-wide temperature range, a simplification of the usual
/// urban-minus-rural differential.
pub fn uhi_magnitude(lst: &Raster<f64>) -> Result<f64> {
    let (min, max) = valid_values(lst)
        .into_iter()
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .ok_or(Error::InsufficientData {
            valid: 0,
            required: 1,
        })?;
    Ok(max - min)
}
