//! Pearson correlation between two grids

use uhimon_core::raster::Raster;
use uhimon_core::Result;

/// Pearson correlation coefficient over the cells valid in both grids.
///
/// Returns `Ok(None)` when fewer than two cells are shared or either grid
/// is constant over the shared cells. The result is symmetric in its
/// arguments and clamped to [-1, 1].
pub fn pearson_correlation(a: &Raster<f64>, b: &Raster<f64>) -> Result<Option<f64>> {
    a.ensure_same_grid(b)?;

    let valid = |grid: &Raster<f64>, v: f64| v.is_finite() && !grid.is_nodata(v);
    let pairs: Vec<(f64, f64)> = a
        .data()
        .iter()
        .zip(b.data().iter())
        .filter(|&(&x, &y)| valid(a, x) && valid(b, y))
        .map(|(&x, &y)| (x, y))
        .collect();

    if pairs.len() < 2 {
        return Ok(None);
    }
    // Exact check: the float mean of identical values need not equal them.
    let (x0, y0) = pairs[0];
    if pairs.iter().all(|p| p.0 == x0) || pairs.iter().all(|p| p.1 == y0) {
        return Ok(None);
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in &pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return Ok(None);
    }
    Ok(Some((sxy / denom).clamp(-1.0, 1.0)))
}
