//! Pure-Rust WGS84 ↔ UTM reprojection (Snyder 1987, USGS formulas).
//!
//! Covers EPSG 326xx (UTM North) and 327xx (UTM South), which is what
//! Landsat Collection 2 ships in, plus identity for EPSG:4326.

use uhimon_core::bbox::BoundingBox;
use uhimon_core::crs::{UtmZone, CRS};

use crate::error::{CloudError, Result};
use crate::tile_index::MapRect;

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const K0: f64 = 0.9996; // UTM scale factor
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Points sampled along each edge when reprojecting an extent.
const EDGE_SAMPLES: usize = 16;

// ── Public API ───────────────────────────────────────────────────────────

/// Transform between WGS84 and one supported CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// EPSG:4326 itself
    Identity,
    /// WGS84 / UTM
    Utm(UtmZone),
}

impl Projection {
    pub fn for_crs(crs: &CRS) -> Result<Self> {
        if crs.is_wgs84() {
            return Ok(Projection::Identity);
        }
        crs.utm_zone()
            .map(Projection::Utm)
            .ok_or_else(|| CloudError::UnsupportedCrs(crs.identifier()))
    }

    /// WGS84 (lon, lat) to map (x, y)
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::Identity => (lon, lat),
            Projection::Utm(zone) => wgs84_to_utm(lon, lat, *zone),
        }
    }

    /// Map (x, y) to WGS84 (lon, lat)
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::Identity => (x, y),
            Projection::Utm(zone) => utm_to_wgs84(x, y, *zone),
        }
    }
}

/// Envelope of a WGS84 box in `crs`.
///
/// Every edge is densified: UTM lines of constant latitude are curved, so
/// transforming only the corners can clip the box.
pub fn bbox_to_crs(bbox: &BoundingBox, crs: &CRS) -> Result<MapRect> {
    let projection = Projection::for_crs(crs)?;
    let points = edge_points(bbox.min_lon(), bbox.min_lat(), bbox.max_lon(), bbox.max_lat());
    Ok(MapRect::enclosing(
        points.into_iter().map(|(lon, lat)| projection.forward(lon, lat)),
    ))
}

/// WGS84 envelope of a rectangle given in `crs`.
pub fn rect_to_wgs84(rect: &MapRect, crs: &CRS) -> Result<BoundingBox> {
    let projection = Projection::for_crs(crs)?;
    let points = edge_points(rect.min_x, rect.min_y, rect.max_x, rect.max_y);
    let r = MapRect::enclosing(points.into_iter().map(|(x, y)| projection.inverse(x, y)));
    Ok(BoundingBox::new(r.min_x, r.min_y, r.max_x, r.max_y)?)
}

fn edge_points(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<(f64, f64)> {
    (0..=EDGE_SAMPLES)
        .flat_map(|i| {
            let t = i as f64 / EDGE_SAMPLES as f64;
            let x = x0 + (x1 - x0) * t;
            let y = y0 + (y1 - y0) * t;
            [(x, y0), (x, y1), (x0, y), (x1, y)]
        })
        .collect()
}

fn central_meridian(zone: UtmZone) -> f64 {
    ((zone.zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

// ── Core projection (Snyder 1987, USGS Prof. Paper 1395, pp. 61-64) ─────

/// Convert WGS84 (longitude, latitude) in degrees to UTM (easting, northing)
/// in metres.
pub fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: UtmZone) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = central_meridian(zone);

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);

    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    // Snyder eq. 8-9
    let easting = K0
        * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0)
        + FALSE_EASTING;

    // Snyder eq. 8-10
    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    let northing = if zone.north {
        northing
    } else {
        northing + FALSE_NORTHING_SOUTH
    };

    (easting, northing)
}

/// Convert UTM (easting, northing) in metres to WGS84 (longitude, latitude)
/// in degrees. Snyder eqs. 8-11 to 8-25.
pub fn utm_to_wgs84(easting: f64, northing: f64, zone: UtmZone) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if zone.north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };

    let e4 = E2 * E2;
    let e6 = e4 * E2;
    let sqrt_1_e2 = (1.0 - E2).sqrt();
    let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);

    // footpoint latitude
    let m = y / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = E_PRIME2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let denom = 1.0 - E2 * sin_phi1 * sin_phi1;
    let n1 = A / denom.sqrt();
    let r1 = A * (1.0 - E2) / denom.powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * E_PRIME2 - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let lon = central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1) * d5
                / 120.0)
            / cos_phi1;

    (lon.to_degrees(), lat.to_degrees())
}

/// Meridional arc from equator to latitude `lat` (radians). Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;

    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

// ── Tests ────────────────────────────────────────────────────────────────
