//! WGS84 bounding boxes
//!
//! A [`BoundingBox`] is both the request extent handed to the pipeline and
//! the overlay extent reported for rendered images.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kilometres per degree of latitude (and of longitude at the equator).
const KM_PER_DEGREE: f64 = 111.0;

/// Axis-aligned extent in WGS84 degrees.
///
/// Invariant: every coordinate is finite, longitudes lie in [-180, 180],
/// latitudes in [-90, 90], and min < max on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl BoundingBox {
    /// Validated constructor taking (west, south, east, north).
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidBoundingBox {
            min_x: min_lon,
            min_y: min_lat,
            max_x: max_lon,
            max_y: max_lat,
            reason: reason.to_string(),
        };

        if ![min_lon, min_lat, max_lon, max_lat].iter().all(|v| v.is_finite()) {
            return Err(invalid("coordinates must be finite"));
        }
        if !(-180.0..=180.0).contains(&min_lon) || !(-180.0..=180.0).contains(&max_lon) {
            return Err(invalid("longitude outside [-180, 180]"));
        }
        if !(-90.0..=90.0).contains(&min_lat) || !(-90.0..=90.0).contains(&max_lat) {
            return Err(invalid("latitude outside [-90, 90]"));
        }
        if min_lon >= max_lon {
            return Err(invalid("min longitude must be below max longitude"));
        }
        if min_lat >= max_lat {
            return Err(invalid("min latitude must be below max latitude"));
        }

        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Box of `buffer_km` around a point, clamped to the valid WGS84 range.
    ///
    /// Uses 111 km per degree of latitude and `111 * cos(lat)` km per degree
    /// of longitude.
    pub fn around(lat: f64, lon: f64, buffer_km: f64) -> Result<Self> {
        if !buffer_km.is_finite() || buffer_km <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "buffer_km",
                value: buffer_km.to_string(),
                reason: "must be a positive number of kilometres".into(),
            });
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::InvalidParameter {
                name: "center",
                value: format!("{lat},{lon}"),
                reason: "latitude must be in [-90, 90] and longitude in [-180, 180]".into(),
            });
        }

        let lat_buffer = buffer_km / KM_PER_DEGREE;
        let cos_lat = lat.to_radians().cos().max(1e-6);
        let lon_buffer = (buffer_km / (KM_PER_DEGREE * cos_lat)).min(180.0);

        Self::new(
            (lon - lon_buffer).max(-180.0),
            (lat - lat_buffer).max(-90.0),
            (lon + lon_buffer).min(180.0),
            (lat + lat_buffer).min(90.0),
        )
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    /// Extent in degrees of longitude
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Extent in degrees of latitude
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// (lat, lon) of the box centre
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// [west, south, east, north], the order STAC `bbox` uses
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// `[[south, west], [north, east]]`, the corner order web map overlays expect
    pub fn to_leaflet(&self) -> [[f64; 2]; 2] {
        [[self.min_lat, self.min_lon], [self.max_lat, self.max_lon]]
    }

    /// Coordinates scaled by 10^decimals and rounded, usable as a hash key
    pub fn rounded(&self, decimals: u32) -> [i64; 4] {
        let scale = 10f64.powi(decimals as i32);
        self.to_array().map(|v| (v * scale).round() as i64)
    }

    /// Whether both boxes describe the same extent within `tolerance` degrees
    pub fn approx_eq(&self, other: &BoundingBox, tolerance: f64) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon < other.max_lon
            && self.max_lon > other.min_lon
            && self.min_lat < other.max_lat
            && self.max_lat > other.min_lat
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = Error;

    fn try_from(v: [f64; 4]) -> Result<Self> {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        b.to_array()
    }
}

impl FromStr for BoundingBox {
    type Err = Error;

    /// Parses `west,south,east,north`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::InvalidParameter {
                name: "bbox",
                value: s.to_string(),
                reason: e.to_string(),
            })?;

        match parts.as_slice() {
            [w, s, e, n] => Self::new(*w, *s, *e, *n),
            _ => Err(Error::InvalidParameter {
                name: "bbox",
                value: s.to_string(),
                reason: "expected west,south,east,north".into(),
            }),
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6},{:.6},{:.6},{:.6}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}
