//! Coordinate Reference System handling
//!
//! Scenes arrive in UTM (EPSG:326xx / 327xx) and every analysis grid is
//! geographic WGS84, so an EPSG code is the only identity uhimon needs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System identified by its EPSG code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CRS {
    epsg: u32,
}

/// UTM zone description derived from an EPSG code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmZone {
    /// Zone number, 1..=60
    pub zone: u8,
    /// Northern hemisphere (EPSG 326xx) or southern (327xx)
    pub north: bool,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: code }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Get the EPSG code
    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Whether this is geographic WGS84
    pub fn is_wgs84(&self) -> bool {
        self.epsg == 4326
    }

    /// UTM zone for WGS84 / UTM codes, `None` for anything else
    pub fn utm_zone(&self) -> Option<UtmZone> {
        let (north, zone) = match self.epsg {
            32601..=32660 => (true, self.epsg - 32600),
            32701..=32760 => (false, self.epsg - 32700),
            _ => return None,
        };
        Some(UtmZone {
            zone: zone as u8,
            north,
        })
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        self.epsg == other.epsg
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}
