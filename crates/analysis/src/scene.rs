//! Strongly typed scene metadata, parsed from STAC items at the boundary.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uhimon_cloud::StacItem;

/// Spectral bands used by the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Red,
    Nir,
    Thermal,
}

impl Band {
    /// Every band an LST/NDVI analysis needs.
    pub const ALL: [Band; 3] = [Band::Red, Band::Nir, Band::Thermal];

    pub fn name(&self) -> &'static str {
        match self {
            Band::Red => "red",
            Band::Nir => "nir",
            Band::Thermal => "thermal",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Asset keys under which each band is published in the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandKeys {
    pub red: String,
    pub nir: String,
    pub thermal: String,
}

impl Default for BandKeys {
    /// Landsat Collection 2 Level-2 keys.
    fn default() -> Self {
        Self {
            red: "red".into(),
            nir: "nir08".into(),
            thermal: "lwir11".into(),
        }
    }
}

impl BandKeys {
    pub fn key(&self, band: Band) -> &str {
        match band {
            Band::Red => &self.red,
            Band::Nir => &self.nir,
            Band::Thermal => &self.thermal,
        }
    }
}

/// A scene returned by the catalog. Holds asset references, not pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCandidate {
    pub id: String,
    pub acquired: DateTime<Utc>,
    /// Reported cloud cover, percent.
    pub cloud_cover: f64,
    pub collection: String,
    pub platform: Option<String>,
    /// EPSG code of the scene's native grid, when the catalog reports it.
    pub epsg: Option<u32>,
    /// Asset key to href.
    pub assets: BTreeMap<String, String>,
}

impl SceneCandidate {
    pub fn asset_href(&self, key: &str) -> Option<&str> {
        self.assets.get(key).map(String::as_str)
    }
}

impl TryFrom<&StacItem> for SceneCandidate {
    /// Why the item cannot take part in scene selection.
    type Error = String;

    fn try_from(item: &StacItem) -> Result<Self, Self::Error> {
        let raw_datetime = item
            .properties
            .datetime
            .as_deref()
            .ok_or("missing datetime")?;
        let acquired = DateTime::parse_from_rfc3339(raw_datetime)
            .map_err(|e| format!("datetime '{raw_datetime}': {e}"))?
            .with_timezone(&Utc);
        let cloud_cover = item
            .properties
            .eo_cloud_cover
            .filter(|c| c.is_finite())
            .ok_or("missing eo:cloud_cover")?;

        Ok(Self {
            id: item.id.clone(),
            acquired,
            cloud_cover,
            collection: item.collection.clone().unwrap_or_default(),
            platform: item.properties.platform.clone(),
            epsg: item.epsg(),
            assets: item
                .assets
                .iter()
                .map(|(k, a)| (k.clone(), a.href.clone()))
                .collect(),
        })
    }
}
