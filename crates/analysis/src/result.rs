//! The analysis result record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uhimon_algorithms::statistics::Statistics;
use uhimon_core::BoundingBox;

use crate::render::RenderedGrid;
use crate::scene::SceneCandidate;

/// How the UHI magnitude is derived; reported alongside the value.
pub const UHI_NOTE: &str =
    "UHI magnitude is the range (max - min) of valid land surface temperatures in the scene, \
     not an urban-minus-rural differential";

/// Metadata of the scene an analysis used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSummary {
    pub id: String,
    pub acquired: DateTime<Utc>,
    pub date: NaiveDate,
    pub cloud_cover: f64,
    pub collection: String,
    pub platform: Option<String>,
}

impl From<&SceneCandidate> for SceneSummary {
    fn from(scene: &SceneCandidate) -> Self {
        Self {
            id: scene.id.clone(),
            acquired: scene.acquired,
            date: scene.acquired.date_naive(),
            cloud_cover: scene.cloud_cover,
            collection: scene.collection.clone(),
            platform: scene.platform.clone(),
        }
    }
}

/// One rendered grid with its extent and statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridOutput {
    /// RGBA PNG; invalid cells are transparent.
    #[serde(skip)]
    pub png: Vec<u8>,
    /// `[west, south, east, north]`
    pub bounds: BoundingBox,
    /// `[[south, west], [north, east]]`
    pub leaflet_bounds: [[f64; 2]; 2],
    /// `[rows, cols]`
    pub shape: [usize; 2],
    pub statistics: Statistics,
}

impl GridOutput {
    pub fn new(rendered: RenderedGrid, shape: (usize, usize), statistics: Statistics) -> Self {
        Self {
            leaflet_bounds: rendered.bounds.to_leaflet(),
            bounds: rendered.bounds,
            png: rendered.png,
            shape: [shape.0, shape.1],
            statistics,
        }
    }
}

/// Everything an analysis reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub scene: SceneSummary,
    /// Requested extent.
    pub bbox: BoundingBox,
    pub lst: GridOutput,
    pub ndvi: GridOutput,
    /// Pearson r between LST and NDVI, `null` when undefined.
    pub correlation: Option<f64>,
    /// °C
    pub uhi_magnitude: f64,
    pub uhi_note: &'static str,
}
