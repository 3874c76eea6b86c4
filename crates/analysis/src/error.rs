//! Error taxonomy of the analysis pipeline.

use thiserror::Error;
use uhimon_cloud::CloudError;

use crate::render::GridKind;

/// Every failure the pipeline can surface to its caller.
///
/// Nothing is retried internally; [`AnalysisError::is_retryable`] tells the
/// caller whether trying again (possibly with other parameters) may help.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("scene catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("no suitable scene found; widen the date range or raise the cloud-cover ceiling")]
    NoSuitableScene,

    #[error("band '{band}' of scene {scene} unavailable: {reason}")]
    BandUnavailable {
        scene: String,
        band: String,
        reason: String,
    },

    #[error("timed out fetching band '{band}' of scene {scene}")]
    FetchTimeout { scene: String, band: String },

    #[error("{grid} grid has {valid} valid cells, need at least {required}; try another region or date")]
    InsufficientValidData {
        grid: GridKind,
        valid: usize,
        required: usize,
    },

    #[error("processing failed: {0}")]
    Processing(String),

    #[error("rendering failed: {0}")]
    Render(String),
}

impl AnalysisError {
    /// Transient transport failures; the rest need different input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::CatalogUnavailable(_) | AnalysisError::FetchTimeout { .. }
        )
    }

    /// Classify a raster I/O failure for one band of one scene.
    pub(crate) fn from_band(scene: &str, band: &str, err: CloudError) -> Self {
        if err.is_timeout() {
            AnalysisError::FetchTimeout {
                scene: scene.to_string(),
                band: band.to_string(),
            }
        } else {
            AnalysisError::BandUnavailable {
                scene: scene.to_string(),
                band: band.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

impl From<uhimon_core::Error> for AnalysisError {
    fn from(err: uhimon_core::Error) -> Self {
        match err {
            uhimon_core::Error::InvalidBoundingBox { .. }
            | uhimon_core::Error::InvalidParameter { .. } => {
                AnalysisError::InvalidInput(err.to_string())
            }
            other => AnalysisError::Processing(other.to_string()),
        }
    }
}

/// Result alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;
