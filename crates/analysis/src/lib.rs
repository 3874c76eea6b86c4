//! # uhimon analysis
//!
//! The LST/NDVI pipeline: find Landsat scenes for a region and period, pick
//! the clearest, load its thermal, NIR and red bands onto one WGS84 grid,
//! derive land surface temperature and NDVI, and report statistics, their
//! correlation and a UHI magnitude alongside color-mapped PNG overlays.
//!
//! ```no_run
//! use uhimon_analysis::{analyze, AnalysisConfig, AnalysisContext, AnalysisRequest, DateRange};
//! use uhimon_core::BoundingBox;
//!
//! # async fn run() -> uhimon_analysis::Result<()> {
//! let ctx = AnalysisContext::from_config(AnalysisConfig::from_env()?)?;
//! let request = AnalysisRequest::new(
//!     BoundingBox::around(40.4168, -3.7038, 5.0)?,
//!     DateRange::parse("2024-06-01", "2024-08-31")?,
//!     15.0,
//! )?;
//! let result = analyze(&ctx, &request).await?;
//! println!("{} UHI {:.1} °C", result.scene.id, result.uhi_magnitude);
//! # Ok(())
//! # }
//! ```
//!
//! Catalog access and band loading sit behind the [`SceneCatalog`] and
//! [`BandLoader`] traits so the pipeline runs against in-memory fakes.

pub mod cache;
pub mod catalog;
pub mod context;
pub mod engine;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod render;
pub mod request;
pub mod result;
pub mod scene;
pub mod selector;

pub use cache::{CacheKey, ResultCache};
pub use catalog::{SceneCatalog, StacSceneCatalog};
pub use context::{AnalysisConfig, AnalysisContext, CacheConfig};
pub use engine::{process, ProcessedGrids, ProcessingOptions};
pub use error::{AnalysisError, Result};
pub use loader::{BandGrids, BandLoader, CogBandLoader, LoaderOptions};
pub use pipeline::{analyze, search};
pub use render::{render_grid, wgs84_bounds, GridKind, RenderedGrid};
pub use request::{AnalysisRequest, DateRange};
pub use result::{AnalysisResult, GridOutput, SceneSummary, UHI_NOTE};
pub use scene::{Band, BandKeys, SceneCandidate};
pub use selector::{rank_candidates, select_best};
pub use uhimon_algorithms::statistics::Statistics;
