//! Configuration and the explicitly passed analysis context.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use uhimon_algorithms::imagery::NdviParams;
use uhimon_cloud::{CogReaderOptions, StacCatalog, StacClient, StacClientOptions};

use crate::cache::ResultCache;
use crate::catalog::{SceneCatalog, StacSceneCatalog};
use crate::engine::ProcessingOptions;
use crate::error::{AnalysisError, Result};
use crate::loader::{BandLoader, CogBandLoader, LoaderOptions};
use crate::scene::BandKeys;

/// Result-cache sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub capacity: usize,
}

impl CacheConfig {
    pub const DEFAULT_CAPACITY: usize = 32;
}

/// Everything the pipeline can be tuned with.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub catalog: StacCatalog,
    pub collection: String,
    pub subscription_key: Option<String>,
    pub band_keys: BandKeys,
    /// Output pixel size in degrees.
    pub resolution_deg: f64,
    pub max_grid_dim: usize,
    /// Per HTTP request.
    pub request_timeout: Duration,
    /// Whole pipeline, catalog search through processing and rendering.
    pub deadline: Duration,
    pub max_items: usize,
    pub min_valid_cells: usize,
    pub ndvi: NdviParams,
    /// `None` disables result caching.
    pub cache: Option<CacheConfig>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            catalog: StacCatalog::PlanetaryComputer,
            collection: "landsat-c2-l2".into(),
            subscription_key: None,
            band_keys: BandKeys::default(),
            resolution_deg: 0.0003,
            max_grid_dim: 2048,
            request_timeout: Duration::from_secs(30),
            deadline: Duration::from_secs(120),
            max_items: 100,
            min_valid_cells: 3,
            ndvi: NdviParams::default(),
            cache: None,
        }
    }
}

impl AnalysisConfig {
    /// Defaults overlaid with `UHIMON_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with the variables `lookup` returns. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = var("UHIMON_CATALOG") {
            config.catalog = parse("UHIMON_CATALOG", &v)?;
        }
        if let Some(v) = var("UHIMON_COLLECTION") {
            config.collection = v.trim().to_string();
        }
        if let Some(v) = var("UHIMON_PC_SUBSCRIPTION_KEY") {
            config.subscription_key = Some(v.trim().to_string());
        }
        if let Some(v) = var("UHIMON_RESOLUTION_DEG") {
            let res: f64 = parse("UHIMON_RESOLUTION_DEG", &v)?;
            if !res.is_finite() || res <= 0.0 {
                return Err(AnalysisError::InvalidInput(format!(
                    "UHIMON_RESOLUTION_DEG must be positive, got {v}"
                )));
            }
            config.resolution_deg = res;
        }
        if let Some(v) = var("UHIMON_MAX_GRID_DIM") {
            config.max_grid_dim = parse_positive("UHIMON_MAX_GRID_DIM", &v)?;
        }
        if let Some(v) = var("UHIMON_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_positive("UHIMON_REQUEST_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = var("UHIMON_DEADLINE_SECS") {
            config.deadline = Duration::from_secs(parse_positive("UHIMON_DEADLINE_SECS", &v)?);
        }
        if let Some(v) = var("UHIMON_MIN_VALID_CELLS") {
            config.min_valid_cells = parse_positive("UHIMON_MIN_VALID_CELLS", &v)?;
        }
        if let Some(v) = var("UHIMON_CACHE_TTL_SECS") {
            let secs: u64 = parse("UHIMON_CACHE_TTL_SECS", &v)?;
            config.cache = (secs > 0).then(|| CacheConfig {
                ttl: Duration::from_secs(secs),
                capacity: CacheConfig::DEFAULT_CAPACITY,
            });
        }
        Ok(config)
    }

    pub fn stac_options(&self) -> StacClientOptions {
        StacClientOptions {
            request_timeout: self.request_timeout,
            max_items: self.max_items,
            subscription_key: self.subscription_key.clone(),
        }
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            band_keys: self.band_keys.clone(),
            resolution_deg: self.resolution_deg,
            max_grid_dim: self.max_grid_dim,
            cog: CogReaderOptions {
                request_timeout: self.request_timeout,
                ..CogReaderOptions::default()
            },
        }
    }

    pub fn processing_options(&self) -> ProcessingOptions {
        ProcessingOptions {
            min_valid_cells: self.min_valid_cells,
            ndvi: self.ndvi,
        }
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AnalysisError::InvalidInput(format!("{name}='{value}': {e}")))
}

fn parse_positive<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let v: T = parse(name, value)?;
    if v <= T::default() {
        return Err(AnalysisError::InvalidInput(format!("{name} must be positive, got {value}")));
    }
    Ok(v)
}

/// What one analysis runs with: catalog, loader, configuration and the
/// optional result cache.
pub struct AnalysisContext {
    catalog: Arc<dyn SceneCatalog>,
    loader: Arc<dyn BandLoader>,
    config: AnalysisConfig,
    cache: Option<ResultCache>,
}

impl AnalysisContext {
    /// Context over caller-supplied implementations.
    pub fn new(
        config: AnalysisConfig,
        catalog: Arc<dyn SceneCatalog>,
        loader: Arc<dyn BandLoader>,
    ) -> Self {
        let cache = config.cache.map(|c| ResultCache::new(c.capacity, c.ttl));
        Self {
            catalog,
            loader,
            config,
            cache,
        }
    }

    /// Context backed by the configured STAC catalog and COG reads, sharing
    /// one HTTP connection pool.
    pub fn from_config(config: AnalysisConfig) -> Result<Self> {
        let client = StacClient::new(config.catalog.clone(), config.stac_options())
            .map_err(|e| AnalysisError::CatalogUnavailable(e.to_string()))?;
        let client = Arc::new(client);
        let catalog = StacSceneCatalog::new(Arc::clone(&client), config.collection.clone());
        let loader = CogBandLoader::new(client, config.loader_options());
        Ok(Self::new(config, Arc::new(catalog), Arc::new(loader)))
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn catalog(&self) -> &dyn SceneCatalog {
        self.catalog.as_ref()
    }

    pub fn loader(&self) -> &dyn BandLoader {
        self.loader.as_ref()
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = AnalysisConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.catalog, StacCatalog::PlanetaryComputer);
        assert_eq!(config.collection, "landsat-c2-l2");
        assert_eq!(config.resolution_deg, 0.0003);
        assert_eq!(config.max_grid_dim, 2048);
        assert_eq!(config.deadline, Duration::from_secs(120));
        assert_eq!(config.min_valid_cells, 3);
        assert!(config.cache.is_none());
        assert_eq!(config.band_keys.thermal, "lwir11");
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = AnalysisConfig::from_lookup(lookup(&[
            ("UHIMON_CATALOG", "earth-search"),
            ("UHIMON_PC_SUBSCRIPTION_KEY", " abc123 "),
            ("UHIMON_RESOLUTION_DEG", "0.001"),
            ("UHIMON_MAX_GRID_DIM", "512"),
            ("UHIMON_DEADLINE_SECS", "45"),
            ("UHIMON_MIN_VALID_CELLS", "10"),
            ("UHIMON_CACHE_TTL_SECS", "600"),
            ("UHIMON_COLLECTION", ""),
        ]))
        .unwrap();
        assert_eq!(config.catalog, StacCatalog::EarthSearch);
        assert_eq!(config.subscription_key.as_deref(), Some("abc123"));
        assert_eq!(config.resolution_deg, 0.001);
        assert_eq!(config.max_grid_dim, 512);
        assert_eq!(config.deadline, Duration::from_secs(45));
        assert_eq!(config.min_valid_cells, 10);
        assert_eq!(config.cache.map(|c| c.ttl), Some(Duration::from_secs(600)));
        assert_eq!(config.collection, "landsat-c2-l2");

        let opts = config.loader_options();
        assert_eq!(opts.max_grid_dim, 512);
        assert_eq!(config.processing_options().min_valid_cells, 10);
        assert_eq!(config.stac_options().subscription_key.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_malformed_variables_are_rejected() {
        for (name, value) in [
            ("UHIMON_RESOLUTION_DEG", "fine"),
            ("UHIMON_RESOLUTION_DEG", "-0.1"),
            ("UHIMON_MAX_GRID_DIM", "0"),
            ("UHIMON_DEADLINE_SECS", "2m"),
            ("UHIMON_MIN_VALID_CELLS", "-3"),
            ("UHIMON_CACHE_TTL_SECS", "soon"),
        ] {
            let err = AnalysisConfig::from_lookup(lookup(&[(name, value)])).unwrap_err();
            assert!(matches!(err, AnalysisError::InvalidInput(ref m) if m.contains(name)), "{name}={value}");
        }
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let config = AnalysisConfig::from_lookup(lookup(&[("UHIMON_CACHE_TTL_SECS", "0")])).unwrap();
        assert!(config.cache.is_none());
    }
}
