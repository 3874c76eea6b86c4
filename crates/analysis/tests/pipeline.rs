//! End-to-end pipeline runs against in-memory catalog and loader fakes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use uhimon_analysis::{
    analyze, search, AnalysisConfig, AnalysisContext, AnalysisError, AnalysisRequest, Band,
    BandGrids, BandLoader, CacheConfig, DateRange, GridKind, SceneCandidate, SceneCatalog,
};
use uhimon_cloud::TargetGrid;
use uhimon_core::{BoundingBox, Raster};

fn bbox() -> BoundingBox {
    BoundingBox::new(-3.70, 40.40, -3.68, 40.42).unwrap()
}

fn request() -> AnalysisRequest {
    AnalysisRequest::new(
        bbox(),
        DateRange::parse("2024-06-01", "2024-08-31").unwrap(),
        15.0,
    )
    .unwrap()
}

fn scene(id: &str, cloud: f64, day: u32) -> SceneCandidate {
    SceneCandidate {
        id: id.into(),
        acquired: Utc.with_ymd_and_hms(2024, 7, day, 10, 57, 31).unwrap(),
        cloud_cover: cloud,
        collection: "landsat-c2-l2".into(),
        platform: Some("landsat-9".into()),
        epsg: Some(32630),
        assets: BTreeMap::new(),
    }
}

enum CatalogBehavior {
    Scenes(Vec<SceneCandidate>),
    Unavailable,
    Hang,
}

struct FakeCatalog {
    behavior: CatalogBehavior,
}

#[async_trait]
impl SceneCatalog for FakeCatalog {
    async fn find_candidates(
        &self,
        _bbox: &BoundingBox,
        _dates: &DateRange,
        max_cloud_cover: f64,
    ) -> uhimon_analysis::Result<Vec<SceneCandidate>> {
        match &self.behavior {
            CatalogBehavior::Scenes(scenes) => Ok(scenes
                .iter()
                .filter(|s| s.cloud_cover <= max_cloud_cover)
                .cloned()
                .collect()),
            CatalogBehavior::Unavailable => {
                Err(AnalysisError::CatalogUnavailable("HTTP 503".into()))
            }
            CatalogBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Serves fixed 2x2 DN grids on the request grid and records what it loaded.
struct FakeLoader {
    thermal: Vec<u16>,
    nir: Vec<u16>,
    red: Vec<u16>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_scene: std::sync::Mutex<Option<String>>,
}

impl FakeLoader {
    fn new(thermal: Vec<u16>, nir: Vec<u16>, red: Vec<u16>) -> Self {
        Self {
            thermal,
            nir,
            red,
            delay: None,
            calls: AtomicUsize::new(0),
            last_scene: std::sync::Mutex::new(None),
        }
    }

    fn standard() -> Self {
        Self::new(
            vec![15000, 15000, 0, 15000],
            vec![20000, 21000, 0, 22000],
            vec![10000, 10000, 0, 10000],
        )
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BandLoader for FakeLoader {
    async fn load_bands(
        &self,
        scene: &SceneCandidate,
        bbox: &BoundingBox,
        bands: &[Band],
    ) -> uhimon_analysis::Result<BandGrids> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_scene.lock().unwrap() = Some(scene.id.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let target = TargetGrid::for_bbox(*bbox, bbox.width() / 2.0, 2).unwrap();
        let grid = |data: &Vec<u16>| {
            Raster::from_vec(data.clone(), 2, 2)
                .unwrap()
                .with_transform(*target.transform())
                .with_crs(target.crs())
                .with_nodata(0)
        };
        BandGrids::new(
            bands
                .iter()
                .map(|&band| {
                    let data = match band {
                        Band::Thermal => &self.thermal,
                        Band::Nir => &self.nir,
                        Band::Red => &self.red,
                    };
                    (band, grid(data))
                })
                .collect(),
        )
    }
}

fn context(
    config: AnalysisConfig,
    behavior: CatalogBehavior,
    loader: Arc<FakeLoader>,
) -> AnalysisContext {
    AnalysisContext::new(config, Arc::new(FakeCatalog { behavior }), loader)
}

fn three_scenes() -> CatalogBehavior {
    CatalogBehavior::Scenes(vec![
        scene("LC08_CLOUDY", 12.0, 3),
        scene("LC09_CLEAR", 0.42, 12),
        scene("LC08_HAZY", 4.0, 20),
        scene("LC09_OVERCAST", 80.0, 28),
    ])
}

#[tokio::test]
async fn test_analyze_selects_clearest_scene_and_reports_grids() {
    let loader = Arc::new(FakeLoader::standard());
    let ctx = context(AnalysisConfig::default(), three_scenes(), Arc::clone(&loader));

    let result = analyze(&ctx, &request()).await.unwrap();

    assert_eq!(result.scene.id, "LC09_CLEAR");
    assert_eq!(result.scene.date.to_string(), "2024-07-12");
    assert_eq!(loader.last_scene.lock().unwrap().as_deref(), Some("LC09_CLEAR"));

    let expected_lst = 15000.0 * 0.00341802 + 149.0 - 273.15;
    assert_eq!(result.lst.statistics.valid_count, 3);
    assert_relative_eq!(result.lst.statistics.mean, expected_lst, epsilon = 1e-9);
    assert_relative_eq!(result.uhi_magnitude, 0.0);
    assert_eq!(result.correlation, None);

    assert_eq!(result.ndvi.statistics.valid_count, 3);
    assert!(result.ndvi.statistics.min > 0.0 && result.ndvi.statistics.max < 1.0);

    assert_eq!(result.lst.shape, [2, 2]);
    assert!(result.lst.png.starts_with(b"\x89PNG"));
    assert!(result.ndvi.png.starts_with(b"\x89PNG"));
    assert!(result.lst.bounds.approx_eq(&bbox(), 1e-12));
    assert_eq!(
        result.lst.leaflet_bounds,
        [
            [result.lst.bounds.min_lat(), result.lst.bounds.min_lon()],
            [result.lst.bounds.max_lat(), result.lst.bounds.max_lon()]
        ]
    );
    assert!(result.uhi_note.contains("max - min"));
}

#[tokio::test]
async fn test_search_ranks_candidates_under_the_ceiling() {
    let loader = Arc::new(FakeLoader::standard());
    let ctx = context(AnalysisConfig::default(), three_scenes(), Arc::clone(&loader));

    let ranked = search(&ctx, &request()).await.unwrap();
    let ids: Vec<_> = ranked.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["LC09_CLEAR", "LC08_HAZY", "LC08_CLOUDY"]);
    assert_eq!(loader.calls(), 0);
}

#[tokio::test]
async fn test_empty_search_is_no_suitable_scene() {
    let loader = Arc::new(FakeLoader::standard());
    let ctx = context(
        AnalysisConfig::default(),
        CatalogBehavior::Scenes(vec![scene("LC09_OVERCAST", 80.0, 28)]),
        Arc::clone(&loader),
    );

    let err = analyze(&ctx, &request()).await.unwrap_err();
    assert!(matches!(err, AnalysisError::NoSuitableScene));
    assert!(!err.is_retryable());
    assert_eq!(loader.calls(), 0);
}

#[tokio::test]
async fn test_catalog_failure_is_surfaced_once() {
    let loader = Arc::new(FakeLoader::standard());
    let ctx = context(AnalysisConfig::default(), CatalogBehavior::Unavailable, loader);

    let err = analyze(&ctx, &request()).await.unwrap_err();
    assert!(matches!(err, AnalysisError::CatalogUnavailable(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_sparse_scene_fails_with_insufficient_data() {
    let loader = Arc::new(FakeLoader::new(
        vec![15000, 0, 0, 0],
        vec![20000, 20000, 20000, 20000],
        vec![10000, 10000, 10000, 10000],
    ));
    let ctx = context(AnalysisConfig::default(), three_scenes(), loader);

    let err = analyze(&ctx, &request()).await.unwrap_err();
    match err {
        AnalysisError::InsufficientValidData {
            grid,
            valid,
            required,
        } => {
            assert_eq!(grid, GridKind::Lst);
            assert_eq!(valid, 1);
            assert_eq!(required, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_hung_catalog_hits_the_deadline() {
    let config = AnalysisConfig {
        deadline: Duration::from_secs(5),
        ..AnalysisConfig::default()
    };
    let ctx = context(config, CatalogBehavior::Hang, Arc::new(FakeLoader::standard()));

    let err = analyze(&ctx, &request()).await.unwrap_err();
    assert!(matches!(err, AnalysisError::CatalogUnavailable(ref m) if m.contains("deadline")));
}

#[tokio::test(start_paused = true)]
async fn test_slow_bands_hit_the_deadline() {
    let config = AnalysisConfig {
        deadline: Duration::from_secs(5),
        ..AnalysisConfig::default()
    };
    let mut loader = FakeLoader::standard();
    loader.delay = Some(Duration::from_secs(60));
    let ctx = context(config, three_scenes(), Arc::new(loader));

    let err = analyze(&ctx, &request()).await.unwrap_err();
    match err {
        AnalysisError::FetchTimeout { scene, band } => {
            assert_eq!(scene, "LC09_CLEAR");
            assert_eq!(band, "red,nir08,lwir11");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_repeated_request_is_served_from_cache() {
    let config = AnalysisConfig {
        cache: Some(CacheConfig {
            ttl: Duration::from_secs(600),
            capacity: 4,
        }),
        ..AnalysisConfig::default()
    };
    let loader = Arc::new(FakeLoader::standard());
    let ctx = context(config, three_scenes(), Arc::clone(&loader));

    let first = analyze(&ctx, &request()).await.unwrap();
    let second = analyze(&ctx, &request()).await.unwrap();
    assert_eq!(loader.calls(), 1);
    assert!(Arc::ptr_eq(&first, &second));

    let other = AnalysisRequest::new(
        bbox(),
        DateRange::parse("2024-06-01", "2024-08-31").unwrap(),
        20.0,
    )
    .unwrap();
    analyze(&ctx, &other).await.unwrap();
    assert_eq!(loader.calls(), 2);
}

#[tokio::test]
async fn test_expired_cache_entries_are_recomputed() {
    let config = AnalysisConfig {
        cache: Some(CacheConfig {
            ttl: Duration::from_millis(1),
            capacity: 4,
        }),
        ..AnalysisConfig::default()
    };
    let loader = Arc::new(FakeLoader::standard());
    let ctx = context(config, three_scenes(), Arc::clone(&loader));

    analyze(&ctx, &request()).await.unwrap();
    std::thread::sleep(Duration::from_millis(10));
    analyze(&ctx, &request()).await.unwrap();
    assert_eq!(loader.calls(), 2);
}

#[tokio::test]
async fn test_without_cache_every_request_loads() {
    let loader = Arc::new(FakeLoader::standard());
    let ctx = context(AnalysisConfig::default(), three_scenes(), Arc::clone(&loader));

    analyze(&ctx, &request()).await.unwrap();
    analyze(&ctx, &request()).await.unwrap();
    assert_eq!(loader.calls(), 2);
    assert!(ctx.cache().is_none());
}
