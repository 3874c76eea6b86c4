//! `StacSceneCatalog` against an in-process STAC endpoint.

#[path = "../../cloud/tests/support/mod.rs"]
mod support;

use std::sync::Arc;
use std::time::Duration;

use uhimon_analysis::{AnalysisError, DateRange, SceneCatalog, StacSceneCatalog};
use uhimon_cloud::{StacCatalog, StacClient, StacClientOptions};
use uhimon_core::BoundingBox;

fn madrid() -> BoundingBox {
    BoundingBox::new(-3.75, 40.38, -3.65, 40.45).unwrap()
}

fn summer() -> DateRange {
    DateRange::parse("2024-06-01", "2024-08-31").unwrap()
}

fn catalog(base: &str, request_timeout: Duration) -> StacSceneCatalog {
    let options = StacClientOptions {
        request_timeout,
        ..StacClientOptions::default()
    };
    let client = StacClient::new(StacCatalog::Custom(base.to_string()), options).unwrap();
    StacSceneCatalog::new(Arc::new(client), "landsat-c2-l2")
}

fn feature(id: &str, properties: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "type": "Feature",
        "id": id,
        "collection": "landsat-c2-l2",
        "properties": properties,
        "assets": {
            "red": {"href": format!("https://example.com/{id}_SR_B4.TIF")},
            "nir08": {"href": format!("https://example.com/{id}_SR_B5.TIF")},
            "lwir11": {"href": format!("https://example.com/{id}_ST_B10.TIF")}
        }
    })
}

#[tokio::test]
async fn test_catalog_filters_ceiling_and_skips_malformed_records() {
    let base = support::spawn(|req| {
        let body = req.json();
        assert_eq!(body["collections"], serde_json::json!(["landsat-c2-l2"]));
        assert_eq!(body["query"]["eo:cloud_cover"]["lte"], 15.0);
        // this endpoint ignores the query extension
        support::Reply::json(serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                feature("LC09_CLEAR", serde_json::json!({
                    "datetime": "2024-07-12T10:57:31.123456Z",
                    "eo:cloud_cover": 0.42,
                    "platform": "landsat-9",
                    "proj:epsg": 32630
                })),
                feature("LC08_CLOUDY", serde_json::json!({
                    "datetime": "2024-07-04T10:57:31Z",
                    "eo:cloud_cover": 63.0
                })),
                feature("LC09_NO_CLOUD", serde_json::json!({
                    "datetime": "2024-07-20T10:57:31Z"
                })),
                feature("LC09_NO_DATE", serde_json::json!({
                    "eo:cloud_cover": 1.0
                })),
                feature("LC09_BAD_DATE", serde_json::json!({
                    "datetime": "last tuesday",
                    "eo:cloud_cover": 2.0
                })),
                feature("LC08_AT_CEILING", serde_json::json!({
                    "datetime": "2024-08-31T23:59:59.5Z",
                    "eo:cloud_cover": 15.0
                }))
            ],
            "links": []
        }))
    })
    .await;

    let scenes = catalog(&base, Duration::from_secs(10))
        .find_candidates(&madrid(), &summer(), 15.0)
        .await
        .unwrap();

    let ids: Vec<&str> = scenes.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["LC09_CLEAR", "LC08_AT_CEILING"]);

    let clear = &scenes[0];
    assert_eq!(clear.epsg, Some(32630));
    assert_eq!(clear.platform.as_deref(), Some("landsat-9"));
    assert_eq!(clear.collection, "landsat-c2-l2");
    assert!(clear.asset_href("lwir11").unwrap().ends_with("_ST_B10.TIF"));
}

#[tokio::test]
async fn test_empty_result_is_not_an_error() {
    let base = support::spawn(|_req| {
        support::Reply::json(serde_json::json!({
            "type": "FeatureCollection",
            "features": [],
            "links": []
        }))
    })
    .await;

    let scenes = catalog(&base, Duration::from_secs(10))
        .find_candidates(&madrid(), &summer(), 15.0)
        .await
        .unwrap();
    assert!(scenes.is_empty());
}

#[tokio::test]
async fn test_server_error_is_catalog_unavailable() {
    let base = support::spawn(|_req| support::Reply::status(503)).await;

    let err = catalog(&base, Duration::from_secs(10))
        .find_candidates(&madrid(), &summer(), 15.0)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(
        matches!(err, AnalysisError::CatalogUnavailable(ref m) if m.contains("503")),
        "{err}"
    );
}

#[tokio::test]
async fn test_unreachable_catalog_is_catalog_unavailable() {
    // nothing listens on the discard port
    let err = catalog("http://127.0.0.1:9", Duration::from_secs(10))
        .find_candidates(&madrid(), &summer(), 15.0)
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::CatalogUnavailable(_)), "{err}");
}

#[tokio::test]
async fn test_malformed_response_is_catalog_unavailable() {
    let base = support::spawn(|_req| support::Reply::json(serde_json::json!({"oops": true}))).await;

    let err = catalog(&base, Duration::from_secs(10))
        .find_candidates(&madrid(), &summer(), 15.0)
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::CatalogUnavailable(_)), "{err}");
}
