//! # uhimon-cloud
//!
//! Remote data access for the analysis pipeline: STAC Item Search, Planetary
//! Computer asset signing, and Cloud Optimized GeoTIFF (COG) reading with
//! HTTP Range requests.
//!
//! A COG read fetches only the tiles under the requested rectangle, caches
//! decoded tiles in an LRU, and can be resampled onto a common WGS84 grid via
//! [`warp::warp_nearest`].
//!
//! ## Features
//!
//! - `deflate` (default): DEFLATE decompression via `flate2`
//! - `lzw` (default): LZW decompression via `weezl`

pub mod cache;
pub mod cog_reader;
pub mod decompress;
pub mod error;
pub mod geotiff_keys;
pub mod http;
pub mod ifd;
pub mod reproject;
pub mod stac_client;
pub mod stac_models;
pub mod tile_index;
pub mod warp;

pub use cog_reader::{CogMetadata, CogReader, CogReaderOptions};
pub use error::{CloudError, Result};
pub use http::HttpClient;
pub use stac_client::{StacCatalog, StacClient, StacClientOptions};
pub use stac_models::{StacAsset, StacItem, StacItemCollection, StacSearchParams};
pub use tile_index::MapRect;
pub use warp::{warp_nearest, TargetGrid};
