//! Core COG reader: open a remote COG and read the pixels under a rectangle.

use std::collections::HashMap;
use std::time::Duration;

use ndarray::Array2;
use tracing::debug;
use uhimon_core::crs::CRS;
use uhimon_core::raster::{GeoTransform, Raster, RasterElement};

use crate::cache::{TileBytes, TileCache};
use crate::decompress::{self, predictor};
use crate::error::{strip_query, CloudError, Result};
use crate::geotiff_keys::GeoTiffMeta;
use crate::http::HttpClient;
use crate::ifd::{self, Endian, IfdInfo, ResolvedTags, TagEntry};
use crate::tile_index::{self, MapRect, TileGrid};

/// Bytes fetched up front; enough for the header, first IFD and GeoTIFF tags
/// of a typical COG.
const INITIAL_FETCH: u64 = 64 * 1024;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Options for configuring a [`CogReader`].
#[derive(Debug, Clone)]
pub struct CogReaderOptions {
    /// Maximum number of concurrent tile fetches (default: 8).
    pub max_concurrent_fetches: usize,
    /// Number of decoded tiles to keep in the LRU cache (default: 128).
    pub cache_capacity: usize,
    /// Timeout per HTTP request (default: 30 s).
    pub request_timeout: Duration,
}

impl Default for CogReaderOptions {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 8,
            cache_capacity: 128,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Metadata exposed by [`CogReader::metadata`].
#[derive(Debug, Clone)]
pub struct CogMetadata {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub bits_per_sample: u16,
    pub sample_format: u16,
    pub compression: u16,
    pub predictor: u16,
    pub geo_transform: GeoTransform,
    pub crs: Option<CRS>,
    pub nodata: Option<f64>,
}

/// Cloud Optimized GeoTIFF reader over the full-resolution image.
///
/// Reads tiles on demand via HTTP Range requests with LRU caching.
pub struct CogReader {
    url: String,
    client: HttpClient,
    endian: Endian,
    ifd: IfdInfo,
    geo_meta: GeoTiffMeta,
    cache: TileCache,
    options: CogReaderOptions,
}

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

impl CogReader {
    /// Open a remote COG by URL with its own HTTP client.
    pub async fn open(url: &str, options: CogReaderOptions) -> Result<Self> {
        let client = HttpClient::new(options.request_timeout)?;
        Self::open_with_client(url, client, options).await
    }

    /// Open a remote COG reusing an existing HTTP client.
    ///
    /// Fetches the TIFF header, the first IFD and its out-of-line tag values,
    /// slicing from the initial fetch whenever possible.
    pub async fn open_with_client(
        url: &str,
        client: HttpClient,
        options: CogReaderOptions,
    ) -> Result<Self> {
        let head = client.head(url).await?;
        let file_size = head.content_length.unwrap_or(0);
        let first_len = if file_size > 0 {
            INITIAL_FETCH.min(file_size)
        } else {
            INITIAL_FETCH
        };

        let prefix = client.fetch_range(url, 0, first_len).await?;
        let header = ifd::parse_header(&prefix)?;
        let endian = header.endian;
        let source = ByteSource {
            client: &client,
            url,
            prefix: &prefix,
        };

        let count_bytes = source.read(header.first_ifd_offset, 2).await?;
        if count_bytes.len() < 2 {
            return Err(CloudError::NoIfd);
        }
        let entry_count = endian.u16(&count_bytes) as usize;
        let ifd_bytes = source
            .read(header.first_ifd_offset, ifd::ifd_byte_len(entry_count) as u64)
            .await?;
        let raw_ifd = ifd::parse_ifd(endian, &ifd_bytes)?;
        if raw_ifd.entries.is_empty() {
            return Err(CloudError::NoIfd);
        }

        let mut tags = ResolvedTags::new(endian);
        for tag in IfdInfo::LAYOUT_TAGS.into_iter().chain(GeoTiffMeta::GEO_TAGS) {
            if let Some(entry) = raw_ifd.entry(tag) {
                resolve_entry(&source, endian, entry, &mut tags).await?;
            }
        }

        let info = IfdInfo::from_tags(&tags)?;
        let geo_meta = GeoTiffMeta::from_tags(&tags)?;

        debug!(
            url = strip_query(url),
            width = info.width,
            height = info.height,
            tile = info.tile_width,
            compression = info.compression,
            predictor = info.predictor,
            crs = ?geo_meta.crs,
            "opened COG"
        );

        let cache = TileCache::new(options.cache_capacity);
        Ok(Self {
            url: url.to_string(),
            client,
            endian,
            ifd: info,
            geo_meta,
            cache,
            options,
        })
    }

    /// Return metadata about the COG.
    pub fn metadata(&self) -> CogMetadata {
        CogMetadata {
            width: self.ifd.width,
            height: self.ifd.height,
            tile_width: self.ifd.tile_width,
            tile_height: self.ifd.tile_height,
            bits_per_sample: self.ifd.bits_per_sample,
            sample_format: self.ifd.sample_format,
            compression: self.ifd.compression,
            predictor: self.ifd.predictor,
            geo_transform: self.geo_meta.geo_transform,
            crs: self.geo_meta.crs,
            nodata: self.geo_meta.nodata,
        }
    }

    /// Read the pixels under `rect` (in the COG's own CRS) into a `Raster<T>`.
    ///
    /// The raster covers the clamped pixel window; cells in sparse tiles get
    /// the file's no-data value, or `T::default_nodata()` without one.
    pub async fn read_rect<T: RasterElement>(&mut self, rect: &MapRect) -> Result<Raster<T>> {
        let gt = self.geo_meta.geo_transform;
        let grid = TileGrid {
            image_width: self.ifd.width as usize,
            image_height: self.ifd.height as usize,
            tile_width: self.ifd.tile_width as usize,
            tile_height: self.ifd.tile_height as usize,
        };

        let window = tile_index::window_for_rect(rect, &gt, grid.image_width, grid.image_height)
            .ok_or(CloudError::BBoxOutside)?;
        let tiles = tile_index::tiles_for_window(&window, &grid);

        let decoded = self.fetch_tiles(tiles.iter().map(|t| t.tile_idx)).await?;

        let nodata: Option<T> = self.geo_meta.nodata.and_then(num_traits::cast);
        let fill = nodata.unwrap_or_else(T::default_nodata);
        let mut output = Array2::from_elem(window.shape(), fill);

        let (tw, th) = (grid.tile_width, grid.tile_height);
        for tr in &tiles {
            let Some(bytes) = decoded.get(&tr.tile_idx) else {
                continue; // sparse tile
            };
            let samples: Vec<T> = decompress::decode_samples(
                bytes,
                self.ifd.bits_per_sample,
                self.ifd.sample_format,
                self.endian,
            )?;

            let tile_col0 = tr.tile_col * tw;
            let tile_row0 = tr.tile_row * th;
            let rows = window.row0.max(tile_row0)..window.row1.min(tile_row0 + th);
            let cols = window.col0.max(tile_col0)..window.col1.min(tile_col0 + tw);

            for img_row in rows {
                let local_row = img_row - tile_row0;
                for img_col in cols.clone() {
                    let linear = local_row * tw + (img_col - tile_col0);
                    if let Some(&v) = samples.get(linear) {
                        output[(img_row - window.row0, img_col - window.col0)] = v;
                    }
                }
            }
        }

        let (origin_x, origin_y) = gt.pixel_to_geo_corner(window.col0, window.row0);
        let out_gt = GeoTransform {
            origin_x,
            origin_y,
            ..gt
        };

        let mut raster = Raster::from_array(output).with_transform(out_gt);
        raster.set_crs(self.geo_meta.crs);
        raster.set_nodata(nodata);
        Ok(raster)
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// Decoded bytes of every listed tile, from the cache or fetched and
    /// decompressed. Sparse tiles (zero byte count) are absent from the map.
    async fn fetch_tiles(
        &mut self,
        tile_ids: impl Iterator<Item = usize>,
    ) -> Result<HashMap<usize, TileBytes>> {
        let mut decoded = HashMap::new();
        let mut to_fetch: Vec<(usize, u64, u64)> = Vec::new();
        for tile_idx in tile_ids {
            if let Some(bytes) = self.cache.get(tile_idx) {
                decoded.insert(tile_idx, bytes);
                continue;
            }
            let (Some(&offset), Some(&length)) = (
                self.ifd.tile_offsets.get(tile_idx),
                self.ifd.tile_byte_counts.get(tile_idx),
            ) else {
                return Err(CloudError::InvalidTiff {
                    reason: format!(
                        "tile {tile_idx} out of range (have {})",
                        self.ifd.tile_offsets.len()
                    ),
                });
            };
            if length > 0 {
                to_fetch.push((tile_idx, offset, length));
            }
        }

        let tile_samples = (self.ifd.tile_width * self.ifd.tile_height) as usize;
        let raw_tile_size = tile_samples * self.ifd.bytes_per_sample();

        for chunk in to_fetch.chunks(self.options.max_concurrent_fetches.max(1)) {
            let ranges: Vec<(u64, u64)> = chunk.iter().map(|&(_, o, l)| (o, l)).collect();
            let fetched = self.client.fetch_ranges(&self.url, &ranges).await?;

            for (&(tile_idx, _, _), compressed) in chunk.iter().zip(fetched) {
                let mut raw =
                    decompress::decompress_tile(&compressed, self.ifd.compression, raw_tile_size)?;
                match self.ifd.predictor {
                    predictor::NONE => {}
                    predictor::HORIZONTAL => decompress::undo_horizontal_predictor(
                        &mut raw,
                        self.ifd.tile_width as usize,
                        self.ifd.bytes_per_sample(),
                        self.endian,
                    )?,
                    other => return Err(CloudError::UnsupportedPredictor(other)),
                }
                let raw = TileBytes::new(raw);
                self.cache.insert(tile_idx, TileBytes::clone(&raw));
                decoded.insert(tile_idx, raw);
            }
            debug!(tiles = chunk.len(), url = strip_query(&self.url), "fetched tiles");
        }

        let (hits, misses) = self.cache.stats();
        debug!(hits, misses, cached = self.cache.len(), "tile cache");
        Ok(decoded)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Byte access that slices the initial fetch or falls back to a Range request.
struct ByteSource<'a> {
    client: &'a HttpClient,
    url: &'a str,
    prefix: &'a [u8],
}

impl ByteSource<'_> {
    async fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        let start = offset as usize;
        let end = start.saturating_add(len as usize);
        if end <= self.prefix.len() {
            Ok(self.prefix[start..end].to_vec())
        } else {
            self.client.fetch_range(self.url, offset, len).await
        }
    }
}

async fn resolve_entry(
    source: &ByteSource<'_>,
    endian: Endian,
    entry: &TagEntry,
    tags: &mut ResolvedTags,
) -> Result<()> {
    if entry.is_inline() {
        tags.insert_inline(entry);
    } else {
        let bytes = source
            .read(entry.value_offset(endian), entry.byte_len())
            .await?;
        tags.insert(entry.clone(), bytes);
    }
    Ok(())
}
