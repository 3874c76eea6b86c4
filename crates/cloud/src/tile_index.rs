//! Tile grid math for COG files.
//!
//! Maps a rectangle in the image's own CRS to a pixel window and to the
//! tiles that window touches.

use uhimon_core::raster::GeoTransform;

/// Axis-aligned rectangle in a raster's native map coordinates (metres for UTM).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl MapRect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Smallest rectangle containing all `points`.
    pub fn enclosing(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        points.into_iter().fold(
            Self::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |r, (x, y)| Self::new(r.min_x.min(x), r.min_y.min(y), r.max_x.max(x), r.max_y.max(y)),
        )
    }

    /// Grow by `margin` on every side.
    pub fn expand(&self, margin: f64) -> Self {
        Self::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    pub fn intersects(&self, other: &MapRect) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }
}

/// Half-open pixel window `[col0, col1) x [row0, row1)` of the full image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col0: usize,
    pub row0: usize,
    pub col1: usize,
    pub row1: usize,
}

impl PixelWindow {
    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.row1 - self.row0, self.col1 - self.col0)
    }
}

/// Tile layout of one image.
#[derive(Debug, Clone, Copy)]
pub struct TileGrid {
    pub image_width: usize,
    pub image_height: usize,
    pub tile_width: usize,
    pub tile_height: usize,
}

impl TileGrid {
    pub fn tiles_across(&self) -> usize {
        self.image_width.div_ceil(self.tile_width)
    }

    pub fn tiles_down(&self) -> usize {
        self.image_height.div_ceil(self.tile_height)
    }
}

/// Descriptor for a tile that needs to be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRequest {
    /// Linear tile index in the TIFF tile array.
    pub tile_idx: usize,
    /// Tile column in the tile grid.
    pub tile_col: usize,
    /// Tile row in the tile grid.
    pub tile_row: usize,
}

/// Pixel window covering `rect`, clamped to the image. `None` when the
/// rectangle misses the image entirely.
pub fn window_for_rect(
    rect: &MapRect,
    geo_transform: &GeoTransform,
    image_width: usize,
    image_height: usize,
) -> Option<PixelWindow> {
    let corners = [
        geo_transform.geo_to_pixel(rect.min_x, rect.max_y),
        geo_transform.geo_to_pixel(rect.max_x, rect.min_y),
        geo_transform.geo_to_pixel(rect.min_x, rect.min_y),
        geo_transform.geo_to_pixel(rect.max_x, rect.max_y),
    ];
    if corners.iter().any(|(c, r)| !c.is_finite() || !r.is_finite()) {
        return None;
    }

    let min_col = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min).floor();
    let max_col = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max).ceil();
    let min_row = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min).floor();
    let max_row = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max).ceil();

    let clamp = |v: f64, hi: usize| v.max(0.0).min(hi as f64) as usize;
    let window = PixelWindow {
        col0: clamp(min_col, image_width),
        row0: clamp(min_row, image_height),
        col1: clamp(max_col, image_width),
        row1: clamp(max_row, image_height),
    };

    (window.col0 < window.col1 && window.row0 < window.row1).then_some(window)
}

/// Tiles intersecting `window`, in row-major order.
pub fn tiles_for_window(window: &PixelWindow, grid: &TileGrid) -> Vec<TileRequest> {
    let tiles_across = grid.tiles_across();
    let col_range = window.col0 / grid.tile_width..window.col1.div_ceil(grid.tile_width).min(tiles_across);
    let row_range = window.row0 / grid.tile_height..window.row1.div_ceil(grid.tile_height).min(grid.tiles_down());

    row_range
        .flat_map(|tile_row| {
            col_range.clone().map(move |tile_col| TileRequest {
                tile_idx: tile_row * tiles_across + tile_col,
                tile_col,
                tile_row,
            })
        })
        .collect()
}
