//! Error types for catalog search and COG reading.

use thiserror::Error;

/// Errors produced by the STAC client and the COG reader.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out: {url}")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("server does not support Range requests for {url}")]
    RangeNotSupported { url: String },

    #[error("invalid TIFF: {reason}")]
    InvalidTiff { reason: String },

    #[error("unsupported compression: {0}")]
    UnsupportedCompression(u16),

    #[error("unsupported predictor: {0}")]
    UnsupportedPredictor(u16),

    #[error("unsupported data type: bits_per_sample={bps}, sample_format={sf}")]
    UnsupportedDataType { bps: u16, sf: u16 },

    #[error("unsupported planar configuration: {0} (only chunky=1 supported)")]
    UnsupportedPlanarConfig(u16),

    #[error("unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid catalog response: {0}")]
    InvalidResponse(String),

    #[error("no IFD entries found in TIFF")]
    NoIfd,

    #[error("bbox does not intersect raster extent")]
    BBoxOutside,

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("core error: {0}")]
    Core(#[from] uhimon_core::Error),
}

impl CloudError {
    /// Whether the failure was an I/O timeout rather than a hard error.
    pub fn is_timeout(&self) -> bool {
        match self {
            CloudError::Timeout { .. } => true,
            CloudError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CloudError::Timeout {
                url: strip_query(url).to_string(),
            }
        } else {
            CloudError::Http(err)
        }
    }
}

/// Drop the query string (SAS tokens) before a URL lands in an error message.
pub(crate) fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_query() {
        assert_eq!(
            strip_query("https://x.blob.core.windows.net/a/b.TIF?st=1&sig=abc"),
            "https://x.blob.core.windows.net/a/b.TIF"
        );
        assert_eq!(strip_query("https://host/a.tif"), "https://host/a.tif");
    }

    #[test]
    fn test_is_timeout() {
        assert!(CloudError::Timeout { url: "u".into() }.is_timeout());
        assert!(!CloudError::NoIfd.is_timeout());
    }
}
