//! HTTP client wrapper with Range request support.
//!
//! Requests are sent exactly once. Timeouts surface as
//! [`CloudError::Timeout`] so callers can decide whether to try again.

use crate::error::{strip_query, CloudError, Result};
use futures::stream::{FuturesOrdered, StreamExt};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;

/// HTTP client for fetching byte ranges from remote files.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    request_timeout: Duration,
}

/// Response from a HEAD request.
pub struct HeadInfo {
    /// Total file size in bytes, if reported by the server.
    pub content_length: Option<u64>,
    /// Whether the server supports Range requests.
    pub accept_ranges: bool,
}

impl HttpClient {
    /// Create a new HTTP client with a per-request timeout.
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            request_timeout,
        })
    }

    /// Send a HEAD request to discover file size and Range support.
    pub async fn head(&self, url: &str) -> Result<HeadInfo> {
        let resp = self.send(url, self.client.head(url)).await?;

        let accept_ranges = resp
            .headers()
            .get("accept-ranges")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("bytes"))
            .unwrap_or(false);

        let content_length = resp
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        Ok(HeadInfo {
            content_length,
            accept_ranges,
        })
    }

    /// Fetch a byte range from a remote file.
    ///
    /// Returns the raw bytes for `[offset .. offset + length)`.
    pub async fn fetch_range(&self, url: &str, offset: u64, length: u64) -> Result<Vec<u8>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let range_value = format!("bytes={}-{}", offset, offset + length - 1);
        let req = self.client.get(url).header("Range", &range_value);
        let resp = self.send(url, req).await?;

        let status = resp.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE
            || (status.is_success() && status != StatusCode::PARTIAL_CONTENT)
        {
            return Err(CloudError::RangeNotSupported {
                url: strip_query(url).to_string(),
            });
        }

        if !status.is_success() {
            return Err(CloudError::Status {
                status: status.as_u16(),
                url: strip_query(url).to_string(),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| CloudError::from_reqwest(url, e))?;
        Ok(bytes.to_vec())
    }

    /// Fetch multiple byte ranges concurrently.
    ///
    /// Each element in `ranges` is `(offset, length)`.
    /// Returns one `Vec<u8>` per range, in the same order.
    pub async fn fetch_ranges(&self, url: &str, ranges: &[(u64, u64)]) -> Result<Vec<Vec<u8>>> {
        let mut futs = FuturesOrdered::new();
        for &(offset, length) in ranges {
            futs.push_back(self.fetch_range(url, offset, length));
        }

        let mut results = Vec::with_capacity(ranges.len());
        while let Some(res) = futs.next().await {
            results.push(res?);
        }

        Ok(results)
    }

    /// Underlying reqwest client, shared with the STAC client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Getter for the timeout duration.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| CloudError::from_reqwest(url, e))
    }
}
