//! Async STAC client for searching spatio-temporal asset catalogs.
//!
//! Supports Planetary Computer and Earth Search out of the box, plus
//! arbitrary STAC API endpoints via [`StacCatalog::Custom`]. Every request
//! is sent once; failures are returned to the caller unchanged.

use std::str::FromStr;
use std::time::Duration;

use reqwest::Response;

use crate::error::{strip_query, CloudError, Result};
use crate::http::HttpClient;
use crate::stac_models::{StacItem, StacItemCollection, StacLink, StacSearchParams};

const PC_SIGN_URL: &str = "https://planetarycomputer.microsoft.com/api/sas/v1/sign";
const PC_SUBSCRIPTION_HEADER: &str = "Ocp-Apim-Subscription-Key";

// ---------------------------------------------------------------------------
// Catalog enum
// ---------------------------------------------------------------------------

/// Well-known STAC catalogs plus custom endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StacCatalog {
    /// Microsoft Planetary Computer STAC API.
    PlanetaryComputer,
    /// AWS Earth Search (Element 84).
    EarthSearch,
    /// Any STAC API endpoint (provide the root URL, e.g.
    /// `"https://my-stac.example.com/api/v1"`).
    Custom(String),
}

impl StacCatalog {
    /// Return the full POST `/search` URL for this catalog.
    pub fn search_url(&self) -> String {
        match self {
            Self::PlanetaryComputer => {
                "https://planetarycomputer.microsoft.com/api/stac/v1/search".to_string()
            }
            Self::EarthSearch => "https://earth-search.aws.element84.com/v1/search".to_string(),
            Self::Custom(base) => {
                let base = base.trim_end_matches('/');
                if base.ends_with("/search") {
                    base.to_string()
                } else {
                    format!("{}/search", base)
                }
            }
        }
    }

    /// Whether assets from this catalog need a SAS token before they can be read.
    pub fn needs_signing(&self) -> bool {
        matches!(self, Self::PlanetaryComputer)
    }
}

impl FromStr for StacCatalog {
    type Err = std::convert::Infallible;

    /// Recognized shorthands: `"pc"`, `"planetary-computer"`, `"es"`,
    /// `"earth-search"`. Anything else is treated as a custom URL.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "pc" | "planetary-computer" | "planetarycomputer" => Self::PlanetaryComputer,
            "es" | "earth-search" | "earthsearch" => Self::EarthSearch,
            _ => Self::Custom(s.trim().to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for [`StacClient`].
#[derive(Debug, Clone)]
pub struct StacClientOptions {
    /// Per-request timeout (default 30 s).
    pub request_timeout: Duration,
    /// Maximum total items to fetch across pages (default 100).
    pub max_items: usize,
    /// Planetary Computer subscription key, sent with signing requests.
    pub subscription_key: Option<String>,
}

impl Default for StacClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_items: 100,
            subscription_key: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Async client for STAC Item Search and asset signing.
pub struct StacClient {
    catalog: StacCatalog,
    http: HttpClient,
    options: StacClientOptions,
}

impl StacClient {
    /// Create a new STAC client with its own connection pool.
    pub fn new(catalog: StacCatalog, options: StacClientOptions) -> Result<Self> {
        let http = HttpClient::new(options.request_timeout)?;
        Ok(Self::with_client(catalog, http, options))
    }

    /// Create a client that shares an existing HTTP connection pool.
    pub fn with_client(catalog: StacCatalog, http: HttpClient, options: StacClientOptions) -> Self {
        Self {
            catalog,
            http,
            options,
        }
    }

    /// The catalog this client is configured for.
    pub fn catalog(&self) -> &StacCatalog {
        &self.catalog
    }

    /// The shared HTTP client, reused for COG range reads.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    // ── Single-page search ──────────────────────────────────────────

    /// Execute a single search request and return one page of results.
    pub async fn search(&self, params: &StacSearchParams) -> Result<StacItemCollection> {
        let url = self.catalog.search_url();
        self.post_search(&url, params).await
    }

    // ── Paginated search ────────────────────────────────────────────

    /// Search with automatic pagination, collecting up to `max_items` items.
    pub async fn search_all(&self, params: &StacSearchParams) -> Result<Vec<StacItem>> {
        let mut all_items: Vec<StacItem> = Vec::new();
        let max = self.options.max_items;

        let mut page = self.search(params).await?;
        let mut pages = 1usize;

        loop {
            let next = page.next_link().cloned();
            all_items.append(&mut page.features);

            if all_items.len() >= max {
                break;
            }

            match next {
                Some(link) => {
                    page = self.follow_next(&link, params).await?;
                    pages += 1;
                    if page.is_empty() {
                        break;
                    }
                }
                None => break,
            }
        }

        all_items.truncate(max);
        tracing::debug!(items = all_items.len(), pages, "STAC search complete");
        Ok(all_items)
    }

    // ── Planetary Computer SAS token signing ────────────────────────

    /// Turn an asset href into a URL readable with HTTP Range requests.
    ///
    /// For catalogs that serve public assets this returns the href unchanged.
    pub async fn sign_asset_href(&self, href: &str) -> Result<String> {
        if !self.catalog.needs_signing() {
            return Ok(href.to_string());
        }
        self.sign_pc_href(href).await
    }

    // ── Private helpers ─────────────────────────────────────────────

    async fn post_search(&self, url: &str, params: &StacSearchParams) -> Result<StacItemCollection> {
        let resp = self
            .http
            .inner()
            .post(url)
            .json(params)
            .send()
            .await
            .map_err(|e| CloudError::from_reqwest(url, e))?;
        read_json(url, resp).await
    }

    /// Follow a pagination link. Handles both POST (body/merge) and GET links.
    async fn follow_next(
        &self,
        link: &StacLink,
        original_params: &StacSearchParams,
    ) -> Result<StacItemCollection> {
        let method = link.method.as_deref().unwrap_or("GET").to_uppercase();

        if method == "POST" {
            let body = next_page_body(link, original_params)?;
            self.post_search(&link.href, &body).await
        } else {
            let resp = self
                .http
                .inner()
                .get(&link.href)
                .send()
                .await
                .map_err(|e| CloudError::from_reqwest(&link.href, e))?;
            read_json(&link.href, resp).await
        }
    }

    /// Sign a single href via the Planetary Computer `/api/sas/v1/sign` endpoint.
    async fn sign_pc_href(&self, href: &str) -> Result<String> {
        let mut req = self
            .http
            .inner()
            .get(PC_SIGN_URL)
            .query(&[("href", href)]);
        if let Some(key) = &self.options.subscription_key {
            req = req.header(PC_SUBSCRIPTION_HEADER, key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| CloudError::from_reqwest(PC_SIGN_URL, e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(CloudError::Auth(format!(
                "signing {} rejected with HTTP {}",
                strip_query(href),
                status.as_u16()
            )));
        }

        let body: serde_json::Value = read_json(PC_SIGN_URL, resp).await?;
        signed_href(&body)
    }
}

/// Build the request body for a POST `next` link.
///
/// With `merge: true` the link body overlays the previous request; otherwise
/// the link body replaces it.
fn next_page_body(link: &StacLink, original: &StacSearchParams) -> Result<StacSearchParams> {
    let body = match (&link.body, link.merge.unwrap_or(false)) {
        (Some(link_body), true) => {
            let mut base = serde_json::to_value(original)
                .map_err(|e| CloudError::InvalidResponse(format!("serializing params: {e}")))?;
            if let (Some(base_obj), Some(link_obj)) = (base.as_object_mut(), link_body.as_object())
            {
                for (k, v) in link_obj {
                    base_obj.insert(k.clone(), v.clone());
                }
            }
            base
        }
        (Some(link_body), false) => link_body.clone(),
        (None, _) => return Ok(original.clone()),
    };
    serde_json::from_value(body)
        .map_err(|e| CloudError::InvalidResponse(format!("next link body: {e}")))
}

fn signed_href(body: &serde_json::Value) -> Result<String> {
    body["href"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| CloudError::InvalidResponse("sign response missing 'href'".into()))
}

/// Check the status and decode a JSON body.
async fn read_json<T: serde::de::DeserializeOwned>(url: &str, resp: Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        return Err(CloudError::Status {
            status: status.as_u16(),
            url: strip_query(url).to_string(),
        });
    }
    let body = resp
        .text()
        .await
        .map_err(|e| CloudError::from_reqwest(url, e))?;
    serde_json::from_str(&body).map_err(|e| {
        CloudError::InvalidResponse(format!("{}: {e}", strip_query(url)))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
