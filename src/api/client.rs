use futures::StreamExt;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::types::{CatalogEntry, CatalogPage, CategoryResponse, DetailRecord};
use crate::util::id_from_resource_url;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_SPRITE_BASE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

/// The catalog is fetched in one request; the API caps nothing below this.
const CATALOG_LIMIT: u32 = 100_000;

/// The full catalog index is a few hundred kilobytes; detail records with
/// every move listed stay well under a megabyte.
const MAX_RESPONSE_SIZE: usize = 20 * 1024 * 1024;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("No entry with id {0}")]
    NotFound(i64),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

/// Build the shared HTTP client.
///
/// Connection pooling matters here: the favorites view fires one detail
/// request per favorite against the same host.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(Policy::limited(3))
        .pool_max_idle_per_host(8)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(timeout)
        .user_agent(concat!("dexview/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Read-only gateway to the creature-data API.
///
/// Cheap to clone; background tasks each take their own copy.
#[derive(Clone, Debug)]
pub struct Gateway {
    client: reqwest::Client,
    base_url: Url,
    sprite_base_url: String,
    timeout: Duration,
}

impl Gateway {
    /// Create a gateway for `base_url`.
    ///
    /// HTTPS is required, except for `localhost`/`127.0.0.1` so tests can
    /// point at a local mock server.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        sprite_base_url: &str,
    ) -> Result<Self, ApiError> {
        let base_url = checked_base_url(base_url)?;
        Ok(Self {
            client,
            base_url,
            sprite_base_url: sprite_base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch the full catalog index in one request.
    pub async fn fetch_catalog_index(&self) -> Result<Vec<CatalogEntry>, ApiError> {
        let mut url = self.endpoint(&["pokemon"])?;
        url.query_pairs_mut()
            .append_pair("limit", &CATALOG_LIMIT.to_string())
            .append_pair("offset", "0");

        let page: CatalogPage = self.get_json(url).await?;
        tracing::debug!(count = page.results.len(), "Catalog index fetched");
        Ok(page.results.into_iter().map(CatalogEntry::from).collect())
    }

    /// Fetch one detail record. A 404 maps to [`ApiError::NotFound`].
    pub async fn fetch_detail(&self, id: i64) -> Result<DetailRecord, ApiError> {
        let url = self.endpoint(&["pokemon", &id.to_string()])?;
        match self.get_json(url).await {
            Err(ApiError::HttpStatus(404)) => Err(ApiError::NotFound(id)),
            other => other,
        }
    }

    /// Fetch the member ids of one category.
    ///
    /// Members whose resource URL carries no numeric id are skipped.
    pub async fn fetch_category_members(&self, category: &str) -> Result<Vec<i64>, ApiError> {
        let url = self.endpoint(&["type", category])?;
        let response: CategoryResponse = self.get_json(url).await?;
        let ids: Vec<i64> = response
            .pokemon
            .iter()
            .filter_map(|m| id_from_resource_url(&m.pokemon.url))
            .collect();
        tracing::debug!(category, members = ids.len(), "Category members fetched");
        Ok(ids)
    }

    /// Static sprite asset for an id. No request is made.
    pub fn sprite_url(&self, id: i64) -> String {
        format!("{}/{}.png", self.sprite_base_url, id)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        tracing::trace!(url = %url, "GET");
        let request = async {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(ApiError::Network)?;

            let status = response.status();
            if !status.is_success() {
                tracing::warn!(url = %url, status = status.as_u16(), "API request failed");
                return Err(ApiError::HttpStatus(status.as_u16()));
            }

            let body = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
            Ok(serde_json::from_slice(&body)?)
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ApiError::Timeout(self.timeout.as_secs()))?
    }
}

fn checked_base_url(base: &str) -> Result<Url, ApiError> {
    let url = Url::parse(base).map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {}", base, e)))?;
    match url.scheme() {
        "https" => Ok(url),
        "http" if matches!(url.host_str(), Some("localhost") | Some("127.0.0.1")) => {
            tracing::warn!(base_url = %base, "Using non-HTTPS API base URL (localhost only)");
            Ok(url)
        }
        _ => {
            tracing::error!(base_url = %base, "Rejecting non-HTTPS base URL");
            Err(ApiError::InsecureBaseUrl)
        }
    }
}

async fn read_limited_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, ApiError> {
    // Fast path: trust an oversized Content-Length
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
