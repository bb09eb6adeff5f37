//! HTTP content provider client.

use crate::error::{ProviderError, Result};
use crate::types::{PoolDetails, PoolPage, ProviderConfig, WireItem};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use weave_core::{ContentProvider, PoolId, ProviderItem, TrackId};

/// Upper bound on pages followed for one pool listing
const MAX_PAGES: usize = 1000;

/// Content provider reached over HTTP.
///
/// Endpoints, relative to the configured base URL:
///
/// - `GET /playlists/{pool}/tracks?limit=N` - paginated listing (`items`, `next`)
/// - `GET /playlists/{pool}` - pool details (`name`)
/// - `GET /tracks/{id}` - one item
///
/// Ids are percent-encoded as single path segments.
pub struct HttpContentProvider {
    http: Client,
    base_url: String,
    base: Url,
    page_size: u32,
    access_token: Arc<RwLock<Option<String>>>,
}

impl HttpContentProvider {
    /// Create a new client with the given configuration.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(ProviderError::InvalidUrl("URL cannot be empty".into()));
        }

        let base_url = config.url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ProviderError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }
        let base = Url::parse(&base_url)
            .map_err(|e| ProviderError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ProviderError::InvalidUrl(format!("{base_url} cannot be a base URL")));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("Weave/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            base,
            page_size: config.page_size.max(1),
            access_token: Arc::new(RwLock::new(config.access_token)),
        })
    }

    /// Get the provider base URL.
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Replace the bearer token used for subsequent requests.
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.access_token.read().await.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Base URL extended by `segments`, each encoded as one path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ProviderError::InvalidUrl(format!("{} cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = %url, "Provider request");

        let request = self.authorized(self.http.get(url)).await;
        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ProviderError::Unreachable(e.to_string())
            } else {
                ProviderError::Request(e)
            }
        })?;

        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("{url}: {e}")))
    }

    /// Read every page of a pool listing.
    pub async fn fetch_pool_items(&self, pool_id: &PoolId) -> Result<Vec<ProviderItem>> {
        let mut first = self.endpoint(&["playlists", pool_id.as_str(), "tracks"])?;
        first
            .query_pairs_mut()
            .append_pair("limit", &self.page_size.to_string());
        let mut next = Some(String::from(first));
        let mut items = Vec::new();
        let mut skipped = 0usize;
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            if pages == MAX_PAGES {
                return Err(ProviderError::TooManyPages(MAX_PAGES));
            }
            pages += 1;

            let page: PoolPage = self.get_json(&url).await?;
            for entry in page.items {
                match entry.track.and_then(WireItem::into_item) {
                    Some(item) => items.push(item),
                    None => skipped += 1,
                }
            }
            next = page.next;
        }

        if skipped > 0 {
            warn!(pool = %pool_id, skipped, "Skipped unavailable pool entries");
        }
        info!(pool = %pool_id, count = items.len(), pages, "Fetched pool items");

        Ok(items)
    }

    /// Look up a pool's display name.
    pub async fn fetch_pool_name(&self, pool_id: &PoolId) -> Result<String> {
        let url = self.endpoint(&["playlists", pool_id.as_str()])?;
        let details: PoolDetails = self.get_json(url.as_str()).await?;
        Ok(details.name)
    }

    /// Look up one item.
    pub async fn fetch_item(&self, track_id: &TrackId) -> Result<ProviderItem> {
        let url = self.endpoint(&["tracks", track_id.as_str()])?;
        let wire: WireItem = self.get_json(url.as_str()).await?;
        wire.into_item()
            .ok_or_else(|| ProviderError::ParseError(format!("item {track_id} has no id")))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let message = response.text().await.unwrap_or_default();
            Err(ProviderError::AuthFailed(message))
        }
        StatusCode::NOT_FOUND => Err(ProviderError::NotFound(response.url().to_string())),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            Err(ProviderError::RateLimited { retry_after_secs })
        }
        _ => {
            let message = response.text().await.unwrap_or_default();
            Err(ProviderError::ServerError {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl ContentProvider for HttpContentProvider {
    async fn pool_items(&self, pool_id: &PoolId) -> weave_core::Result<Vec<ProviderItem>> {
        self.fetch_pool_items(pool_id)
            .await
            .map_err(|e| e.into_upstream(format!("pool {pool_id} items")))
    }

    async fn pool_name(&self, pool_id: &PoolId) -> weave_core::Result<String> {
        self.fetch_pool_name(pool_id)
            .await
            .map_err(|e| e.into_upstream(format!("pool {pool_id}")))
    }

    async fn item(&self, track_id: &TrackId) -> weave_core::Result<ProviderItem> {
        self.fetch_item(track_id)
            .await
            .map_err(|e| e.into_upstream(format!("item {track_id}")))
    }
}
