//! Types for the provider API requests and responses.

use serde::Deserialize;
use std::time::Duration;
use weave_core::{ProviderItem, TrackId};

/// Configuration for connecting to a content provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the provider API (e.g., "https://api.example.com/v1")
    pub url: String,
    /// Bearer token sent with every request
    pub access_token: Option<String>,
    /// Whole-request timeout
    pub timeout: Duration,
    /// Page size requested for pool listings
    pub page_size: u32,
}

impl ProviderConfig {
    /// Create a new provider config with just the URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            access_token: None,
            timeout: Duration::from_secs(30),
            page_size: 100,
        }
    }

    /// Create a config with an access token.
    pub fn with_token(url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            ..Self::new(url)
        }
    }

    /// Override the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// =============================================================================
// Wire Types
// =============================================================================

/// One page of a pool listing.
#[derive(Debug, Deserialize)]
pub(crate) struct PoolPage {
    #[serde(default)]
    pub items: Vec<PoolEntry>,
    /// Absolute URL of the following page
    #[serde(default)]
    pub next: Option<String>,
}

/// A listing slot; the item is absent for removed or unavailable content.
#[derive(Debug, Deserialize)]
pub(crate) struct PoolEntry {
    #[serde(default)]
    pub track: Option<WireItem>,
}

/// Pool details.
#[derive(Debug, Deserialize)]
pub(crate) struct PoolDetails {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireArtist {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireImage {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<WireImage>,
}

/// Item as the provider describes it.
#[derive(Debug, Deserialize)]
pub(crate) struct WireItem {
    /// Missing for local-only content that cannot be played back remotely
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<WireArtist>,
    #[serde(default)]
    pub album: Option<WireAlbum>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl WireItem {
    /// Convert into the domain item; `None` when the item has no id
    pub(crate) fn into_item(self) -> Option<ProviderItem> {
        let id = self.id?;
        let cover_url = self
            .album
            .as_ref()
            .and_then(|album| album.images.first())
            .map(|image| image.url.clone());

        Some(ProviderItem {
            id: TrackId::new(id),
            title: self.name,
            artists: self.artists.into_iter().map(|a| a.name).collect(),
            album: self.album.map(|album| album.name),
            duration_ms: self.duration_ms,
            cover_url,
        })
    }
}
