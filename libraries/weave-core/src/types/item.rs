/// Item types: provider listings, session copies and draw results
use crate::types::{BlendId, PoolId, SessionId, SessionItemId, TrackId};
use serde::{Deserialize, Serialize};

/// Placeholder used when a pool's display name cannot be resolved
pub const UNKNOWN_POOL_NAME: &str = "Unknown Pool";

/// One item as listed by the content provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderItem {
    pub id: TrackId,
    pub title: String,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub cover_url: Option<String>,
}

/// Session-scoped copy of one provider item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionItem {
    pub id: SessionItemId,
    pub track_id: TrackId,
    pub title: String,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub duration_ms: u64,
    pub cover_url: Option<String>,

    /// Position within the owning pool, in provider order
    pub position: u32,

    pub pool_id: PoolId,
    pub blend_id: BlendId,
    pub session_id: SessionId,
    pub played: bool,
}

impl SessionItem {
    /// Copy a provider item into a session, unplayed
    pub fn from_provider(
        item: ProviderItem,
        position: u32,
        pool_id: PoolId,
        blend_id: BlendId,
        session_id: SessionId,
    ) -> Self {
        Self {
            id: SessionItemId::generate(),
            track_id: item.id,
            title: item.title,
            artists: item.artists,
            album: item.album,
            duration_ms: item.duration_ms,
            cover_url: item.cover_url,
            position,
            pool_id,
            blend_id,
            session_id,
            played: false,
        }
    }

    /// Overwrite display metadata with a fresher provider copy
    pub fn refresh_metadata(&mut self, item: ProviderItem) {
        self.title = item.title;
        self.artists = item.artists;
        self.album = item.album;
        self.duration_ms = item.duration_ms;
        self.cover_url = item.cover_url;
    }

    /// Artists joined for display
    pub fn artist_names(&self) -> String {
        if self.artists.is_empty() {
            "Unknown Artist".to_string()
        } else {
            self.artists.join(", ")
        }
    }
}

/// Result of one successful draw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawnItem {
    pub item: SessionItem,
    pub pool_id: PoolId,
    pub pool_name: String,

    /// Crossfade configured on the blend the item came from
    pub crossfade_seconds: u8,

    /// Set when the session plays a sequence stage
    pub stage_index: Option<usize>,
}

/// One row of a session overview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTrack {
    pub item: SessionItem,
    pub pool_name: String,
}
