//! Engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where a due scheduled reweight is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReweightScope {
    /// Overwrite the blend definition's active weights.
    ///
    /// Every session of the blend sees the change, including ones started later.
    #[default]
    SharedDefinition,

    /// Write the weights into the session's own snapshot; the definition is untouched
    SessionSnapshot,
}

impl ReweightScope {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SharedDefinition => "shared_definition",
            Self::SessionSnapshot => "session_snapshot",
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub reweight_scope: ReweightScope,

    /// How long a resolved pool name is reused
    #[serde(rename = "pool_name_cache_ttl_secs", with = "secs")]
    pub pool_name_cache_ttl: Duration,

    /// Maximum number of cached pool names
    pub pool_name_cache_capacity: usize,

    /// Sessions idle for longer than this are removed by `purge_idle_sessions`
    pub session_idle_timeout_minutes: u32,

    /// Refresh a drawn item's metadata from the provider before returning it
    pub enrich_items: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reweight_scope: ReweightScope::default(),
            pool_name_cache_ttl: Duration::from_secs(300),
            pool_name_cache_capacity: 256,
            session_idle_timeout_minutes: 24 * 60,
            enrich_items: false,
        }
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
