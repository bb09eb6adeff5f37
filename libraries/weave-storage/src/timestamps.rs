//! Timestamp columns are stored as Unix milliseconds

use crate::error::{Result, StorageError};
use chrono::{DateTime, TimeZone, Utc};

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(entity: &'static str, id: &str, millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StorageError::corrupt(entity, id, format!("bad timestamp {millis}")))
}
