//! Query layer: every read and write the engine performs.

pub mod admin;
pub mod block_ops;
pub mod chunk_ops;
pub mod chunk_query;
pub mod meta_ops;

use chrono::{DateTime, SecondsFormat, Utc};

use engram_core::errors::{EngramError, EngramResult};

/// Timestamps are stored as millisecond-precision UTC strings with a
/// `Z` suffix so string order equals time order.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_ts(s: &str) -> EngramResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngramError::storage(format!("parse datetime '{s}': {e}")))
}
