// Historical usage models: minute buckets, per-tick aggregates, query results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A UTC timestamp with zero seconds and sub-seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MinuteBucket(DateTime<Utc>);

impl MinuteBucket {
    /// The minute containing `ts`.
    pub fn containing(ts: DateTime<Utc>) -> Self {
        let secs = ts.timestamp() - ts.timestamp().rem_euclid(60);
        // A floored in-range timestamp is always representable.
        Self(DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH))
    }

    /// Unix seconds, as stored in `ts_minute`.
    pub fn timestamp(&self) -> i64 {
        self.0.timestamp()
    }
}

/// Bytes attributed to one (process, interface) pair for one aggregation tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMinute {
    pub process: String,
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Historical row joined with its raw process name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRow {
    pub process_name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Usage grouped under a canonical application name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUsage {
    pub name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

impl AppUsage {
    pub fn total(&self) -> u64 {
        self.rx_bytes.saturating_add(self.tx_bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Wire form is `rx,tx` in decimal.
impl fmt::Display for Totals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.rx_bytes, self.tx_bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interface {
    pub id: i64,
    pub name: String,
    pub is_default: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub process_name: String,
    pub exe_path: Option<String>,
    pub first_seen: i64,
}
