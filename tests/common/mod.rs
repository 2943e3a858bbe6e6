// Shared test helpers

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use netcheckd::collector::Collector;
use netcheckd::collector::identity::NoopResolver;
use netcheckd::config::CollectorConfig;
use netcheckd::models::{AppMinute, ALL_INTERFACES};
use netcheckd::usage_repo::UsageRepo;
use std::sync::Arc;
use tempfile::TempDir;

/// Fresh, initialized store in a temp dir. Keep the TempDir alive for the test's duration.
pub async fn temp_repo() -> (TempDir, Arc<UsageRepo>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("usage.sqlite3");
    let repo = UsageRepo::connect(path.to_str().unwrap(), 2).await.unwrap();
    repo.init().await.unwrap();
    (dir, Arc::new(repo))
}

/// Collector that never touches /proc and is not started.
pub fn collector() -> Arc<Collector> {
    Arc::new(Collector::new(
        CollectorConfig::default(),
        Arc::new(NoopResolver),
    ))
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

pub fn minute(process: &str, rx: u64, tx: u64) -> AppMinute {
    AppMinute {
        process: process.into(),
        interface: ALL_INTERFACES.into(),
        rx_bytes: rx,
        tx_bytes: tx,
    }
}
