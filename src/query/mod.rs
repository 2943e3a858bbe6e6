// Query service: liveness, live snapshot, and normalized history over reporting windows.

pub mod normalize;
pub mod period;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::collector::RateReader;
use crate::models::{AppUsage, LiveRate, Totals, UsageRow};
use crate::usage_repo::UsageRepo;
pub use normalize::canonical_name;
pub use period::Period;

/// Reply to `ping`.
pub const PING_REPLY: &str = "ok";

pub struct QueryService {
    rates: RateReader,
    repo: Arc<UsageRepo>,
}

impl QueryService {
    pub fn new(rates: RateReader, repo: Arc<UsageRepo>) -> Self {
        Self { rates, repo }
    }

    pub fn ping(&self) -> &'static str {
        PING_REPLY
    }

    /// Unfiltered dump of the current rate table.
    pub fn live_snapshot(&self) -> Vec<LiveRate> {
        self.rates.snapshot().iter().map(LiveRate::from).collect()
    }

    pub async fn top_apps(&self, period: &str, limit: usize) -> anyhow::Result<Vec<AppUsage>> {
        self.top_apps_at(period, limit, Utc::now()).await
    }

    pub async fn top_apps_at(
        &self,
        period: &str,
        limit: usize,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<AppUsage>> {
        let start = Period::parse(period).start(now);
        let rows = self.repo.app_usage_since(start).await?;
        Ok(rank_apps(rows, limit))
    }

    pub async fn totals(&self, period: &str) -> anyhow::Result<Totals> {
        self.totals_at(period, Utc::now()).await
    }

    pub async fn totals_at(&self, period: &str, now: DateTime<Utc>) -> anyhow::Result<Totals> {
        let start = Period::parse(period).start(now);
        self.repo.totals_since(start).await
    }
}

/// Groups rows under canonical names, sorts by rx+tx descending and keeps `limit`.
/// Ties keep the order in which each name was first seen.
pub fn rank_apps<I>(rows: I, limit: usize) -> Vec<AppUsage>
where
    I: IntoIterator<Item = UsageRow>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut apps: Vec<AppUsage> = Vec::new();

    for row in rows {
        let name = canonical_name(&row.process_name).into_owned();
        let i = match index.get(&name) {
            Some(&i) => i,
            None => {
                apps.push(AppUsage {
                    name: name.clone(),
                    rx_bytes: 0,
                    tx_bytes: 0,
                });
                index.insert(name, apps.len() - 1);
                apps.len() - 1
            }
        };
        let app = &mut apps[i];
        app.rx_bytes = app.rx_bytes.saturating_add(row.rx_bytes);
        app.tx_bytes = app.tx_bytes.saturating_add(row.tx_bytes);
    }

    // sort_by is stable.
    apps.sort_by(|a, b| b.total().cmp(&a.total()));
    apps.truncate(limit);
    apps
}
