// Background worker: every bucket_secs, turn the live rate snapshot into byte counts and append
// them to usage_app_minute under the current minute. Runs as its own task so store writes never
// sit on the query path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::collector::RateReader;
use crate::models::{AppMinute, MinuteBucket, RateSnapshot};
use crate::usage_repo::UsageRepo;

/// Config for the aggregation worker.
#[derive(Debug, Clone)]
pub struct AggregationWorkerConfig {
    pub bucket_secs: u64,
    /// Interface rows created under this name get is_default = 1.
    pub default_interface: Option<String>,
}

/// Groups the snapshot by (process, interface) in first-seen order, summing rates across pids,
/// and extrapolates each group over `bucket_secs`.
pub fn aggregate_rates(snapshot: &RateSnapshot, bucket_secs: u64) -> Vec<AppMinute> {
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut sums: Vec<(&str, &str, u64, u64)> = Vec::new();

    for (key, rates) in snapshot.iter() {
        let group = (key.process.as_str(), key.interface.as_str());
        let i = *index.entry(group).or_insert_with(|| {
            sums.push((group.0, group.1, 0, 0));
            sums.len() - 1
        });
        let entry = &mut sums[i];
        entry.2 = entry.2.saturating_add(rates.rx_bytes_per_sec);
        entry.3 = entry.3.saturating_add(rates.tx_bytes_per_sec);
    }

    sums.into_iter()
        .map(|(process, interface, rx, tx)| AppMinute {
            process: process.to_string(),
            interface: interface.to_string(),
            rx_bytes: rx.saturating_mul(bucket_secs),
            tx_bytes: tx.saturating_mul(bucket_secs),
        })
        .collect()
}

/// Runs one aggregation pass over `snapshot`, stamping rows with the minute containing `now`.
/// An empty snapshot touches nothing. Returns rows inserted.
pub async fn run_one_tick(
    repo: &UsageRepo,
    snapshot: &RateSnapshot,
    config: &AggregationWorkerConfig,
    now: DateTime<Utc>,
) -> anyhow::Result<usize> {
    let minutes = aggregate_rates(snapshot, config.bucket_secs);
    if minutes.is_empty() {
        return Ok(0);
    }
    repo.record_app_minutes(
        MinuteBucket::containing(now),
        &minutes,
        config.default_interface.as_deref(),
    )
    .await
}

/// Spawns the aggregation worker. Returns a join handle; the task ends on `shutdown_rx`.
pub fn spawn(
    repo: Arc<UsageRepo>,
    rates: RateReader,
    config: AggregationWorkerConfig,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(repo, rates, config, shutdown_rx).await;
    })
}

#[instrument(skip_all, fields(bucket_secs = config.bucket_secs))]
async fn run(
    repo: Arc<UsageRepo>,
    rates: RateReader,
    config: AggregationWorkerConfig,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    let period = Duration::from_secs(config.bucket_secs);
    // First tick after one full period: there is nothing to attribute before that.
    let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let snapshot = rates.snapshot();
                match run_one_tick(&repo, &snapshot, &config, Utc::now()).await {
                    Ok(0) => debug!("aggregation tick: no live rates"),
                    Ok(rows) => debug!(rows, "aggregation tick"),
                    Err(e) => warn!(error = %e, "aggregation tick failed"),
                }
            }
            _ = &mut shutdown_rx => {
                debug!("aggregation worker shutting down");
                break;
            }
        }
    }
}
