// Streaming nethogs collector.
// One supervised subprocess feeds the live rate table; other tasks only ever see owned snapshots
// through a RateReader. Restarts use exponential backoff and health is published on a watch channel.

pub mod identity;
pub mod parse;

use crate::config::CollectorConfig;
use crate::models::{ALL_INTERFACES, CollectorHealth, CollectorState, RateKey, RateSnapshot, Rates};
use identity::IdentityResolver;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, instrument, trace, warn};

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("failed to launch {bin}: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("subprocess stdout was not captured")]
    MissingStdout,
}

/// Live (process, pid, interface) -> rates map. The lock is held for one insert or one full copy.
#[derive(Default)]
struct RateTable {
    rates: Mutex<BTreeMap<RateKey, Rates>>,
}

impl RateTable {
    fn insert(&self, key: RateKey, rates: Rates) {
        // Every insert leaves the map consistent, so a poisoned lock is still usable.
        let mut guard = self.rates.lock().unwrap_or_else(PoisonError::into_inner);
        guard.insert(key, rates);
    }

    fn snapshot(&self) -> RateSnapshot {
        let guard = self.rates.lock().unwrap_or_else(PoisonError::into_inner);
        RateSnapshot::from(guard.clone())
    }
}

/// Read-only handle to the collector's rates. Cheap to clone.
#[derive(Clone)]
pub struct RateReader {
    table: Arc<RateTable>,
}

impl RateReader {
    pub fn snapshot(&self) -> RateSnapshot {
        self.table.snapshot()
    }
}

pub struct Collector {
    config: CollectorConfig,
    table: Arc<RateTable>,
    resolver: Arc<dyn IdentityResolver>,
    stop_tx: watch::Sender<bool>,
    health_tx: watch::Sender<CollectorHealth>,
}

impl Collector {
    pub fn new(config: CollectorConfig, resolver: Arc<dyn IdentityResolver>) -> Self {
        let (stop_tx, _) = watch::channel(false);
        let (health_tx, _) = watch::channel(CollectorHealth::default());
        Self {
            config,
            table: Arc::new(RateTable::default()),
            resolver,
            stop_tx,
            health_tx,
        }
    }

    pub fn rates(&self) -> RateReader {
        RateReader {
            table: self.table.clone(),
        }
    }

    pub fn snapshot_rates(&self) -> RateSnapshot {
        self.table.snapshot()
    }

    pub fn health(&self) -> watch::Receiver<CollectorHealth> {
        self.health_tx.subscribe()
    }

    /// Requests shutdown. Observed between lines and during restart backoff.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    fn set_state(&self, state: CollectorState) {
        self.health_tx.send_modify(|h| h.state = state);
    }

    /// Parses one nethogs line into the table. Returns false when the line was discarded.
    pub fn ingest_line(&self, line: &str) -> bool {
        match parse::parse_line(line) {
            Ok(record) => {
                // Resolution may touch /proc; keep it outside the table lock.
                let process = identity::resolve_process_name(
                    self.resolver.as_ref(),
                    record.pid,
                    record.process,
                );
                self.table.insert(
                    RateKey::new(process, record.pid, ALL_INTERFACES),
                    record.rates,
                );
                true
            }
            Err(e) => {
                trace!(error = %e, "nethogs line discarded");
                false
            }
        }
    }

    /// Drains `reader` line by line until EOF, a read error, or stop. Returns records ingested.
    pub async fn read_stream<R>(&self, reader: R) -> u64
    where
        R: AsyncBufRead + Unpin,
    {
        let mut stop_rx = self.stop_tx.subscribe();
        let mut lines = reader.lines();
        let mut records: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = stop_rx.wait_for(|stopped| *stopped) => break,
                next = lines.next_line() => match next {
                    Ok(Some(line)) => {
                        if self.ingest_line(&line) {
                            records += 1;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!(error = %e, "nethogs stdout read failed");
                        break;
                    }
                },
            }
        }
        records
    }

    /// Spawns the supervisor task. The task ends once the collector is Stopped.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.supervise().await;
        })
    }

    #[instrument(skip(self), fields(bin = %self.config.nethogs_bin))]
    async fn supervise(&self) {
        let mut stop_rx = self.stop_tx.subscribe();
        let mut failures: u32 = 0;

        while !self.is_stopped() {
            match self.run_once().await {
                Ok(records) => {
                    info!(records, "nethogs exited");
                    if records > 0 {
                        failures = 0;
                    } else {
                        failures += 1;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "nethogs run failed");
                    failures += 1;
                }
            }
            if self.is_stopped() {
                break;
            }
            if failures > self.config.max_restarts {
                warn!(
                    failures,
                    "nethogs keeps failing; giving up, live rates are now stale"
                );
                break;
            }

            let delay = backoff_delay(
                self.config.restart_backoff(),
                self.config.max_backoff(),
                failures,
            );
            self.set_state(CollectorState::Degraded);
            info!(delay_ms = delay.as_millis() as u64, "restarting nethogs");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop_rx.wait_for(|stopped| *stopped) => break,
            }
            self.health_tx.send_modify(|h| h.restarts += 1);
        }

        self.set_state(CollectorState::Stopped);
        debug!("collector stopped");
    }

    /// One subprocess lifetime.
    async fn run_once(&self) -> Result<u64, CollectorError> {
        let mut child = Command::new(&self.config.nethogs_bin)
            .arg("-t")
            .arg("-d")
            .arg(self.config.refresh_secs.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CollectorError::Spawn {
                bin: self.config.nethogs_bin.clone(),
                source,
            })?;
        let stdout = child.stdout.take().ok_or(CollectorError::MissingStdout)?;

        self.set_state(CollectorState::Running);
        info!(pid = child.id(), "nethogs started");
        let records = self.read_stream(BufReader::new(stdout)).await;

        if let Err(e) = child.start_kill() {
            trace!(error = %e, "nethogs already exited");
        }
        if let Err(e) = child.wait().await {
            debug!(error = %e, "waiting for nethogs failed");
        }
        Ok(records)
    }
}

/// `base * 2^(failures - 1)`, capped at `max`. Zero failures means `base`.
pub fn backoff_delay(base: Duration, max: Duration, failures: u32) -> Duration {
    let exp = failures.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exp).min(max)
}
