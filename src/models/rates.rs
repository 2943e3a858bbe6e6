// Live per-process rate models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Interface label stamped on every sample. nethogs trace mode reports one
/// combined rate per process, so historical rows use this label too.
pub const ALL_INTERFACES: &str = "all";

/// Identity of one live rate entry: (process identity, pid, interface label).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RateKey {
    pub process: String,
    pub pid: u32,
    pub interface: String,
}

impl RateKey {
    pub fn new(process: impl Into<String>, pid: u32, interface: impl Into<String>) -> Self {
        Self {
            process: process.into(),
            pid,
            interface: interface.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rates {
    pub rx_bytes_per_sec: u64,
    pub tx_bytes_per_sec: u64,
}

/// Point-in-time copy of the rate table. Owned by the caller; never aliases
/// the collector's live map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateSnapshot {
    rates: BTreeMap<RateKey, Rates>,
}

impl RateSnapshot {
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn get(&self, key: &RateKey) -> Option<Rates> {
        self.rates.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RateKey, &Rates)> {
        self.rates.iter()
    }
}

impl From<BTreeMap<RateKey, Rates>> for RateSnapshot {
    fn from(rates: BTreeMap<RateKey, Rates>) -> Self {
        Self { rates }
    }
}

impl FromIterator<(RateKey, Rates)> for RateSnapshot {
    fn from_iter<I: IntoIterator<Item = (RateKey, Rates)>>(iter: I) -> Self {
        Self {
            rates: iter.into_iter().collect(),
        }
    }
}

/// One row of the live snapshot query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveRate {
    pub process: String,
    pub interface: String,
    pub rx_bytes_per_sec: u64,
    pub tx_bytes_per_sec: u64,
}

impl From<(&RateKey, &Rates)> for LiveRate {
    fn from((key, rates): (&RateKey, &Rates)) -> Self {
        Self {
            process: key.process.clone(),
            interface: key.interface.clone(),
            rx_bytes_per_sec: rates.rx_bytes_per_sec,
            tx_bytes_per_sec: rates.tx_bytes_per_sec,
        }
    }
}
