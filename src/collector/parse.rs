// nethogs trace-mode line parser.
//
// Record format: `<process>/<pid>/<uid>\t<sent KB/s>\t<recv KB/s>`. The process token may itself
// contain `/` (full executable paths), so pid and uid are split off from the right.

use crate::models::Rates;
use thiserror::Error;

/// Prefix of the banner nethogs prints before each refresh.
pub const REFRESH_MARKER: &str = "Refreshing";

/// Why a line was discarded. Never surfaced beyond trace logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("blank line")]
    Blank,
    #[error("refresh marker")]
    RefreshMarker,
    #[error("no process/pid/uid field")]
    NotARecord,
    #[error("expected 3 tab-separated fields, got {0}")]
    FieldCount(usize),
    #[error("missing pid or uid separator in {0:?}")]
    MissingSeparator(String),
    #[error("invalid pid {0:?}")]
    InvalidPid(String),
    #[error("invalid rate {0:?}")]
    InvalidRate(String),
}

/// One parsed record, before identity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub process: String,
    pub pid: u32,
    pub rates: Rates,
}

pub fn parse_line(line: &str) -> Result<TraceRecord, LineError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(LineError::Blank);
    }
    if line.starts_with(REFRESH_MARKER) {
        return Err(LineError::RefreshMarker);
    }
    if !line.contains('/') {
        return Err(LineError::NotARecord);
    }

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 3 {
        return Err(LineError::FieldCount(fields.len()));
    }

    let (process, pid) = split_process_field(fields[0])?;
    let tx_kbps = parse_rate(fields[1])?;
    let rx_kbps = parse_rate(fields[2])?;

    Ok(TraceRecord {
        process: process.to_string(),
        pid,
        rates: Rates {
            rx_bytes_per_sec: kb_to_bytes(rx_kbps),
            tx_bytes_per_sec: kb_to_bytes(tx_kbps),
        },
    })
}

/// `name/pid/uid` -> (name, pid). Last `/` ends the pid, second-to-last starts it.
fn split_process_field(field: &str) -> Result<(&str, u32), LineError> {
    let missing = || LineError::MissingSeparator(field.to_string());
    let (head, _uid) = field.rsplit_once('/').ok_or_else(missing)?;
    let (process, pid) = head.rsplit_once('/').ok_or_else(missing)?;
    let pid = pid
        .trim()
        .parse::<u32>()
        .map_err(|_| LineError::InvalidPid(pid.to_string()))?;
    Ok((process, pid))
}

fn parse_rate(field: &str) -> Result<f64, LineError> {
    let invalid = || LineError::InvalidRate(field.to_string());
    let value = field.trim().parse::<f64>().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }
    Ok(value)
}

/// KB/s (float) to whole bytes/s, truncated. Saturates at `u64::MAX`.
pub fn kb_to_bytes(kbps: f64) -> u64 {
    (kbps * 1024.0).floor() as u64
}
