use anyhow::Context;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    7878
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_db_path() -> String {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => format!("{}/.local/share/netcheckd/usage.sqlite3", home),
        _ => "data/usage.sqlite3".into(),
    }
}

fn default_max_pool_size() -> u32 {
    4
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_pool_size: default_max_pool_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    /// Seconds between aggregation ticks; also the multiplier applied to rates.
    #[serde(default = "default_bucket_secs")]
    pub bucket_secs: u64,
    /// Interface flagged as the default route. Auto-detected when unset.
    #[serde(default)]
    pub default_interface: Option<String>,
}

fn default_bucket_secs() -> u64 {
    60
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            bucket_secs: default_bucket_secs(),
            default_interface: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_nethogs_bin")]
    pub nethogs_bin: String,
    /// Passed to nethogs as `-d`.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    /// Recover real names for `/proc/self/exe`-style tokens from /proc.
    #[serde(default = "default_true")]
    pub resolve_identity: bool,
    /// Consecutive failed runs tolerated before the collector gives up.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
    #[serde(default = "default_restart_backoff_ms")]
    pub restart_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_nethogs_bin() -> String {
    "/usr/sbin/nethogs".into()
}

fn default_refresh_secs() -> u64 {
    2
}

fn default_true() -> bool {
    true
}

fn default_max_restarts() -> u32 {
    5
}

fn default_restart_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            nethogs_bin: default_nethogs_bin(),
            refresh_secs: default_refresh_secs(),
            resolve_identity: default_true(),
            max_restarts: default_max_restarts(),
            restart_backoff_ms: default_restart_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl CollectorConfig {
    pub fn restart_backoff(&self) -> Duration {
        Duration::from_millis(self.restart_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl AppConfig {
    /// Load from `CONFIG_FILE` (default `config.toml`), then apply environment overrides.
    /// A missing default file means "all defaults"; a missing explicit file is an error.
    pub fn load() -> anyhow::Result<Self> {
        let (path, explicit) = match std::env::var("CONFIG_FILE") {
            Ok(p) => (p, true),
            Err(_) => ("config.toml".to_string(), false),
        };
        let s = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading config file {}", path));
            }
        };
        let mut config: AppConfig = toml::from_str(&s)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests). No env overrides.
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `NETCHECKD_DB`, `NETCHECKD_IFACE`, `NETCHECKD_BUCKET_SECS`, `NETHOGS_BIN`
    /// and `NETHOGS_REFRESH` from `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("NETCHECKD_DB") {
            self.database.path = path;
        }
        if let Some(iface) = lookup("NETCHECKD_IFACE") {
            self.aggregation.default_interface = Some(iface).filter(|s| !s.is_empty());
        }
        if let Some(secs) = lookup("NETCHECKD_BUCKET_SECS") {
            self.aggregation.bucket_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("NETCHECKD_BUCKET_SECS is not an integer: {:?}", secs))?;
        }
        if let Some(bin) = lookup("NETHOGS_BIN") {
            self.collector.nethogs_bin = bin;
        }
        if let Some(secs) = lookup("NETHOGS_REFRESH") {
            self.collector.refresh_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("NETHOGS_REFRESH is not an integer: {:?}", secs))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.aggregation.bucket_secs > 0,
            "aggregation.bucket_secs must be > 0, got {}",
            self.aggregation.bucket_secs
        );
        anyhow::ensure!(
            !self.collector.nethogs_bin.is_empty(),
            "collector.nethogs_bin must be non-empty"
        );
        anyhow::ensure!(
            self.collector.refresh_secs > 0,
            "collector.refresh_secs must be > 0, got {}",
            self.collector.refresh_secs
        );
        anyhow::ensure!(
            self.collector.restart_backoff_ms > 0,
            "collector.restart_backoff_ms must be > 0, got {}",
            self.collector.restart_backoff_ms
        );
        anyhow::ensure!(
            self.collector.max_backoff_ms >= self.collector.restart_backoff_ms,
            "collector.max_backoff_ms must be >= restart_backoff_ms, got {}",
            self.collector.max_backoff_ms
        );
        Ok(())
    }
}
