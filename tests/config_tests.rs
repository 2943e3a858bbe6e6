// Config loading, defaults, env overrides and validation tests

use netcheckd::config::AppConfig;
use std::collections::HashMap;

const VALID_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[database]
path = "data/usage.db"
max_pool_size = 2

[aggregation]
bucket_secs = 30
default_interface = "eth0"

[collector]
nethogs_bin = "/usr/local/sbin/nethogs"
refresh_secs = 5
resolve_identity = false
max_restarts = 3
restart_backoff_ms = 200
max_backoff_ms = 2000
"#;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.database.path, "data/usage.db");
    assert_eq!(config.aggregation.bucket_secs, 30);
    assert_eq!(config.aggregation.default_interface.as_deref(), Some("eth0"));
    assert_eq!(config.collector.nethogs_bin, "/usr/local/sbin/nethogs");
    assert_eq!(config.collector.refresh_secs, 5);
    assert!(!config.collector.resolve_identity);
    assert_eq!(config.collector.max_restarts, 3);
}

#[test]
fn test_config_empty_uses_defaults() {
    let config = AppConfig::load_from_str("").expect("defaults");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 7878);
    assert_eq!(config.aggregation.bucket_secs, 60);
    assert_eq!(config.aggregation.default_interface, None);
    assert_eq!(config.collector.nethogs_bin, "/usr/sbin/nethogs");
    assert_eq!(config.collector.refresh_secs, 2);
    assert!(config.collector.resolve_identity);
    assert!(config.database.path.ends_with("usage.sqlite3"));
}

#[test]
fn test_config_partial_section_keeps_other_defaults() {
    let config = AppConfig::load_from_str("[collector]\nrefresh_secs = 1\n").expect("partial");
    assert_eq!(config.collector.refresh_secs, 1);
    assert_eq!(config.collector.nethogs_bin, "/usr/sbin/nethogs");
    assert_eq!(config.collector.max_backoff_ms, 30_000);
}

#[test]
fn test_env_overrides_apply() {
    let mut config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    config
        .apply_env_overrides(env(&[
            ("NETCHECKD_DB", "/tmp/other.db"),
            ("NETCHECKD_IFACE", "wlan0"),
            ("NETCHECKD_BUCKET_SECS", "15"),
            ("NETHOGS_BIN", "/opt/nethogs"),
            ("NETHOGS_REFRESH", " 3 "),
        ]))
        .unwrap();
    assert_eq!(config.database.path, "/tmp/other.db");
    assert_eq!(config.aggregation.default_interface.as_deref(), Some("wlan0"));
    assert_eq!(config.aggregation.bucket_secs, 15);
    assert_eq!(config.collector.nethogs_bin, "/opt/nethogs");
    assert_eq!(config.collector.refresh_secs, 3);
}

#[test]
fn test_env_empty_iface_means_autodetect() {
    let mut config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    config
        .apply_env_overrides(env(&[("NETCHECKD_IFACE", "")]))
        .unwrap();
    assert_eq!(config.aggregation.default_interface, None);
}

#[test]
fn test_env_override_rejects_non_numeric_refresh() {
    let mut config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    let err = config
        .apply_env_overrides(env(&[("NETHOGS_REFRESH", "fast")]))
        .unwrap_err();
    assert!(err.to_string().contains("NETHOGS_REFRESH"));
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = VALID_CONFIG.replace("port = 8081", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_empty_db_path() {
    let bad = VALID_CONFIG.replace("path = \"data/usage.db\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("database.path"));
}

#[test]
fn test_config_validation_rejects_max_pool_size_zero() {
    let bad = VALID_CONFIG.replace("max_pool_size = 2", "max_pool_size = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_pool_size"));
}

#[test]
fn test_config_validation_rejects_bucket_secs_zero() {
    let bad = VALID_CONFIG.replace("bucket_secs = 30", "bucket_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("bucket_secs"));
}

#[test]
fn test_config_validation_rejects_refresh_secs_zero() {
    let bad = VALID_CONFIG.replace("refresh_secs = 5", "refresh_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("refresh_secs"));
}

#[test]
fn test_config_validation_rejects_empty_nethogs_bin() {
    let bad = VALID_CONFIG.replace("nethogs_bin = \"/usr/local/sbin/nethogs\"", "nethogs_bin = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("nethogs_bin"));
}

#[test]
fn test_config_validation_rejects_backoff_cap_below_base() {
    let bad = VALID_CONFIG.replace("max_backoff_ms = 2000", "max_backoff_ms = 100");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_backoff_ms"));
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let result = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };
    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.aggregation.bucket_secs, 30);
}
