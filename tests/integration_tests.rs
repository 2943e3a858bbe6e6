// Integration tests: HTTP query endpoints

mod common;

use axum_test::TestServer;
use chrono::Utc;
use netcheckd::collector::Collector;
use netcheckd::models::{AppUsage, LiveRate, MinuteBucket};
use netcheckd::query::QueryService;
use netcheckd::routes;
use netcheckd::usage_repo::UsageRepo;
use std::sync::Arc;
use tempfile::TempDir;

struct TestApp {
    server: TestServer,
    collector: Arc<Collector>,
    repo: Arc<UsageRepo>,
    _dir: TempDir,
}

async fn test_app() -> TestApp {
    let (dir, repo) = common::temp_repo().await;
    let collector = common::collector();
    let query = Arc::new(QueryService::new(collector.rates(), repo.clone()));
    let app = routes::app(query, collector.health());
    TestApp {
        server: TestServer::new(app),
        collector,
        repo,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_ping_endpoint() {
    let app = test_app().await;
    let response = app.server.get("/ping").await;
    response.assert_status_ok();
    response.assert_text("ok");
}

#[tokio::test]
async fn test_live_endpoint() {
    let app = test_app().await;
    let empty: Vec<LiveRate> = app.server.get("/live").await.json();
    assert!(empty.is_empty());

    app.collector.ingest_line("firefox/77/0\t0.5\t4");
    let response = app.server.get("/live").await;
    response.assert_status_ok();
    let live: Vec<LiveRate> = response.json();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].process, "firefox");
    assert_eq!(live[0].rx_bytes_per_sec, 4096);
    assert_eq!(live[0].tx_bytes_per_sec, 512);
}

#[tokio::test]
async fn test_top_endpoint() {
    let app = test_app().await;
    let bucket = MinuteBucket::containing(Utc::now());
    app.repo
        .record_app_minutes(
            bucket,
            &[
                common::minute("curl", 1, 1),
                common::minute("chromium-browser", 50, 50),
                common::minute("git", 5, 5),
            ],
            None,
        )
        .await
        .unwrap();

    // No period: the 24h lookback.
    let response = app.server.get("/top").await;
    response.assert_status_ok();
    let top: Vec<AppUsage> = response.json();
    let names: Vec<_> = top.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["chrome", "git", "curl"]);

    let limited: Vec<AppUsage> = app
        .server
        .get("/top")
        .add_query_param("period", "day")
        .add_query_param("limit", "1")
        .await
        .json();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].name, "chrome");

    // Unparseable limit falls back to the default.
    let fallback: Vec<AppUsage> = app
        .server
        .get("/top")
        .add_query_param("limit", "lots")
        .await
        .json();
    assert_eq!(fallback.len(), 3);
}

#[tokio::test]
async fn test_totals_endpoint() {
    let app = test_app().await;
    let response = app.server.get("/totals").add_query_param("period", "month").await;
    response.assert_status_ok();
    response.assert_text("0,0");

    app.repo
        .record_app_minutes(
            MinuteBucket::containing(Utc::now()),
            &[common::minute("a", 10, 20), common::minute("b", 1, 2)],
            None,
        )
        .await
        .unwrap();
    let response = app.server.get("/totals").await;
    response.assert_text("11,22");
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app().await;
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json.get("name").and_then(|v| v.as_str()), Some("netcheckd"));
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
    assert_eq!(json["collector"]["state"], "starting");
    assert_eq!(json["collector"]["restarts"], 0);
}

#[tokio::test]
async fn test_health_reports_stopped_collector() {
    let app = test_app().await;
    app.collector.stop();
    app.collector.clone().start().await.unwrap();
    let json: serde_json::Value = app.server.get("/health").await.json();
    assert_eq!(json["collector"]["state"], "stopped");
}
