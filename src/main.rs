use anyhow::Result;
use netcheckd::collector::Collector;
use netcheckd::collector::identity::{IdentityResolver, NoopResolver, ProcfsResolver};
use netcheckd::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(name = version::NAME, version = version::VERSION, "starting");

    let usage_repo = Arc::new(
        usage_repo::UsageRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    usage_repo.init().await?;
    tracing::info!(path = %app_config.database.path, "usage store ready");

    let default_interface = app_config
        .aggregation
        .default_interface
        .clone()
        .or_else(host::default_route_interface);
    tracing::info!(default_interface = ?default_interface, "default interface");

    let resolver: Arc<dyn IdentityResolver> = if app_config.collector.resolve_identity {
        Arc::new(ProcfsResolver::new())
    } else {
        Arc::new(NoopResolver)
    };
    let collector = Arc::new(Collector::new(app_config.collector.clone(), resolver));
    let collector_handle = collector.clone().start();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = aggregation_worker::spawn(
        usage_repo.clone(),
        collector.rates(),
        aggregation_worker::AggregationWorkerConfig {
            bucket_secs: app_config.aggregation.bucket_secs,
            default_interface,
        },
        shutdown_rx,
    );

    let query_service = Arc::new(query::QueryService::new(collector.rates(), usage_repo));
    let app = routes::app(query_service, collector.health());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            collector.stop();
            let _ = shutdown_tx.send(());
            let _ = worker_handle.await;
            let _ = collector_handle.await;
        }
    }

    Ok(())
}
