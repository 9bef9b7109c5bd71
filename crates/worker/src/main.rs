mod host;

use std::sync::Arc;

use cubstars_common::config::AppConfig;
use cubstars_common::store;
use cubstars_engine::worker::{SyncTag, Worker, WorkerEvent, WorkerRuntime};

use crate::host::TracingHost;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cubstars_worker=info,cubstars_engine=info,cubstars_common=info".into()
            }),
        )
        .json()
        .init();

    tracing::info!("Cub Stars parent worker starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Open the settings store (connects on first use)
    let settings = Arc::new(store::open(&config.store_url)?);
    tracing::info!(backend = ?settings, "Settings store configured");

    let worker = Arc::new(Worker::new(settings, Arc::new(TracingHost), &config)?);
    let mut runtime = WorkerRuntime::new(worker);

    runtime.dispatch(WorkerEvent::Install);
    runtime.dispatch(WorkerEvent::Activate);

    let mut ticker = tokio::time::interval(config.sync_interval());

    tracing::info!(
        sync_interval_secs = config.sync_interval_secs,
        "Periodic approval check scheduled"
    );

    // Run until Ctrl+C, then let in-flight events finish
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                runtime.dispatch(WorkerEvent::PeriodicSync(SyncTag::CheckApprovals));
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(
                    in_flight = runtime.in_flight(),
                    "Received shutdown signal, finishing in-flight events..."
                );
                break;
            }
        }
    }

    runtime.drain().await;

    tracing::info!("Cub Stars parent worker stopped.");
    Ok(())
}
