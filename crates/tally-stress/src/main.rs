//! Load generator for `tally` sequences.
//!
//! Spawns many concurrent callers that allocate ids from a shared in-memory
//! counter store through a single [`IdAllocator`], then verifies that no
//! counter ever issued the same id twice. Every store call is bounded by a
//! [`TimeoutStore`]. Press Ctrl+C to stop early; the ids issued so far are
//! still verified.

mod config;
mod telemetry;
mod workload;

use clap::Parser;
use config::{CliArgs, StressConfig};
use std::sync::Arc;
use tally::{IdAllocator, MemoryCounterStore, TimeoutStore};
use telemetry::init_telemetry;
use tokio::signal;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = StressConfig::try_from(args)?;

    let providers = init_telemetry()?;
    log_startup_info(&config);

    let memory = MemoryCounterStore::new();
    let store = TimeoutStore::new(memory.clone(), config.store_timeout);
    let allocator = Arc::new(IdAllocator::new(store, config.registry.clone()));

    let token = CancellationToken::new();
    tokio::spawn(shutdown_signal(token.clone()));

    let result = workload::run(&config, allocator, token).await;

    match &result {
        Ok(report) => {
            let rate =
                report.total_issued() as f64 / report.elapsed.as_secs_f64().max(f64::EPSILON);
            tracing::info!(
                issued = report.total_issued(),
                failures = report.failures,
                cancelled = report.cancelled,
                "Finished in {:?} ({rate:.0} ids/s), no duplicates",
                report.elapsed
            );
            for (counter, issued) in &report.issued {
                tracing::info!("{counter}: {issued} ids");
            }
            for entity in &config.entities {
                if let Some(generator) = config.registry.get(entity) {
                    if let Some(record) = memory.get(generator.collection(), generator.key()) {
                        tracing::debug!(
                            entity = entity.as_str(),
                            current_value = record.current_value,
                            "final counter"
                        );
                    }
                }
            }
        }
        Err(err) => tracing::error!("Stress run failed: {err:#}"),
    }

    providers.shutdown();
    result.map(|_| ())
}

fn log_startup_info(config: &StressConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting stress run with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting stress run with {} callers x {} ids over {} entities",
            config.concurrency,
            config.ids_per_task,
            config.entities.len()
        );
    }
}

async fn shutdown_signal(token: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Stopping callers, verifying ids issued so far...");
    token.cancel();
}
