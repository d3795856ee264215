//! # Telemetry
//!
//! Logs always go to the console through `tracing_subscriber::fmt`, filtered
//! by `RUST_LOG` (default `info`). Spans and events emitted by `tally` itself
//! show up here as well.
//!
//! With the `metrics` feature, allocation counters and latencies are recorded
//! through OpenTelemetry and exported to stdout every few seconds:
//!
//! ```bash
//! cargo run -p tally-stress --features metrics
//! ```
//!
//! Without it, the recording helpers below compile to no-ops.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "metrics")]
use opentelemetry::{
    InstrumentationScope, KeyValue,
    metrics::{Counter, Histogram, Meter},
};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::{Resource, metrics as sdkmetrics};
#[cfg(feature = "metrics")]
use opentelemetry_semantic_conventions as semvcns;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

pub struct TelemetryProviders {
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes pending exports. Errors are reported on stderr since the
    /// subscriber may already be gone.
    pub fn shutdown(self) {
        #[cfg(feature = "metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {err:#?}");
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {err:#?}");
            }
        }
    }
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339()),
        );
    registry.try_init()?;

    #[cfg(feature = "metrics")]
    let meter_provider = {
        let provider = init_metrics();
        opentelemetry::global::set_meter_provider(provider.clone());

        let scope = InstrumentationScope::builder("tally-stress")
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_schema_url(semvcns::SCHEMA_URL)
            .build();
        init_metric_handles(opentelemetry::global::meter_with_scope(scope));
        provider
    };

    Ok(TelemetryProviders {
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

#[cfg(feature = "metrics")]
fn init_metrics() -> sdkmetrics::SdkMeterProvider {
    let resource = Resource::builder()
        .with_service_name("tally-stress")
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build();

    let reader = sdkmetrics::PeriodicReader::builder(opentelemetry_stdout::MetricExporter::default())
        .with_interval(std::time::Duration::from_secs(5))
        .build();

    sdkmetrics::SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build()
}

#[cfg(feature = "metrics")]
static IDS_ALLOCATED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static STORE_ERRORS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static ALLOCATION_LATENCY_US: OnceLock<Histogram<f64>> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = IDS_ALLOCATED.set(
        meter
            .u64_counter("ids_allocated")
            .with_description("Ids successfully allocated")
            .build(),
    );

    let _ = STORE_ERRORS.set(
        meter
            .u64_counter("store_errors")
            .with_description("Allocations that failed against the counter store")
            .build(),
    );

    let _ = ALLOCATION_LATENCY_US.set(
        meter
            .f64_histogram("allocation_latency")
            .with_unit("us")
            .with_description("Latency of a single next_id call")
            .build(),
    );
}

#[cfg(feature = "metrics")]
pub fn increment_ids_allocated(entity: &str) {
    if let Some(counter) = IDS_ALLOCATED.get() {
        counter.add(1, &[KeyValue::new("entity", entity.to_owned())]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_ids_allocated(_entity: &str) {}

#[cfg(feature = "metrics")]
pub fn increment_store_errors(entity: &str) {
    if let Some(counter) = STORE_ERRORS.get() {
        counter.add(1, &[KeyValue::new("entity", entity.to_owned())]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_store_errors(_entity: &str) {}

#[cfg(feature = "metrics")]
pub fn record_allocation_latency(latency_us: f64) {
    if let Some(histogram) = ALLOCATION_LATENCY_US.get() {
        histogram.record(latency_us, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_allocation_latency(_latency_us: f64) {}
