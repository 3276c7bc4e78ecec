//! OpenTelemetry tracing setup.
//!
//! Configures structured logging with:
//! - Console logging to stderr (stdout carries the REPL)
//! - OTLP exporter shipping every span to a collector

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Config as TraceConfig, Sampler, Tracer, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::error::BootstrapError;

/// Instrumentation scope name for exported spans.
const TRACER_NAME: &str = "replstats";

/// Installed span exporter.
///
/// Keep it alive for the life of the process and call [`TraceExporter::shutdown`]
/// before exiting so buffered spans reach the collector.
#[derive(Debug)]
pub struct TraceExporter {
    provider: TracerProvider,
}

/// Configure always-on sampling and register an OTLP span exporter.
///
/// Must be called from within a Tokio runtime; spans are exported in batches
/// on that runtime.
pub fn setup_trace_exporter(
    endpoint: &str,
    service_name: &str,
) -> Result<TraceExporter, BootstrapError> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint);

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            TraceConfig::default()
                // For a demo, sample everything.
                .with_sampler(Sampler::AlwaysOn)
                .with_resource(Resource::new(vec![KeyValue::new(
                    "service.name",
                    service_name.to_string(),
                )])),
        )
        .install_batch(runtime::Tokio)
        .map_err(|e| BootstrapError::TraceExporter {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

    global::set_tracer_provider(provider.clone());

    Ok(TraceExporter { provider })
}

impl TraceExporter {
    /// Layer bridging `tracing` spans into OpenTelemetry spans.
    pub fn layer(&self) -> OpenTelemetryLayer<Registry, Tracer> {
        tracing_opentelemetry::layer().with_tracer(self.provider.tracer(TRACER_NAME))
    }

    /// Flush buffered spans and uninstall the global provider.
    ///
    /// Blocks until the exporter has drained; call it off the async workers.
    pub fn shutdown(self) {
        for result in self.provider.force_flush() {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Failed to flush spans");
            }
        }
        global::shutdown_tracer_provider();
    }
}

/// Initialize logging, optionally with an OpenTelemetry layer.
///
/// This sets up:
/// - Console logging with structured format, on stderr
/// - Environment-based filter (via RUST_LOG), falling back to `log_level`
///
/// The filter applies to console output only; `telemetry` sees every span.
///
/// # Panics
///
/// Panics if tracing has already been initialized.
pub fn init_tracing<L>(log_level: &str, telemetry: Option<L>)
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(telemetry)
        .with(fmt_layer)
        .init();

    tracing::info!(log_level, "Tracing initialized");
}

/// Initialize tracing for tests (only logs errors).
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("error")
        .with_test_writer()
        .try_init();
}
