//! replstats: an uppercasing REPL that records stats and traces about itself.
//!
//! # Usage
//!
//! ```bash
//! replstats 5 --metrics-port 8889 --otel-endpoint http://localhost:4317
//! ```
//!
//! The optional positional argument is the stats dump interval in seconds.
//! Environment variables can also be used:
//! - `REPLSTATS_DUMP_INTERVAL`: Stats dump interval in seconds
//! - `REPLSTATS_STATS_FILE`: Stats dump file
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: Span collector endpoint
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use anyhow::Context;
use prometheus::Registry;
use replstats::config::Config;
use replstats::dump::StatsDumper;
use replstats::observability::metrics::register_all_views;
use replstats::observability::prometheus::setup_metrics_exporter;
use replstats::observability::recorder::TelemetryRecorder;
use replstats::observability::tracing::{init_tracing, setup_trace_exporter};
use replstats::repl::Repl;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};

/// Print startup banner with version and configuration.
fn print_banner(config: &Config, metrics_addr: SocketAddr) {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        r#"
  replstats v{}

  Configuration:
    Metrics:     http://{}/metrics
    Spans:       {}
    Stats file:  {} (every {}s)

  Type a line to have it uppercased. Ctrl+D or Ctrl+C to quit.
"#,
        version,
        metrics_addr,
        config.otel_endpoint,
        config.stats_file.display(),
        config.interval
    );
}

/// Resolve when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {
                        tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
                    }
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM, initiating shutdown...");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = ctrl_c.await;
                tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        tracing::info!("Received Ctrl+C, initiating shutdown...");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration from CLI arguments and environment
    let config = Config::parse_args();

    // Trace exporter first so every later span is shipped
    let exporter = match setup_trace_exporter(&config.otel_endpoint, &config.service_name) {
        Ok(exporter) => exporter,
        Err(e) => {
            eprintln!("Failed to create and register trace exporter: {e}");
            return Ok(());
        }
    };
    init_tracing(&config.log_level, Some(exporter.layer()));

    // Views must exist before anything is recorded
    let views = Arc::new(
        register_all_views(&Registry::new()).context("failed to register stats views")?,
    );

    let dumper = Arc::new(StatsDumper::new(&config.stats_file, Arc::clone(&views)));
    if let Err(e) = dumper.reset() {
        tracing::warn!(error = %e, "Failed to remove previous stats file");
    }

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metrics =
        match setup_metrics_exporter(config.metrics_addr(), Arc::clone(&views), shutdown_rx.clone())
            .await
        {
            Ok(server) => server,
            Err(e) => {
                eprintln!("Failed to create and register Prometheus exporter: {e}");
                tokio::task::spawn_blocking(move || exporter.shutdown()).await?;
                return Ok(());
            }
        };

    let dump_task = Arc::clone(&dumper).spawn_periodic(config.dump_interval(), shutdown_rx);

    print_banner(&config, metrics.local_addr);

    // The REPL blocks on stdin, so it gets its own thread. The runtime never
    // waits on it: a pending read must not hold up shutdown.
    let repl = Repl::new(TelemetryRecorder::new(Arc::clone(&views)));
    let (done_tx, done_rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("repl".into())
        .spawn(move || {
            let result = repl.run(io::stdin().lock(), io::stdout().lock());
            let _ = done_tx.send(result);
        })
        .context("failed to spawn REPL thread")?;

    tokio::select! {
        result = done_rx => {
            match result {
                Ok(Ok(())) => tracing::info!("Input closed, shutting down"),
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "REPL failed");
                    eprintln!("Exception {e}");
                }
                Err(_) => tracing::error!("REPL thread exited without reporting"),
            }
        }
        () = shutdown_signal() => {}
    }

    // Signal shutdown and let the background tasks drain
    let _ = shutdown_tx.send(true);
    let _ = dump_task.await;
    let _ = metrics.handle.await;

    // Final dump so the file reflects the whole session
    if let Err(e) = dumper.dump() {
        tracing::error!(error = %e, "Final stats dump failed");
    }

    tokio::task::spawn_blocking(move || exporter.shutdown()).await?;

    tracing::info!("replstats shutdown complete");
    Ok(())
}
