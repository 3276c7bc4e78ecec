//! Configuration parsing for replstats.
//!
//! Supports:
//! - CLI arguments via clap (the dump interval is positional)
//! - Environment variable overrides
//! - Sensible defaults for quick start

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// replstats: an uppercasing REPL that records stats and traces about itself.
#[derive(Parser, Debug, Clone)]
#[command(name = "replstats")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Seconds between stats dumps to the stats file
    #[arg(
        env = "REPLSTATS_DUMP_INTERVAL",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval: u64,

    /// File the periodic stats dump is appended to (deleted at startup)
    #[arg(long, env = "REPLSTATS_STATS_FILE", default_value = "stats.txt")]
    pub stats_file: PathBuf,

    /// Host address for the metrics endpoint
    #[arg(long, env = "REPLSTATS_METRICS_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub metrics_host: IpAddr,

    /// Port for the metrics endpoint
    #[arg(long, env = "REPLSTATS_METRICS_PORT", default_value_t = 8889)]
    pub metrics_port: u16,

    /// OpenTelemetry collector endpoint spans are shipped to
    #[arg(
        long,
        env = "OTEL_EXPORTER_OTLP_ENDPOINT",
        default_value = "http://localhost:4317"
    )]
    pub otel_endpoint: String,

    /// Service name attached to exported spans
    #[arg(long, env = "OTEL_SERVICE_NAME", default_value = "replstats")]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    pub log_level: String,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Stats dump period.
    pub fn dump_interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Address the metrics endpoint binds to.
    pub fn metrics_addr(&self) -> SocketAddr {
        SocketAddr::new(self.metrics_host, self.metrics_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: 30,
            stats_file: PathBuf::from("stats.txt"),
            metrics_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            metrics_port: 8889,
            otel_endpoint: "http://localhost:4317".into(),
            service_name: "replstats".into(),
            log_level: "warn".into(),
        }
    }
}
