//! Error types for the REPL, exporter bootstrap and stats dumping.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by one REPL iteration.
#[derive(Debug, Error)]
pub enum ReplError {
    /// Reading a line failed for a reason other than end of input.
    #[error("failed to read line: {0}")]
    Read(#[source] io::Error),

    /// Writing the prompt or the result failed.
    #[error("failed to write output: {0}")]
    Write(#[source] io::Error),
}

/// Startup failures. Any of these prevents the REPL from starting.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to register trace exporter for {endpoint}: {reason}")]
    TraceExporter { endpoint: String, reason: String },

    #[error("failed to register stats views: {0}")]
    Views(#[from] prometheus::Error),

    #[error("failed to bind metrics listener on {addr}: {source}")]
    MetricsListener {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Failure writing one stats dump cycle.
#[derive(Debug, Error)]
#[error("failed to write stats to {}: {source}", .path.display())]
pub struct DumpError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}
