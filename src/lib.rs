//! replstats: an uppercasing REPL that records stats and traces about itself.
//!
//! Every line read from standard input is echoed back uppercased. Around
//! that, the program records latency, line counts, line lengths and read
//! errors into registered views, traces each step as a span, serves the
//! views for Prometheus scraping and periodically dumps them to a file.
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration
//! - [`dump`]: Periodic stats file dumper
//! - [`error`]: REPL, bootstrap and dump errors
//! - [`observability`]: Measures, views, recording, tracing and exporters
//! - [`repl`]: The read-evaluate-print loop and its spans

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions, // views::ViewRegistry is fine
    clippy::must_use_candidate,      // Not all functions need #[must_use]
    clippy::missing_errors_doc,      // Error docs can be verbose
    clippy::missing_panics_doc       // Lock poisoning panics everywhere
)]

pub mod config;
pub mod dump;
pub mod error;
pub mod observability;
pub mod repl;

/// Get the current Unix timestamp in milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
