//! OpenTelemetry observability infrastructure.
//!
//! Provides:
//! - The REPL's measures and views, backed by Prometheus collectors
//! - A recording facade with context-scoped tags and latency timers
//! - Structured tracing with OpenTelemetry export
//! - HTTP endpoints for Prometheus scraping

pub mod metrics;
pub mod prometheus;
pub mod recorder;
pub mod tracing;
pub mod views;
