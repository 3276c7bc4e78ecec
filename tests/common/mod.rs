//! Test utilities shared by the replstats integration tests.
//!
//! Provides:
//! - A registered view set with a REPL wired to it
//! - A temporary stats file location

#![allow(dead_code)]

use replstats::dump::StatsDumper;
use replstats::observability::metrics::register_all_views;
use replstats::observability::recorder::TelemetryRecorder;
use prometheus::Registry;
use replstats::observability::views::{AggregationData, ViewRegistry};
use replstats::repl::Repl;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Test fixture holding the views, a REPL and a dumper writing to a temp dir.
///
/// The directory is automatically cleaned up when the fixture is dropped.
pub struct TestFixture {
    /// Temporary directory for the stats file
    pub temp_dir: TempDir,
    /// Path to the stats file
    pub stats_path: PathBuf,
    pub views: Arc<ViewRegistry>,
    pub repl: Repl,
    pub dumper: StatsDumper,
}

impl TestFixture {
    /// Register every view and wire a REPL and dumper to them.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let stats_path = temp_dir.path().join("stats.txt");

        let views = Arc::new(
            register_all_views(&Registry::new()).expect("failed to register views"),
        );

        let repl = Repl::new(TelemetryRecorder::new(Arc::clone(&views)));
        let dumper = StatsDumper::new(&stats_path, Arc::clone(&views));

        Self {
            temp_dir,
            stats_path,
            views,
            repl,
            dumper,
        }
    }

    /// Feed `input` through the REPL until it is exhausted; returns stdout.
    pub fn run(&self, input: &str) -> String {
        let mut output = Vec::new();
        self.repl
            .run(input.as_bytes(), &mut output)
            .expect("REPL run failed");
        String::from_utf8(output).expect("REPL output is not UTF-8")
    }

    /// Recordings in `view` for the row with the given tag values.
    pub fn count(&self, view: &str, tags: &[&str]) -> u64 {
        self.views
            .view(view)
            .and_then(|v| v.row(tags).map(AggregationData::count))
            .unwrap_or(0)
    }

    pub fn stats_file(&self) -> String {
        std::fs::read_to_string(&self.stats_path).unwrap_or_default()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
