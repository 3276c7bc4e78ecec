//! Telemetry recording facade used by the REPL.
//!
//! Tags travel in the current `opentelemetry::Context`. A tagged recording
//! attaches a context carrying its tag for the length of that one call; the
//! returned guard restores the previous context however the call exits.

use opentelemetry::{Context, KeyValue};
use std::sync::Arc;
use std::time::Instant;

use crate::observability::metrics::Measure;
use crate::observability::views::ViewRegistry;

/// Tags applied to recordings made while a context carrying them is attached.
#[derive(Debug, Clone, Default)]
struct TagMap(Vec<KeyValue>);

/// Records REPL stats, optionally under a single-tag context.
#[derive(Debug, Clone)]
pub struct TelemetryRecorder {
    views: Arc<ViewRegistry>,
}

impl TelemetryRecorder {
    pub fn new(views: Arc<ViewRegistry>) -> Self {
        Self { views }
    }

    /// Record a value under whatever tags the current context carries.
    pub fn record_stat(&self, measure: Measure, value: f64) {
        let cx = Context::current();
        let tags = cx.get::<TagMap>().map_or(&[][..], |tags| tags.0.as_slice());
        self.views.record(measure, value, tags);
    }

    /// Record a value with `key = tag_value` active for this call only.
    pub fn record_tagged_stat(
        &self,
        key: &'static str,
        tag_value: &str,
        measure: Measure,
        value: f64,
    ) {
        let tags = TagMap(vec![KeyValue::new(key, tag_value.to_string())]);
        let _scope = Context::current_with_value(tags).attach();
        self.record_stat(measure, value);
    }

    /// Start a latency timer that records on drop, whichever way the
    /// enclosing block exits.
    pub fn start_timer(
        &self,
        key: &'static str,
        tag_value: &'static str,
        measure: Measure,
    ) -> LatencyTimer<'_> {
        LatencyTimer {
            recorder: self,
            key,
            tag_value,
            measure,
            start: Instant::now(),
        }
    }

    pub fn views(&self) -> &Arc<ViewRegistry> {
        &self.views
    }
}

/// Records elapsed milliseconds when dropped.
#[derive(Debug)]
pub struct LatencyTimer<'a> {
    recorder: &'a TelemetryRecorder,
    key: &'static str,
    tag_value: &'static str,
    measure: Measure,
    start: Instant,
}

impl Drop for LatencyTimer<'_> {
    fn drop(&mut self) {
        #[allow(clippy::cast_precision_loss)]
        let elapsed_ms = self.start.elapsed().as_nanos() as f64 / 1e6;
        self.recorder
            .record_tagged_stat(self.key, self.tag_value, self.measure, elapsed_ms);
    }
}
