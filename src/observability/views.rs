//! Views over the REPL measures, backed by Prometheus collectors.
//!
//! Count views are `IntCounterVec`s and distribution views are
//! `HistogramVec`s, with the view's tag columns as labels. Snapshots are read
//! back out of the registry with `Registry::gather`, so the dump file, the
//! `/views` page and `/metrics` all see the same aggregation.

use opentelemetry::KeyValue;
use prometheus::proto::MetricFamily;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use serde::Serialize;
use std::fmt;

use crate::now_millis;
use crate::observability::metrics::Measure;

/// How a view reduces the values recorded against its measure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    /// Number of recordings.
    Count,
    /// Histogram over the given upper bucket bounds.
    Distribution(&'static [f64]),
}

impl Aggregation {
    fn kind(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Distribution(_) => "distribution",
        }
    }
}

/// A named aggregation rule over one measure.
#[derive(Debug)]
pub struct ViewDefinition {
    pub name: &'static str,
    /// Name the view is exposed under in the Prometheus registry.
    pub metric_name: &'static str,
    pub description: &'static str,
    pub measure: Measure,
    pub aggregation: Aggregation,
    /// Tag keys used as grouping dimensions.
    pub columns: &'static [&'static str],
}

#[derive(Clone)]
enum ViewCollector {
    Count(IntCounterVec),
    Distribution(HistogramVec),
}

struct RegisteredView {
    definition: &'static ViewDefinition,
    collector: ViewCollector,
}

/// Registered views and the registry their collectors live in.
pub struct ViewRegistry {
    registry: Registry,
    views: Vec<RegisteredView>,
    start_millis: i64,
}

impl fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewRegistry")
            .field(
                "views",
                &self.views.iter().map(|v| v.definition.name).collect::<Vec<_>>(),
            )
            .field("start_millis", &self.start_millis)
            .finish_non_exhaustive()
    }
}

impl ViewRegistry {
    /// Create a collector per definition and register it in `registry`.
    ///
    /// Fails if a definition is invalid or its metric name is already taken
    /// in `registry`.
    pub fn register(
        registry: Registry,
        definitions: &'static [ViewDefinition],
    ) -> Result<Self, prometheus::Error> {
        let mut views = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let collector = match definition.aggregation {
                Aggregation::Count => {
                    let counter = IntCounterVec::new(
                        Opts::new(definition.metric_name, definition.description),
                        definition.columns,
                    )?;
                    registry.register(Box::new(counter.clone()))?;
                    ViewCollector::Count(counter)
                }
                Aggregation::Distribution(bounds) => {
                    let histogram = HistogramVec::new(
                        HistogramOpts::new(definition.metric_name, definition.description)
                            .buckets(bounds.to_vec()),
                        definition.columns,
                    )?;
                    registry.register(Box::new(histogram.clone()))?;
                    ViewCollector::Distribution(histogram)
                }
            };
            views.push(RegisteredView {
                definition,
                collector,
            });
        }

        Ok(Self {
            registry,
            views,
            start_millis: now_millis(),
        })
    }

    /// The registry holding every view's collector.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Merge `value` into every view over `measure`.
    ///
    /// Each column takes its value from `tags`; a missing tag leaves the
    /// label empty.
    pub fn record(&self, measure: Measure, value: f64, tags: &[KeyValue]) {
        for view in self.views.iter().filter(|v| v.definition.measure == measure) {
            let values: Vec<String> = view
                .definition
                .columns
                .iter()
                .map(|column| {
                    tags.iter()
                        .find(|kv| kv.key.as_str() == *column)
                        .map(|kv| kv.value.as_str().into_owned())
                        .unwrap_or_default()
                })
                .collect();
            let labels: Vec<&str> = values.iter().map(String::as_str).collect();

            match &view.collector {
                ViewCollector::Count(counter) => counter.with_label_values(&labels).inc(),
                ViewCollector::Distribution(histogram) => {
                    histogram.with_label_values(&labels).observe(value);
                }
            }
        }
    }

    /// Current state of every view, ordered by view name.
    pub fn snapshot(&self) -> Vec<ViewData> {
        let families = self.registry.gather();
        let end_millis = now_millis();

        let mut snapshot: Vec<ViewData> = self
            .views
            .iter()
            .map(|view| {
                let family = families
                    .iter()
                    .find(|f| f.get_name() == view.definition.metric_name);
                ViewData {
                    name: view.definition.name,
                    description: view.definition.description,
                    measure: view.definition.measure.name(),
                    unit: view.definition.measure.unit(),
                    aggregation: view.definition.aggregation.kind(),
                    columns: view.definition.columns,
                    rows: family.map(|f| rows(view.definition, f)).unwrap_or_default(),
                    start_millis: self.start_millis,
                    end_millis,
                }
            })
            .collect();
        snapshot.sort_by(|a, b| a.name.cmp(&b.name));
        snapshot
    }

    /// Current state of the view called `name`.
    pub fn view(&self, name: &str) -> Option<ViewData> {
        self.snapshot().into_iter().find(|v| v.name == name)
    }
}

fn rows(definition: &ViewDefinition, family: &MetricFamily) -> Vec<Row> {
    family
        .get_metric()
        .iter()
        .map(|metric| {
            let tags = definition
                .columns
                .iter()
                .map(|column| {
                    metric
                        .get_label()
                        .iter()
                        .find(|label| label.get_name() == *column)
                        .map(|label| label.get_value().to_string())
                        .unwrap_or_default()
                })
                .collect();

            let data = match definition.aggregation {
                Aggregation::Count => {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let count = metric.get_counter().get_value() as u64;
                    AggregationData::Count { count }
                }
                Aggregation::Distribution(_) => {
                    let histogram = metric.get_histogram();
                    let count = histogram.get_sample_count();
                    let sum = histogram.get_sample_sum();

                    // Cumulative `le` buckets back to per-bucket counts, plus
                    // the implicit +Inf bucket.
                    let mut bucket_counts = Vec::with_capacity(histogram.get_bucket().len() + 1);
                    let mut previous = 0;
                    for bucket in histogram.get_bucket() {
                        let cumulative = bucket.get_cumulative_count();
                        bucket_counts.push(cumulative.saturating_sub(previous));
                        previous = cumulative;
                    }
                    bucket_counts.push(count.saturating_sub(previous));

                    #[allow(clippy::cast_precision_loss)]
                    let mean = if count == 0 { 0.0 } else { sum / count as f64 };
                    AggregationData::Distribution {
                        count,
                        sum,
                        mean,
                        bucket_counts,
                    }
                }
            };

            Row { tags, data }
        })
        .collect()
}

/// Aggregated value of one view row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AggregationData {
    Count {
        count: u64,
    },
    /// `bucket_counts[i]` holds the values in `(b(i-1), b(i)]`; the last entry
    /// is everything above the final bound.
    Distribution {
        count: u64,
        sum: f64,
        mean: f64,
        bucket_counts: Vec<u64>,
    },
}

impl AggregationData {
    /// Number of values recorded.
    pub fn count(&self) -> u64 {
        match self {
            Self::Count { count } | Self::Distribution { count, .. } => *count,
        }
    }
}

impl fmt::Display for AggregationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count { count } => write!(f, "CountData{{count={count}}}"),
            Self::Distribution {
                count,
                sum,
                mean,
                bucket_counts,
            } => write!(
                f,
                "DistributionData{{count={count}, sum={sum}, mean={mean}, bucketCounts={bucket_counts:?}}}"
            ),
        }
    }
}

/// One row of a view, keyed by its tag column values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    /// Column values in view column order; empty when the tag was absent.
    pub tags: Vec<String>,
    pub data: AggregationData,
}

/// Snapshot of a view's cumulative state since registration.
#[derive(Debug, Clone, Serialize)]
pub struct ViewData {
    pub name: &'static str,
    pub description: &'static str,
    pub measure: &'static str,
    pub unit: &'static str,
    pub aggregation: &'static str,
    pub columns: &'static [&'static str],
    pub rows: Vec<Row>,
    pub start_millis: i64,
    pub end_millis: i64,
}

impl ViewData {
    /// Row matching the given column values, if anything was recorded there.
    pub fn row(&self, tags: &[&str]) -> Option<&AggregationData> {
        self.rows
            .iter()
            .find(|row| row.tags.iter().map(String::as_str).eq(tags.iter().copied()))
            .map(|row| &row.data)
    }
}

impl fmt::Display for ViewData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ViewData{{view={} ({}), measure={} [{}], aggregation={}, columns={:?}, window=[{}, {}]}}",
            self.name,
            self.description,
            self.measure,
            self.unit,
            self.aggregation,
            self.columns,
            self.start_millis,
            self.end_millis
        )?;
        for row in &self.rows {
            write!(f, "\n  {:?} => {}", row.tags, row.data)?;
        }
        Ok(())
    }
}
