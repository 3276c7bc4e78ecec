//! REPL measures and their views.
//!
//! Key views:
//! - replstats/latency: Distribution of processLine latency, by method
//! - replstats/lines_in: Count of non-empty lines read
//! - replstats/errors: Count of read errors, by method
//! - replstats/line_length: Distribution of line lengths in bytes

use prometheus::Registry;

use crate::error::BootstrapError;
use crate::observability::views::{Aggregation, ViewDefinition, ViewRegistry};

/// Quantities the REPL records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
    /// Latency in milliseconds per REPL step.
    Latency,
    /// Lines read from standard input.
    LinesIn,
    /// Read errors (end of input excluded).
    Errors,
    /// Lengths of lines read, in bytes.
    LineLengths,
}

impl Measure {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Latency => "repl/latency",
            Self::LinesIn => "repl/lines_in",
            Self::Errors => "repl/errors",
            Self::LineLengths => "repl/line_lengths",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::Latency => "ms",
            Self::LinesIn | Self::Errors => "1",
            Self::LineLengths => "By",
        }
    }
}

pub const KEY_METHOD: &str = "method";

pub const LATENCY_VIEW: &str = "replstats/latency";
pub const LINES_IN_VIEW: &str = "replstats/lines_in";
pub const ERRORS_VIEW: &str = "replstats/errors";
pub const LINE_LENGTH_VIEW: &str = "replstats/line_length";

// [>=0ms, >=25ms, >=50ms, >=75ms, >=100ms, >=200ms, >=400ms, >=600ms, >=800ms, >=1s, >=2s, >=4s, >=6s]
const LATENCY_BOUNDARIES_MS: [f64; 13] = [
    0.0, 25.0, 50.0, 75.0, 100.0, 200.0, 400.0, 600.0, 800.0, 1000.0, 2000.0, 4000.0, 6000.0,
];

// [>=0B, >=5B, >=10B, >=20B, >=40B, >=60B, >=80B, >=100B, >=200B, >=400B, >=600B, >=800B, >=1000B]
const LINE_LENGTH_BOUNDARIES: [f64; 13] = [
    0.0, 5.0, 10.0, 20.0, 40.0, 60.0, 80.0, 100.0, 200.0, 400.0, 600.0, 800.0, 1000.0,
];

/// The four REPL views.
pub static VIEWS: [ViewDefinition; 4] = [
    ViewDefinition {
        name: LATENCY_VIEW,
        metric_name: "replstats_latency",
        description: "The distribution of latencies",
        measure: Measure::Latency,
        aggregation: Aggregation::Distribution(&LATENCY_BOUNDARIES_MS),
        columns: &[KEY_METHOD],
    },
    ViewDefinition {
        name: LINES_IN_VIEW,
        metric_name: "replstats_lines_in",
        description: "The number of lines read in from standard input",
        measure: Measure::LinesIn,
        aggregation: Aggregation::Count,
        columns: &[],
    },
    ViewDefinition {
        name: ERRORS_VIEW,
        metric_name: "replstats_errors",
        description: "The number of errors encountered",
        measure: Measure::Errors,
        aggregation: Aggregation::Count,
        columns: &[KEY_METHOD],
    },
    ViewDefinition {
        name: LINE_LENGTH_VIEW,
        metric_name: "replstats_line_length",
        description: "The distribution of line lengths",
        measure: Measure::LineLengths,
        aggregation: Aggregation::Distribution(&LINE_LENGTH_BOUNDARIES),
        columns: &[],
    },
];

/// Register every REPL view in `registry`.
///
/// Must run once, before anything is recorded; a failure here aborts startup.
pub fn register_all_views(registry: &Registry) -> Result<ViewRegistry, BootstrapError> {
    let views = ViewRegistry::register(registry.clone(), &VIEWS)?;
    tracing::info!(views = VIEWS.len(), "Registered stats views");
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_all_views() {
        let views = register_all_views(&Registry::new()).unwrap();

        let names: Vec<&str> = views.snapshot().iter().map(|v| v.name).collect();
        assert_eq!(
            names,
            vec![ERRORS_VIEW, LATENCY_VIEW, LINE_LENGTH_VIEW, LINES_IN_VIEW]
        );
    }

    #[test]
    fn test_second_registration_fails() {
        let registry = Registry::new();
        register_all_views(&registry).unwrap();

        let err = register_all_views(&registry).unwrap_err();
        assert!(matches!(err, BootstrapError::Views(_)));
    }

    #[test]
    fn test_view_columns() {
        let views = register_all_views(&Registry::new()).unwrap();

        assert_eq!(views.view(LATENCY_VIEW).unwrap().columns, ["method"]);
        assert_eq!(views.view(ERRORS_VIEW).unwrap().columns, ["method"]);
        assert!(views.view(LINES_IN_VIEW).unwrap().columns.is_empty());
        assert!(views.view(LINE_LENGTH_VIEW).unwrap().columns.is_empty());
    }

    #[test]
    fn test_views_exposed_under_metric_names() {
        let views = register_all_views(&Registry::new()).unwrap();
        views.record(Measure::LinesIn, 1.0, &[]);
        views.record(Measure::LineLengths, 5.0, &[]);

        let names: Vec<String> = views
            .registry()
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"replstats_lines_in".to_string()));
        assert!(names.contains(&"replstats_line_length".to_string()));
    }
}
