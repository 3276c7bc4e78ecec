//! Scoped spans for traced REPL operations.

use tracing::span::EnteredSpan;
use tracing::Span;

/// Open an INFO span with OpenTelemetry status fields and enter it.
///
/// The span is exited and closed when the returned [`TracedSpan`] drops.
macro_rules! traced_span {
    ($name:literal) => {
        $crate::repl::span::TracedSpan::enter(tracing::info_span!(
            $name,
            otel.status_code = tracing::field::Empty,
            otel.status_message = tracing::field::Empty
        ))
    };
}
pub(crate) use traced_span;

/// An entered span whose status can be set to error once.
#[derive(Debug)]
pub struct TracedSpan {
    span: EnteredSpan,
    status_set: bool,
}

impl TracedSpan {
    pub fn enter(span: Span) -> Self {
        Self {
            span: span.entered(),
            status_set: false,
        }
    }

    /// Mark the span as failed with `description`.
    ///
    /// Only the first call per span takes effect; returns whether this call
    /// set the status.
    pub fn set_error(&mut self, description: &str) -> bool {
        if self.status_set {
            tracing::debug!(description, "Span status already set, ignoring");
            return false;
        }
        self.span.record("otel.status_code", "ERROR");
        self.span.record("otel.status_message", description);
        self.status_set = true;
        true
    }
}
