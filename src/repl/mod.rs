//! The read-evaluate-print loop.
//!
//! Each iteration prints a prompt, reads a line inside a `readLine` span,
//! uppercases it inside a `processLine` span and echoes the result, all under
//! a parent `readEvaluateProcessLine` span.

pub mod span;

use std::io::{self, BufRead, Write};

use crate::error::ReplError;
use crate::observability::metrics::{Measure, KEY_METHOD};
use crate::observability::recorder::TelemetryRecorder;
use span::traced_span;

/// Prompt printed before every read.
pub const PROMPT: &str = "> ";

/// Result of reading one line.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A line, without its terminator.
    Line(String),
    /// The input is exhausted.
    Eof,
    /// The read failed; the stream may still yield later lines.
    Failed(io::Error),
}

/// How an iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    Processed,
    Eof,
}

/// The uppercasing REPL.
#[derive(Debug, Clone)]
pub struct Repl {
    telemetry: TelemetryRecorder,
}

impl Repl {
    pub fn new(telemetry: TelemetryRecorder) -> Self {
        Self { telemetry }
    }

    /// Read one line inside a `readLine` span.
    ///
    /// End of input and read failures mark the span as failed but are
    /// returned as values, never raised.
    pub fn read_line<R: BufRead + ?Sized>(&self, input: &mut R) -> ReadOutcome {
        let mut span = traced_span!("readLine");

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => {
                span.set_error("end of input");
                ReadOutcome::Eof
            }
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                ReadOutcome::Line(line)
            }
            Err(e) => {
                span.set_error(&e.to_string());
                ReadOutcome::Failed(e)
            }
        }
    }

    /// Uppercase `line` inside a `processLine` span.
    ///
    /// Latency is recorded under `method=processLine` after the span closes.
    pub fn process_line(&self, line: &str) -> String {
        let _timer = self
            .telemetry
            .start_timer(KEY_METHOD, "processLine", Measure::Latency);
        let _span = traced_span!("processLine");
        line.to_uppercase()
    }

    /// Run one full iteration: prompt, read, process, echo, record.
    ///
    /// Line stats are recorded only for a non-empty line. A failed read still
    /// echoes an empty result before the error is returned.
    pub fn read_evaluate_process_line<R, W>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> Result<Iteration, ReplError>
    where
        R: BufRead + ?Sized,
        W: Write + ?Sized,
    {
        let _span = traced_span!("readEvaluateProcessLine");

        output
            .write_all(PROMPT.as_bytes())
            .and_then(|()| output.flush())
            .map_err(ReplError::Write)?;

        let (line, outcome) = match self.read_line(input) {
            ReadOutcome::Line(line) => (line, Ok(Iteration::Processed)),
            ReadOutcome::Eof => (String::new(), Ok(Iteration::Eof)),
            ReadOutcome::Failed(e) => (String::new(), Err(ReplError::Read(e))),
        };

        // Becomes an event on the readEvaluateProcessLine span.
        tracing::info!(len = line.len(), usage = "repl", "Invoking processLine");

        let processed = self.process_line(&line);
        write!(output, "< {processed}\n\n")
            .and_then(|()| output.flush())
            .map_err(ReplError::Write)?;

        if !line.is_empty() {
            self.telemetry.record_stat(Measure::LinesIn, 1.0);
            #[allow(clippy::cast_precision_loss)]
            self.telemetry
                .record_stat(Measure::LineLengths, line.len() as f64);
        }

        outcome
    }

    /// Loop until the input is exhausted.
    ///
    /// Read failures are counted under `method=repl`, reported on stderr and
    /// the loop moves on to the next line. Write failures end the loop.
    pub fn run<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> Result<(), ReplError> {
        loop {
            match self.read_evaluate_process_line(&mut input, &mut output) {
                Ok(Iteration::Processed) => {}
                Ok(Iteration::Eof) => {
                    tracing::info!("End of input");
                    return Ok(());
                }
                Err(e @ ReplError::Read(_)) => {
                    self.telemetry
                        .record_tagged_stat(KEY_METHOD, "repl", Measure::Errors, 1.0);
                    tracing::warn!(error = %e, "REPL iteration failed");
                    eprintln!("Exception {e}");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
