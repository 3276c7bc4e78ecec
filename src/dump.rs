//! Periodic dump of every view to a plain-text file.
//!
//! Each cycle appends, per view, the view name followed by `--`, the
//! rendered snapshot and a `----------` separator, then one
//! `###################` line closing the cycle.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::DumpError;
use crate::observability::views::ViewRegistry;

const VIEW_SEPARATOR: &str = "----------";
const CYCLE_SEPARATOR: &str = "###################";

/// Appends view snapshots to a file; concurrent dumps are serialized.
#[derive(Debug)]
pub struct StatsDumper {
    path: PathBuf,
    views: Arc<ViewRegistry>,
    write_lock: Mutex<()>,
}

impl StatsDumper {
    pub fn new(path: impl Into<PathBuf>, views: Arc<ViewRegistry>) -> Self {
        Self {
            path: path.into(),
            views,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the artifact left by a previous run, if any.
    pub fn reset(&self) -> Result<(), DumpError> {
        let _guard = self.write_lock.lock().unwrap();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.error(source)),
        }
    }

    /// Append one cycle covering every registered view.
    pub fn dump(&self) -> Result<(), DumpError> {
        let _guard = self.write_lock.lock().unwrap();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.error(e))?;
        let mut out = BufWriter::new(file);

        let views = self.views.snapshot();
        for view in &views {
            writeln!(out, "{}--", view.name).map_err(|e| self.error(e))?;
            writeln!(out, "{view}").map_err(|e| self.error(e))?;
            writeln!(out, "{VIEW_SEPARATOR}").map_err(|e| self.error(e))?;
        }
        writeln!(out, "{CYCLE_SEPARATOR}").map_err(|e| self.error(e))?;
        out.flush().map_err(|e| self.error(e))?;

        tracing::debug!(path = %self.path.display(), views = views.len(), "Dumped stats");
        Ok(())
    }

    /// Dump now and then every `period` until shutdown is signalled.
    ///
    /// Each cycle runs on the blocking pool. A failed cycle is logged and the
    /// schedule carries on.
    pub fn spawn_periodic(
        self: Arc<Self>,
        period: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            // The first tick completes immediately.
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let dumper = Arc::clone(&self);
                        match tokio::task::spawn_blocking(move || dumper.dump()).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => tracing::error!(error = %e, "Stats dump failed"),
                            Err(e) => tracing::error!(error = %e, "Stats dump task failed"),
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Stats dumper shutting down");
                        break;
                    }
                }
            }
        })
    }

    fn error(&self, source: io::Error) -> DumpError {
        DumpError {
            path: self.path.clone(),
            source,
        }
    }
}
