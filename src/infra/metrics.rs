// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records one CSV row per training epoch.
//
// Metrics recorded per epoch:
//   - epoch:    the epoch number (1, 2, 3, ...)
//   - loss:     mean categorical cross-entropy over the epoch
//   - distance: |loss − target loss|
//   - selected: 1 if this epoch became the kept checkpoint
//
// Output file: checkpoints/metrics.csv. Rows go to a hidden temp
// file while training runs; `finish` moves it over metrics.csv
// once the checkpoint is committed. A run that fails never
// replaces the metrics of the checkpoint that is still on disk.
//
// Example CSV output:
//   epoch,loss,distance,selected
//   1,3.412300,3.212300,1
//   2,2.981000,2.781000,1
//   ...
//
// The last row with selected=1 is the epoch that was committed.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::infra::atomic;
use crate::ml::trainer::EpochReport;

const HEADER: &str = "epoch,loss,distance,selected";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,
    pub loss: f64,
    pub distance: f64,
    pub selected: bool,
}

impl From<&EpochReport> for EpochMetrics {
    fn from(r: &EpochReport) -> Self {
        Self {
            epoch: r.epoch + 1,
            loss: r.loss,
            distance: r.distance,
            selected: r.selected,
        }
    }
}

/// Appends epoch metrics to a CSV file that replaces `metrics.csv`
/// on `finish`. Dropped unfinished, it leaves no trace.
pub struct MetricsLogger {
    csv_path: PathBuf,
    temp_path: PathBuf,
}

impl MetricsLogger {
    /// Start a fresh run's CSV in `dir`. The committed `metrics.csv`
    /// is left alone until `finish`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        let temp_path = atomic::temp_path(&csv_path)?;
        let mut f = fs::File::create(&temp_path)
            .with_context(|| format!("Cannot create '{}'", temp_path.display()))?;
        writeln!(f, "{HEADER}")?;
        tracing::debug!("Recording metrics to '{}'", temp_path.display());

        Ok(Self {
            csv_path,
            temp_path,
        })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.temp_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{}",
            m.epoch,
            m.loss,
            m.distance,
            u8::from(m.selected),
        )?;
        Ok(())
    }

    /// Replace `metrics.csv` with this run's rows.
    pub fn finish(self) -> Result<PathBuf> {
        atomic::commit(&self.temp_path, &self.csv_path)
            .with_context(|| format!("Cannot replace '{}'", self.csv_path.display()))?;
        Ok(self.csv_path.clone())
    }
}

impl Drop for MetricsLogger {
    fn drop(&mut self) {
        // gone already after a successful finish
        let _ = fs::remove_file(&self.temp_path);
    }
}
