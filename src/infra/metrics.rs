// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per training epoch:
//
//   epoch,loss,val_loss,seconds
//   1,2.713204,,41.220000
//   2,2.041877,,40.870000
//
// val_loss is empty when training runs without a validation set.
// The file is appended to across runs so learning curves of a
// resumed or repeated run stay in one place.

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Starts at 1
    pub epoch: usize,

    /// Mean training loss over the epoch's batches
    pub loss: f64,

    pub val_loss: Option<f64>,

    /// Wall-clock time of the epoch
    pub seconds: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, loss: f64, val_loss: Option<f64>, seconds: f64) -> Self {
        Self { epoch, loss, val_loss, seconds }
    }

    /// Compares validation loss when present, training loss otherwise.
    pub fn is_improvement(&self, best_loss: f64) -> bool {
        self.val_loss.unwrap_or(self.loss) < best_loss
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,loss,val_loss,seconds")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        let val = m.val_loss.map(|v| format!("{v:.6}")).unwrap_or_default();
        writeln!(f, "{},{:.6},{},{:.6}", m.epoch, m.loss, val, m.seconds)?;
        Ok(())
    }
}
