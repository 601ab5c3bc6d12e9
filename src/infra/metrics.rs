// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per evaluated epoch so learning curves
// can be plotted across trials.
//
// Output file: {checkpoint_dir}/metrics.csv
//
//   model,epoch,train_loss,train_em,train_f1,dev_loss,dev_em,dev_f1,learning_rate
//   b300_20260101120000_0,1,4.812300,0.102000,0.181000,4.650100,0.121000,0.203000,0.001620
//
// Train columns are NaN for evaluate-only runs.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "model,epoch,train_loss,train_em,train_f1,dev_loss,dev_em,dev_f1,learning_rate";

/// One row of metrics for a single evaluated epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub model_name: String,
    pub epoch:      usize,

    /// Example-weighted mean loss over the training pass
    pub train_loss: f64,
    pub train_em:   f64,
    pub train_f1:   f64,

    pub dev_loss: f64,
    pub dev_em:   f64,
    pub dev_f1:   f64,

    /// Learning rate used during this epoch
    pub learning_rate: f64,
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the logger; writes the header only if the file is new
    /// so several runs can share one CSV.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.model_name,
            m.epoch,
            m.train_loss,
            m.train_em,
            m.train_f1,
            m.dev_loss,
            m.dev_em,
            m.dev_f1,
            m.learning_rate,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: dev_em={:.4}, dev_f1={:.4}",
            m.epoch, m.dev_em, m.dev_f1,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
