// ============================================================
// Layer 6 — Validation Log
// ============================================================
// Append-only, human-readable record of every trial:
//
//   b412_20260101120000_0 | lr=0.001620 rnn_cell=100 batch=32 embed=300 | best em=0.6120 f1=0.7133 epoch=7 | early_stop=no
//
// One line per trial; earlier runs are never rewritten.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    pub model_name:     String,
    pub learning_rate:  f64,
    pub dim_rnn_cell:   usize,
    pub batch_size:     usize,
    pub dim_embed_word: usize,
    pub best_em:        f64,
    pub best_f1:        f64,
    pub best_epoch:     usize,
    pub stopped_early:  bool,
}

impl TrialRecord {
    fn line(&self) -> String {
        format!(
            "{} | lr={:.6} rnn_cell={} batch={} embed={} | best em={:.4} f1={:.4} epoch={} | early_stop={}",
            self.model_name,
            self.learning_rate,
            self.dim_rnn_cell,
            self.batch_size,
            self.dim_embed_word,
            self.best_em,
            self.best_f1,
            self.best_epoch,
            if self.stopped_early { "yes" } else { "no" },
        )
    }
}

pub struct ValidationLog {
    path: PathBuf,
}

impl ValidationLog {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &TrialRecord) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Cannot open validation log '{}'", self.path.display()))?;
        writeln!(f, "{}", record.line())?;
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> TrialRecord {
        TrialRecord {
            model_name:     name.into(),
            learning_rate:  0.00162,
            dim_rnn_cell:   100,
            batch_size:     32,
            dim_embed_word: 300,
            best_em:        0.5,
            best_f1:        0.75,
            best_epoch:     3,
            stopped_early:  true,
        }
    }

    #[test]
    fn test_records_are_appended() {
        let tmp = tempfile::tempdir().unwrap();
        let log = ValidationLog::new(tmp.path().join("result").join("validation.txt")).unwrap();
        log.append(&record("b10_a_0")).unwrap();
        log.append(&record("b10_a_1")).unwrap();

        let text = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "b10_a_0 | lr=0.001620 rnn_cell=100 batch=32 embed=300 | best em=0.5000 f1=0.7500 epoch=3 | early_stop=yes"
        );
        assert!(lines[1].starts_with("b10_a_1 |"));
    }
}
