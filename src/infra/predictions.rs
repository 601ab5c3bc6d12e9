// ============================================================
// Layer 6 — Predictions Writer
// ============================================================
// Writes the SQuAD-style prediction file consumed by the
// official evaluation script:  { "<qa id>": "<answer text>", ... }

use anyhow::{Context, Result};
use std::{collections::BTreeMap, fs, path::Path};

pub fn write_predictions(path: impl AsRef<Path>, predictions: &[(String, String)]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let by_id: BTreeMap<&str, &str> = predictions
        .iter()
        .map(|(id, text)| (id.as_str(), text.as_str()))
        .collect();
    let json = serde_json::to_string_pretty(&by_id)?;
    fs::write(path, json)
        .with_context(|| format!("Cannot write predictions to '{}'", path.display()))?;

    tracing::info!("Wrote {} predictions to '{}'", by_id.len(), path.display());
    Ok(())
}
