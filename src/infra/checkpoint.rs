// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores everything needed to rebuild a trained
// span predictor without re-reading the training corpus.
//
// Layout:
//   {checkpoint_dir}/
//     run_config.json        ← resolved RunConfig (max lengths filled in)
//     vocab.json             ← id-ordered token list
//     b300_20260101120000_0.mpk.gz   ← weights of one trial
//     metrics.csv            ← per-epoch metrics (see metrics.rs)
//
// Weights go through Burn's NamedMpkGzFileRecorder at full
// precision (MessagePack + gzip), so a reload is bit-exact.
// Loading fails if the saved architecture does not match.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

use crate::application::config::RunConfig;
use crate::data::vocab::Vocabulary;

const CONFIG_FILE: &str = "run_config.json";
const VOCAB_FILE:  &str = "vocab.json";

/// Owns the checkpoint directory and its file naming.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Weight file stem for a model name (the recorder adds the extension).
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.dir.join(model_name)
    }

    pub fn save_config(&self, cfg: &RunConfig) -> Result<()> {
        self.write_json(CONFIG_FILE, cfg)
    }

    pub fn load_config(&self) -> Result<RunConfig> {
        self.read_json(CONFIG_FILE)
            .context("Make sure you have run 'train' before 'evaluate'")
    }

    pub fn save_vocabulary(&self, vocab: &Vocabulary) -> Result<()> {
        self.write_json(VOCAB_FILE, vocab)
    }

    pub fn load_vocabulary(&self) -> Result<Vocabulary> {
        self.read_json(VOCAB_FILE)
    }

    fn write_json<T: serde::Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.dir.join(file);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<T> {
        let path = self.dir.join(file);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Cannot parse '{}'", path.display()))
    }
}

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Write a module's parameters to `path`.
pub fn save_module<B: Backend, M: Module<B>>(module: &M, path: &Path) -> Result<()> {
    CheckpointRecorder::new()
        .record(module.clone().into_record(), path.to_path_buf())
        .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
    tracing::debug!("Saved weights to '{}'", path.display());
    Ok(())
}

/// Restore parameters saved by `save_module` into `module`.
pub fn load_module<B: Backend, M: Module<B>>(
    module: M,
    path:   &Path,
    device: &B::Device,
) -> Result<M> {
    let record = CheckpointRecorder::new()
        .load(path.to_path_buf(), device)
        .with_context(|| {
            format!("Cannot load checkpoint '{}'. Has this model been saved?", path.display())
        })?;
    Ok(module.load_record(record))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::{Linear, LinearConfig};

    #[test]
    fn test_config_and_vocab_round_trip() {
        let tmp  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path().join("ckpt")).unwrap();

        let cfg = RunConfig { context_maxlen: 17, batch_size: 3, ..RunConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        let back = ckpt.load_config().unwrap();
        assert_eq!(back.context_maxlen, 17);
        assert_eq!(back.batch_size, 3);

        let vocab = Vocabulary::new().extended(["fox".to_string()]);
        ckpt.save_vocabulary(&vocab).unwrap();
        assert_eq!(ckpt.load_vocabulary().unwrap(), vocab);
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let tmp  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path()).unwrap();
        assert!(ckpt.load_config().is_err());
    }

    #[test]
    fn test_module_weights_round_trip() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let saved: Linear<NdArray> = LinearConfig::new(3, 2).init(&device);
        let path = tmp.path().join("linear");
        save_module(&saved, &path).unwrap();

        let fresh: Linear<NdArray> = LinearConfig::new(3, 2).init(&device);
        let loaded = load_module(fresh, &path, &device).unwrap();

        let a: Vec<f32> = saved.weight.val().into_data().convert::<f32>().to_vec().unwrap();
        let b: Vec<f32> = loaded.weight.val().into_data().convert::<f32>().to_vec().unwrap();
        assert_eq!(a, b);
    }
}
