// ============================================================
// Layer 2 — Evaluate Use Case
// ============================================================
// Scores a saved model on a SQuAD dev file and writes the
// prediction file:
//
//   Step 1: Load resolved RunConfig + vocabulary   (Layer 6)
//   Step 2: Read and encode the dev set            (Layer 4)
//   Step 3: Rebuild the network and load weights   (Layer 5)
//   Step 4: One evaluate pass → EM / F1            (Layer 5)
//   Step 5: Write {qa_id: answer} JSON             (Layer 6)
//
// The saved max lengths are reused so the encoded shapes match
// what the model was trained on.

use std::sync::Arc;

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;

use crate::data::{embedding::EmbeddingMatrix, encoder::encode_corpus, reader::read_corpus};
use crate::domain::traits::{Mode, SpanModel};
use crate::infra::{checkpoint::CheckpointManager, predictions::write_predictions};
use crate::ml::{
    session::{build_span_model, TrainBackend},
    trainer::{run_batches, BatchReport},
};

pub struct EvaluateUseCase {
    checkpoint_dir: String,
    model_name:     String,
    /// Overrides the dev path stored with the checkpoint
    dev_path:       Option<String>,
    pred_path:      Option<String>,
}

impl EvaluateUseCase {
    pub fn new(
        checkpoint_dir: String,
        model_name:     String,
        dev_path:       Option<String>,
        pred_path:      Option<String>,
    ) -> Self {
        Self { checkpoint_dir, model_name, dev_path, pred_path }
    }

    pub fn execute(&self) -> Result<BatchReport> {
        self.execute_on::<TrainBackend>(burn::backend::wgpu::WgpuDevice::default())
    }

    pub fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<BatchReport> {
        let ckpt  = CheckpointManager::new(&self.checkpoint_dir)?;
        let cfg   = ckpt.load_config()?;
        let vocab = ckpt.load_vocabulary()?;

        let dev_path  = self.dev_path.as_deref().unwrap_or(&cfg.dev_path);
        let pred_path = self.pred_path.as_deref().unwrap_or(&cfg.pred_path);

        let corpus = read_corpus(dev_path, &cfg.expected_version)
            .with_context(|| format!("Cannot read dev set '{dev_path}'"))?;
        let (dev, report) = encode_corpus(&corpus, &vocab, cfg.context_maxlen, cfg.question_maxlen)?;
        tracing::info!(
            "Encoded {} dev examples ({} misaligned, {} truncated)",
            report.encoded, report.misaligned, report.truncated
        );

        // Weights come from the checkpoint; the zero table only fixes the shape.
        let placeholder = Arc::new(EmbeddingMatrix::zeros(vocab.len(), cfg.dim_embed_word));
        let mut model   = build_span_model::<B>(&cfg, placeholder, device);
        model.load(&ckpt.model_path(&self.model_name))?;

        let result = run_batches(&mut model, &dev, cfg.batch_size, Mode::Evaluate, cfg.progress_every)?;
        write_predictions(pred_path, &result.predictions)?;

        println!(
            "{}: exact_match={:.2}% f1={:.2}% over {} questions",
            self.model_name,
            result.exact_match * 100.0,
            result.f1 * 100.0,
            result.examples,
        );
        Ok(result)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::BTreeMap, fs};

    use crate::application::config::RunConfig;
    use crate::application::train_use_case::tests::{tiny_config, TestBackend};
    use crate::data::{reader::read_corpus, vocab::build_vocabulary};

    #[test]
    fn test_evaluates_saved_model_and_writes_predictions() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = tiny_config(tmp.path());

        // Checkpoint laid out the way the train command saves it
        let corpus = read_corpus(&cfg.train_path, "1.1").unwrap();
        let built  = build_vocabulary(&corpus, &cfg).unwrap();
        let resolved = RunConfig {
            context_maxlen:  built.context_max_len,
            question_maxlen: built.question_max_len,
            ..cfg.clone()
        };
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir).unwrap();
        ckpt.save_config(&resolved).unwrap();
        ckpt.save_vocabulary(&built.vocab).unwrap();

        let matrix = Arc::new(EmbeddingMatrix::zeros(built.vocab.len(), cfg.dim_embed_word));
        build_span_model::<TestBackend>(&resolved, matrix, Default::default())
            .save(&ckpt.model_path("b12_saved"))
            .unwrap();

        let report = EvaluateUseCase::new(cfg.checkpoint_dir.clone(), "b12_saved".into(), None, None)
            .execute_on::<TestBackend>(Default::default())
            .unwrap();
        assert_eq!(report.examples, 2);
        assert!((0.0..=1.0).contains(&report.f1));

        let preds: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&cfg.pred_path).unwrap()).unwrap();
        assert_eq!(preds.keys().collect::<Vec<_>>(), vec!["q1", "q2"]);
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let use_case = EvaluateUseCase::new(tmp.path().display().to_string(), "nope".into(), None, None);
        assert!(use_case.execute_on::<TestBackend>(Default::default()).is_err());
    }
}
