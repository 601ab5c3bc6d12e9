// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate RunConfig             (Layer 2)
//   Step 2: Read train / dev SQuAD files   (Layer 4 - data)
//   Step 3: Build vocabulary + max lengths (Layer 4 - data)
//   Step 4: Load pretrained embeddings     (Layer 4 - data)
//   Step 5: Encode train / dev examples    (Layer 4 - data)
//   Step 6: Save resolved config + vocab   (Layer 6 - infra)
//   Step 7: Run trials                     (Layer 5 - ml)
//             fresh model per trial → run_trial → validation log
//
// Vocabulary and embeddings are built once and shared read-only
// by every trial. A trial's model is dropped before the next
// trial builds its own.
//
// Reference: Burn Book §5 (Training)

use std::sync::Arc;

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use rand::{rngs::StdRng, SeedableRng};

use crate::application::{
    config::RunConfig,
    sampling::{model_name, sample_parameters},
};
use crate::data::{
    embedding::{load_embeddings, EmbeddingOptions},
    encoder::encode_corpus,
    reader::read_corpus,
    vocab::build_vocabulary,
};
use crate::domain::traits::SpanModel;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    validation_log::{TrialRecord, ValidationLog},
};
use crate::ml::{
    session::{build_span_model, TrainBackend},
    trainer::{run_trial, TrialOutputs},
};

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: RunConfig,
}

impl TrainUseCase {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Run every trial on the default WGPU device.
    pub fn execute(&self) -> Result<Vec<TrialRecord>> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        self.execute_on::<TrainBackend>(device)
    }

    pub fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<Vec<TrialRecord>> {
        let cfg = &self.config;

        // ── Step 1: Validate before touching any data ─────────────────────────
        cfg.validate()?;

        // ── Step 2: Read SQuAD files ──────────────────────────────────────────
        let train_corpus = read_corpus(&cfg.train_path, &cfg.expected_version)
            .with_context(|| format!("Cannot read training set '{}'", cfg.train_path))?;
        let dev_corpus = read_corpus(&cfg.dev_path, &cfg.expected_version)
            .with_context(|| format!("Cannot read dev set '{}'", cfg.dev_path))?;
        tracing::info!(
            "Read {} train / {} dev questions",
            train_corpus.qa_count(),
            dev_corpus.qa_count()
        );

        // ── Step 3: Vocabulary from the training corpus only ──────────────────
        let built = build_vocabulary(&train_corpus, cfg)?;

        // ── Step 4: Pretrained vectors ────────────────────────────────────────
        let (matrix, vocab, emb_report) = load_embeddings(
            built.vocab,
            &cfg.glove_path,
            EmbeddingOptions {
                dim:      cfg.dim_embed_word,
                oov:      cfg.oov_policy,
                fallback: cfg.fallback_init,
                seed:     cfg.seed,
            },
        )?;
        tracing::info!(
            "Embeddings: {} usable lines, {} malformed, {} matched, {} fallback, {} added",
            emb_report.usable, emb_report.malformed, emb_report.matched,
            emb_report.fallback, emb_report.added,
        );
        let embeddings = Arc::new(matrix);

        // ── Step 5: Encode ────────────────────────────────────────────────────
        let (train, train_report) =
            encode_corpus(&train_corpus, &vocab, built.context_max_len, built.question_max_len)?;
        let (dev, dev_report) =
            encode_corpus(&dev_corpus, &vocab, built.context_max_len, built.question_max_len)?;
        tracing::info!(
            "Encoded {} train ({} misaligned, {} truncated), {} dev ({} misaligned, {} truncated)",
            train_report.encoded, train_report.misaligned, train_report.truncated,
            dev_report.encoded, dev_report.misaligned, dev_report.truncated,
        );
        if dev.is_empty() {
            anyhow::bail!("No usable dev examples in '{}'", cfg.dev_path);
        }

        // ── Step 6: Resolved config + vocabulary for `evaluate` ───────────────
        let resolved = RunConfig {
            context_maxlen:  built.context_max_len,
            question_maxlen: built.question_max_len,
            ..cfg.clone()
        };
        let ckpt    = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let metrics = MetricsLogger::new(ckpt.dir())?;
        let log     = ValidationLog::new(&cfg.validation_path)?;
        if cfg.save {
            ckpt.save_config(&resolved)?;
            ckpt.save_vocabulary(&vocab)?;
        }

        // ── Step 7: Trials ────────────────────────────────────────────────────
        let mut rng     = StdRng::seed_from_u64(cfg.seed);
        let mut records = Vec::new();

        for trial in 0..cfg.validation_cnt {
            let mut params = if cfg.sample_params {
                sample_parameters(&resolved, &mut rng)
            } else {
                resolved.clone()
            };
            params.seed = cfg.seed.wrapping_add(trial as u64);
            let name = model_name(&params, built.context_max_len, trial);

            println!("\n=== Trial {} / {}: {} (lr={:.6}) ===", trial + 1, cfg.validation_cnt, name, params.learning_rate);
            tracing::debug!("Trial parameters: {:#?}", params);

            let outcome = {
                let mut model = build_span_model::<B>(&params, Arc::clone(&embeddings), device.clone());
                if params.load {
                    model.load(&ckpt.model_path(&params.load_name))?;
                }
                let outputs = TrialOutputs {
                    save_path: params.save.then(|| ckpt.model_path(&name)),
                    metrics:   Some(&metrics),
                };
                run_trial(&mut model, &params, &name, &train, &dev, &outputs)?
            };

            let record = TrialRecord {
                model_name:     name,
                learning_rate:  params.learning_rate,
                dim_rnn_cell:   params.dim_rnn_cell,
                batch_size:     params.batch_size,
                dim_embed_word: params.dim_embed_word,
                best_em:        outcome.best_em,
                best_f1:        outcome.best_f1,
                best_epoch:     outcome.best_epoch,
                stopped_early:  outcome.stopped_early,
            };
            log.append(&record)?;
            tracing::info!(
                "Trial {} done: best em={:.4} f1={:.4} at epoch {}",
                record.model_name, record.best_em, record.best_f1, record.best_epoch
            );
            records.push(record);

            if !cfg.sample_params {
                break;
            }
        }

        Ok(records)
    }
}
