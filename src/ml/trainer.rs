// ============================================================
// Layer 5 — Batching Loop and Trial Runner
// ============================================================
// run_batches: one pass over a set of encoded examples.
//
//   examples ─► contiguous chunks of batch_size (last may be short)
//            ─► model.step(batch, mode)   → loss + logits
//            ─► predicted_span per row    → token span
//            ─► span text vs gold answers → EM / F1 (max over refs)
//
// Metrics are averaged over EXAMPLES, so a short final batch
// weighs exactly its size. Loss is batch-size weighted too.
//
// run_trial: the epoch loop of one trial. Trains, evaluates the
// dev set every test_epoch epochs, lets the EpochController
// decide on decay / stop, saves on improvement, and resets the
// model at the end.
//
// Reference: Burn Book §5, Rajpurkar et al. (2016) SQuAD metrics

use std::{path::PathBuf, time::Instant};

use anyhow::Result;

use crate::application::config::RunConfig;
use crate::domain::{
    error::QaError,
    example::EncodedExample,
    scoring::{exact_match_score, max_over_references, predicted_span, token_f1},
    traits::{Mode, SpanModel},
};
use crate::infra::{
    metrics::{EpochMetrics, MetricsLogger},
    progress::progress_bar,
};
use crate::ml::controller::{Decision, EarlyStopPolicy, EpochController};

/// Result of one pass over a set of examples.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub examples:    usize,
    pub batches:     usize,
    /// Example-weighted mean loss
    pub loss:        f64,
    pub exact_match: f64,
    pub f1:          f64,
    /// (qa id, predicted text); filled in evaluate mode only
    pub predictions: Vec<(String, String)>,
}

pub fn run_batches<M: SpanModel + ?Sized>(
    model:          &mut M,
    examples:       &[EncodedExample],
    batch_size:     usize,
    mode:           Mode,
    progress_every: usize,
) -> Result<BatchReport> {
    if batch_size == 0 {
        return Err(QaError::Configuration("batch_size must be greater than zero".into()).into());
    }

    let total_batches = examples.len().div_ceil(batch_size);
    let mut report    = BatchReport::default();
    let mut loss_sum  = 0.0f64;
    let mut em_sum    = 0.0f64;
    let mut f1_sum    = 0.0f64;

    for (batch_idx, batch) in examples.chunks(batch_size).enumerate() {
        let out = model.step(batch, mode)?;
        if out.start_logits.len() != batch.len() || out.end_logits.len() != batch.len() {
            return Err(QaError::Model(format!(
                "model returned {}/{} logit rows for a batch of {}",
                out.start_logits.len(),
                out.end_logits.len(),
                batch.len()
            ))
            .into());
        }

        for (ex, (start_logits, end_logits)) in batch
            .iter()
            .zip(out.start_logits.iter().zip(&out.end_logits))
        {
            let (start, end) = predicted_span(start_logits, end_logits, ex.context_len);
            let text = ex.span_text(start, end);
            em_sum += max_over_references(exact_match_score, &text, &ex.gold_answers)?;
            f1_sum += max_over_references(token_f1, &text, &ex.gold_answers)?;
            if mode == Mode::Evaluate {
                report.predictions.push((ex.qa_id.clone(), text));
            }
        }

        loss_sum        += out.loss * batch.len() as f64;
        report.examples += batch.len();
        report.batches  += 1;

        if (batch_idx + 1) % progress_every.max(1) == 0 || batch_idx + 1 == total_batches {
            let seen = report.examples as f64;
            tracing::info!(
                "{:?} {} loss: {:.3}, em: {:.3}, f1: {:.3}",
                mode,
                progress_bar(report.batches as f64 / total_batches as f64),
                loss_sum / seen,
                em_sum / seen,
                f1_sum / seen,
            );
        }
    }

    if report.examples > 0 {
        let n = report.examples as f64;
        report.loss        = loss_sum / n;
        report.exact_match = em_sum / n;
        report.f1          = f1_sum / n;
    }
    Ok(report)
}

/// Where a trial writes its side outputs.
#[derive(Default)]
pub struct TrialOutputs<'a> {
    /// Weights are written here on every improvement; None disables saving
    pub save_path: Option<PathBuf>,
    pub metrics:   Option<&'a MetricsLogger>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    pub best_em:       f64,
    pub best_f1:       f64,
    pub best_epoch:    usize,
    pub stopped_early: bool,
    pub final_lr:      f64,
    pub epochs_run:    usize,
}

/// Run the epoch loop of one trial and reset the model afterwards.
pub fn run_trial<M: SpanModel + ?Sized>(
    model:      &mut M,
    cfg:        &RunConfig,
    model_name: &str,
    train:      &[EncodedExample],
    dev:        &[EncodedExample],
    outputs:    &TrialOutputs<'_>,
) -> Result<TrialOutcome> {
    let mut controller = EpochController::new(cfg.learning_rate, EarlyStopPolicy::from_config(cfg));
    let mut epochs_run = 0usize;

    for epoch in 1..=cfg.train_epoch {
        let lr = controller.learning_rate();
        model.set_learning_rate(lr);
        epochs_run = epoch;

        // ── Training phase ────────────────────────────────────────────────────
        let train_report = if cfg.train {
            println!("\n[Epoch {epoch}] {model_name} lr={lr:.6}");
            let started = Instant::now();
            let report  = run_batches(model, train, cfg.batch_size, Mode::Train, cfg.progress_every)?;
            tracing::info!("Epoch {} trained on {} examples in {:.1?}", epoch, report.examples, started.elapsed());
            Some(report)
        } else {
            None
        };

        if cfg.train && epoch % cfg.test_epoch != 0 {
            continue;
        }

        // ── Evaluation phase ──────────────────────────────────────────────────
        let dev_report = run_batches(model, dev, cfg.batch_size, Mode::Evaluate, cfg.progress_every)?;
        let decision   = controller.observe(epoch, dev_report.exact_match, dev_report.f1);

        match decision {
            Decision::Improved => {
                if let Some(path) = outputs.save_path.as_deref() {
                    model.save(path)?;
                    tracing::info!("Improved; saved '{}'", path.display());
                }
            }
            Decision::Unchanged => {}
            Decision::Decayed { from, to } => {
                println!("Learning rate decayed {from:.6} → {to:.6}");
            }
            Decision::Stop { .. } => {
                println!("Early stopping at epoch {epoch}");
            }
        }

        let best = controller.run_state();
        let (train_loss, train_em, train_f1) = train_report
            .as_ref()
            .map_or((f64::NAN, f64::NAN, f64::NAN), |r| (r.loss, r.exact_match, r.f1));

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | dev_loss={:.4} | dev_em={:.1}% | dev_f1={:.1}% | best_f1={:.1}% (epoch {})",
            epoch, cfg.train_epoch, train_loss, dev_report.loss,
            dev_report.exact_match * 100.0, dev_report.f1 * 100.0,
            best.best_f1 * 100.0, best.best_epoch,
        );

        if let Some(logger) = outputs.metrics {
            logger.log(&EpochMetrics {
                model_name:    model_name.to_string(),
                epoch,
                train_loss,
                train_em,
                train_f1,
                dev_loss:      dev_report.loss,
                dev_em:        dev_report.exact_match,
                dev_f1:        dev_report.f1,
                learning_rate: lr,
            })?;
        }

        // Without training every further evaluation is identical.
        if controller.is_stopped() || !cfg.train {
            break;
        }
    }

    let run = controller.run_state();
    let outcome = TrialOutcome {
        best_em:       run.best_em,
        best_f1:       run.best_f1,
        best_epoch:    run.best_epoch,
        stopped_early: controller.is_stopped(),
        final_lr:      run.learning_rate,
        epochs_run,
    };

    model.reset();
    Ok(outcome)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::path::{Path, PathBuf};

    use crate::application::config::RunConfig;
    use crate::data::{encoder::encode_corpus, vocab::build_vocabulary};
    use crate::domain::squad::{Answer, Article, Corpus, Paragraph, Qa};
    use crate::domain::traits::StepOutput;

    /// Puts a peak on the gold span, or on a fixed wrong span.
    #[derive(Default)]
    struct StubModel {
        wrong:       bool,
        batch_sizes: Vec<usize>,
        modes:       Vec<Mode>,
        lrs:         Vec<f64>,
        saves:       Cell<usize>,
        resets:      usize,
        short_rows:  bool,
        /// dev F1 is scripted through which examples get the gold span
        gold_every:  Vec<bool>,
        evals:       usize,
    }

    impl SpanModel for StubModel {
        fn step(&mut self, batch: &[EncodedExample], mode: Mode) -> Result<StepOutput> {
            self.batch_sizes.push(batch.len());
            self.modes.push(mode);
            let hit = if mode == Mode::Evaluate {
                let hit = self.gold_every.get(self.evals).copied().unwrap_or(!self.wrong);
                self.evals += 1;
                hit
            } else {
                !self.wrong
            };

            let rows = if self.short_rows { batch.len() - 1 } else { batch.len() };
            let mut out = StepOutput { loss: 1.0, ..Default::default() };
            for ex in &batch[..rows] {
                let width = ex.context_ids.len();
                let (s, e) = if hit { (ex.answer_start, ex.answer_end) } else { (0, 0) };
                let mut start = vec![0.0f32; width];
                let mut end   = vec![0.0f32; width];
                start[s] = 5.0;
                end[e]   = 5.0;
                out.start_logits.push(start);
                out.end_logits.push(end);
            }
            Ok(out)
        }

        fn set_learning_rate(&mut self, lr: f64) {
            self.lrs.push(lr);
        }

        fn save(&self, _path: &Path) -> Result<()> {
            self.saves.set(self.saves.get() + 1);
            Ok(())
        }

        fn load(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    fn fox_examples() -> Vec<EncodedExample> {
        let corpus = Corpus::new(vec![Article {
            title: "fox".into(),
            paragraphs: vec![Paragraph {
                context: "The quick brown fox".into(),
                qas: vec![Qa {
                    id:       "q1".into(),
                    question: "What color?".into(),
                    answers:  vec![Answer::new("brown", 10)],
                }],
            }],
        }]);
        let built = build_vocabulary(&corpus, &RunConfig::default()).unwrap();
        let (examples, report) =
            encode_corpus(&corpus, &built.vocab, built.context_max_len, built.question_max_len).unwrap();
        assert_eq!(report.encoded, 1);
        examples
    }

    fn synthetic(n: usize) -> Vec<EncodedExample> {
        (0..n)
            .map(|i| EncodedExample {
                qa_id:          format!("q{i}"),
                context_ids:    vec![2, 3, 4, 0],
                context_len:    3,
                question_ids:   vec![5, 0],
                question_len:   1,
                answer_start:   1,
                answer_end:     2,
                context_tokens: vec!["the".into(), "cat".into(), "sat".into()].into(),
                gold_answers:   vec!["cat sat".into()],
            })
            .collect()
    }

    #[test]
    fn test_fox_end_to_end_scores_perfectly() {
        let examples = fox_examples();
        assert_eq!((examples[0].answer_start, examples[0].answer_end), (2, 2));

        let mut model = StubModel::default();
        let report = run_batches(&mut model, &examples, 32, Mode::Evaluate, 5).unwrap();
        assert_eq!(report.exact_match, 1.0);
        assert_eq!(report.f1, 1.0);
        assert_eq!(report.predictions, vec![("q1".to_string(), "brown".to_string())]);
    }

    #[test]
    fn test_punctuated_gold_spans_score_exact_match() {
        let context = "It cost 1,000 dollars in the U.S. and was well-known.";
        let qa = |id: &str, text: &str, start: usize| Qa {
            id:       id.into(),
            question: "Which?".into(),
            answers:  vec![Answer::new(text, start)],
        };
        let corpus = Corpus::new(vec![Article {
            title: "cost".into(),
            paragraphs: vec![Paragraph {
                context: context.into(),
                qas: vec![qa("n", "1,000", 8), qa("c", "U.S.", 29), qa("h", "well-known", 42)],
            }],
        }]);
        let built = build_vocabulary(&corpus, &RunConfig::default()).unwrap();
        let (examples, report) =
            encode_corpus(&corpus, &built.vocab, built.context_max_len, built.question_max_len).unwrap();
        assert_eq!(report.encoded, 3);

        let mut model = StubModel::default();
        let report = run_batches(&mut model, &examples, 8, Mode::Evaluate, 1).unwrap();
        assert_eq!(report.exact_match, 1.0);
        assert_eq!(report.f1, 1.0);
        let texts: Vec<&str> = report.predictions.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, ["1,000", "U.S .", "well-known"]);
    }

    #[test]
    fn test_partial_final_batch_is_submitted_and_weighted_by_size() {
        let examples = synthetic(10);
        let mut model = StubModel::default();
        let report = run_batches(&mut model, &examples, 4, Mode::Train, 1).unwrap();

        assert_eq!(model.batch_sizes, vec![4, 4, 2]);
        assert_eq!(report.batches, 3);
        assert_eq!(report.examples, 10);
        assert_eq!(report.exact_match, 1.0);
        assert!((report.loss - 1.0).abs() < 1e-12);
        assert!(report.predictions.is_empty());
    }

    #[test]
    fn test_wrong_span_scores_partial_f1() {
        // predicted "the" vs gold "cat sat": no overlap after normalisation
        let examples = synthetic(3);
        let mut model = StubModel { wrong: true, ..Default::default() };
        let report = run_batches(&mut model, &examples, 2, Mode::Evaluate, 1).unwrap();
        assert_eq!(report.exact_match, 0.0);
        assert_eq!(report.f1, 0.0);
        assert_eq!(report.predictions.len(), 3);
    }

    #[test]
    fn test_missing_logit_rows_abort_the_pass() {
        let examples = synthetic(4);
        let mut model = StubModel { short_rows: true, ..Default::default() };
        let err = run_batches(&mut model, &examples, 4, Mode::Evaluate, 1).unwrap_err();
        assert!(err.to_string().contains("logit rows"));
    }

    #[test]
    fn test_trial_stops_early_and_resets_model() {
        let cfg = RunConfig {
            train_epoch:          20,
            batch_size:           8,
            early_stop:           true,
            early_stop_patience:  1,
            learning_rate:        1.0,
            ..RunConfig::default()
        };
        let train = synthetic(4);
        let dev   = synthetic(2);
        // one dev batch per epoch: hit, miss, miss → stop on the third evaluation
        let mut model = StubModel { gold_every: vec![true, false, false], ..Default::default() };

        let outcome = run_trial(&mut model, &cfg, "b3_test_0", &train, &dev, &TrialOutputs::default()).unwrap();

        assert!(outcome.stopped_early);
        assert_eq!(outcome.epochs_run, 3);
        assert_eq!((outcome.best_em, outcome.best_f1, outcome.best_epoch), (1.0, 1.0, 1));
        assert_eq!(outcome.final_lr, 0.25);
        assert_eq!(model.lrs, vec![1.0, 1.0, 0.5]);
        assert_eq!(model.resets, 1);
    }

    #[test]
    fn test_weights_saved_only_on_improvement() {
        let cfg = RunConfig {
            train_epoch:          20,
            batch_size:           1,
            early_stop:           true,
            early_stop_patience:  1,
            ..RunConfig::default()
        };
        let train = synthetic(1);
        let dev   = synthetic(2);
        // two dev batches per epoch; dev F1 per epoch: 0.5, 0, 1, 0, 0
        let mut model = StubModel {
            gold_every: vec![true, false, false, false, true, true, false, false, false, false],
            ..Default::default()
        };
        let outputs = TrialOutputs { save_path: Some(PathBuf::from("unused")), ..Default::default() };

        let outcome = run_trial(&mut model, &cfg, "b3_save", &train, &dev, &outputs).unwrap();

        assert!(outcome.stopped_early);
        assert_eq!(outcome.epochs_run, 5);
        assert_eq!(outcome.best_epoch, 3);
        // improved at epochs 1 and 3; decayed at 2 and 4; stopped at 5
        assert_eq!(model.saves.get(), 2);
    }

    #[test]
    fn test_no_save_without_a_save_path() {
        let cfg = RunConfig { train_epoch: 2, ..RunConfig::default() };
        let mut model = StubModel::default();
        run_trial(&mut model, &cfg, "b3_nosave", &synthetic(2), &synthetic(2), &TrialOutputs::default()).unwrap();
        assert_eq!(model.saves.get(), 0);
    }

    #[test]
    fn test_evaluate_only_trial_runs_one_pass() {
        let cfg = RunConfig { train: false, ..RunConfig::default() };
        let dev = synthetic(5);
        let mut model = StubModel::default();

        let outcome = run_trial(&mut model, &cfg, "b3_eval", &[], &dev, &TrialOutputs::default()).unwrap();

        assert_eq!(outcome.epochs_run, 1);
        assert!(model.modes.iter().all(|&m| m == Mode::Evaluate));
        assert_eq!(outcome.best_f1, 1.0);
    }
}
