// ============================================================
// Layer 2 — Hyperparameter Sampling
// ============================================================
// Random search over the learning rate: each trial draws
// k ∈ [1, 1000] and uses lr = k × 1e-5 (0.00001 … 0.01).
// The generator is seeded from RunConfig::seed, so a rerun
// with the same seed visits the same learning rates.

use chrono::Local;
use rand::{rngs::StdRng, Rng};

use crate::application::config::RunConfig;

const LR_STEP: f64 = 1e-5;
const LR_STEPS_MAX: u32 = 1000;

/// Copy of `base` with sampled hyperparameters for one trial.
pub fn sample_parameters(base: &RunConfig, rng: &mut StdRng) -> RunConfig {
    let k = rng.gen_range(1..=LR_STEPS_MAX);
    RunConfig {
        learning_rate: f64::from(k) * LR_STEP,
        ..base.clone()
    }
}

/// `{kind tag}{context max len}_{timestamp}_{trial}`, or the
/// configured load name when resuming a saved model.
pub fn model_name(cfg: &RunConfig, context_max_len: usize, trial: usize) -> String {
    if cfg.load {
        return cfg.load_name.clone();
    }
    format!(
        "{}{}_{}_{}",
        cfg.model_kind.tag(),
        context_max_len,
        Local::now().format("%Y%m%d%H%M%S"),
        trial
    )
}
