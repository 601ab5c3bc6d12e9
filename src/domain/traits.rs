// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training loop never sees a tensor. It hands a slice of
// EncodedExamples to a SpanModel and gets back a loss plus
// per-token start/end logits. Anything that honours this
// contract can be trained and scored:
//
//   - BurnSpanModel  → the recurrent span predictor (Layer 5)
//   - test stubs     → fixed logits for loop/metric tests
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::path::Path;

use anyhow::Result;

use crate::domain::example::EncodedExample;

/// Whether a batch should update parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Evaluate,
}

/// What one model step returns for a batch of N examples.
/// Both logit tables have N rows of context_max_len values.
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    pub loss:         f64,
    pub start_logits: Vec<Vec<f32>>,
    pub end_logits:   Vec<Vec<f32>>,
}

// ─── SpanModel ────────────────────────────────────────────────────────────────
/// A span predictor the batching loop can drive.
///
/// `step` in `Mode::Train` must apply exactly one parameter
/// update and return logits scored with the updated parameters;
/// in `Mode::Evaluate` it must not touch parameters.
pub trait SpanModel {
    fn step(&mut self, batch: &[EncodedExample], mode: Mode) -> Result<StepOutput>;

    /// Learning rate used by subsequent training steps
    fn set_learning_rate(&mut self, lr: f64);

    /// Persist parameters so `load` can restore them
    fn save(&self, path: &Path) -> Result<()>;

    fn load(&mut self, path: &Path) -> Result<()>;

    /// Return to freshly initialised parameters and optimiser state
    fn reset(&mut self);
}
