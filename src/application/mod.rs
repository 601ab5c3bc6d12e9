// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: reads the RunConfig, calls into
// data (Layer 4), ml (Layer 5) and infra (Layer 6), and hands
// results back to the CLI.
//
//   config.rs            — typed RunConfig, JSON loading, validation
//   sampling.rs          — per-trial hyperparameter sampling, model names
//   train_use_case.rs    — read → vocab → embeddings → encode → trials
//   evaluate_use_case.rs — checkpoint → dev predictions + EM/F1

pub mod config;

pub mod sampling;

// The training workflow
pub mod train_use_case;

// Scoring a saved checkpoint
pub mod evaluate_use_case;
