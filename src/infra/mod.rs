// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that writes to or reads from disk outside of the
// dataset and embedding inputs:
//
//   checkpoint.rs     — model weights (CompactRecorder), resolved
//                       RunConfig and vocabulary as JSON
//   metrics.rs        — per-epoch metrics CSV
//   validation_log.rs — one human-readable line per trial
//   predictions.rs    — SQuAD predictions file {qa_id: text}
//   progress.rs       — text progress bar for batch logs

pub mod checkpoint;

pub mod metrics;

pub mod predictions;

pub mod progress;

pub mod validation_log;
