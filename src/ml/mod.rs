// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn tensor code lives here (plus the Layer 4 batcher).
//
//   model.rs      — SpanNet: embeddings, BiLSTM encoders,
//                   basic / attentive interaction, span heads
//   session.rs    — BurnSpanModel: SpanNet + Adam behind the
//                   SpanModel trait
//   trainer.rs    — batching loop (EM/F1 per example) and the
//                   per-trial epoch loop
//   controller.rs — learning-rate decay and early stopping
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

pub mod model;

pub mod session;

pub mod trainer;

pub mod controller;
