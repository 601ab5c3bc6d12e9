// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from a SQuAD JSON file to device tensors:
//
//   train-v1.1.json
//       │
//       ▼
//   reader            → version-checked Corpus
//       │
//       ▼
//   tokenizer + vocab → word ids, context/question max lengths
//       │
//       ▼
//   encoder           → padded EncodedExamples with gold spans
//       │
//       ▼
//   embedding         → pretrained matrix aligned to vocab ids
//       │
//       ▼
//   batcher           → SpanBatch tensors for the model
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads SQuAD JSON and checks its version
pub mod reader;

/// Canonical word tokenizer with character offsets
pub mod tokenizer;

/// Token ↔ id mapping built from training data
pub mod vocab;

/// Character-offset answers → token spans, padding
pub mod encoder;

/// GloVe-style pretrained vector loading
pub mod embedding;

/// Implements Burn's Batcher trait for encoded examples
pub mod batcher;
