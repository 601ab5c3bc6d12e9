// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits that describe extractive Q&A:
// the SQuAD corpus, encoded examples, span scoring, and the
// contract the model collaborator must satisfy.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, functions, and traits
//
// Reference: Rajpurkar et al. (2016) SQuAD
//            Rust Book §5 (Structs), §10 (Traits)

// Error taxonomy shared by every layer
pub mod error;

// SQuAD JSON records (articles, paragraphs, QAs)
pub mod squad;

// Integer-encoded, padded question/passage examples
pub mod example;

// Exact-match / F1 scoring and span selection
pub mod scoring;

// The model collaborator contract
pub mod traits;
