// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure the pipeline can report, grouped by how it is
// handled:
//
//   Format          — fatal, the input file is unusable
//   Alignment       — one QA is skipped and counted
//   EmbeddingFormat — one vector line is skipped and counted,
//                     fatal only when nothing usable remains
//   Configuration   — fatal, raised before any data is read
//
// The application layer wraps these in anyhow with context.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by the domain and data layers.
pub type Result<T, E = QaError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum QaError {
    /// Malformed or incompatible dataset file.
    #[error("format error in {path:?}: {reason}")]
    Format { path: PathBuf, reason: String },

    /// A QA whose answer cannot be mapped onto context tokens.
    #[error("alignment error for question '{qa_id}': {reason}")]
    Alignment { qa_id: String, reason: String },

    /// A pretrained vector line that could not be parsed.
    /// `line` is `None` when the whole file is unusable.
    #[error("embedding format error in {path:?} (line {line:?}): {reason}")]
    EmbeddingFormat {
        path:   PathBuf,
        line:   Option<usize>,
        reason: String,
    },

    /// Missing or contradictory run options.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A metric was asked to compare against zero references.
    #[error("cannot score a prediction against an empty reference list")]
    EmptyReferences,

    /// Error bubbled up from the `tokenizers` crate.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// The model collaborator broke its output contract.
    #[error("model contract violation: {0}")]
    Model(String),

    #[error("io error while processing {path:?}: {source}")]
    Io {
        source: std::io::Error,
        path:   PathBuf,
    },
}

impl QaError {
    /// Wrap an IO error together with the path that caused it.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io { source, path: path.into() }
    }

    pub fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Format { path: path.into(), reason: reason.into() }
    }

    pub fn alignment(qa_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Alignment { qa_id: qa_id.into(), reason: reason.into() }
    }
}

impl From<tokenizers::Error> for QaError {
    fn from(err: tokenizers::Error) -> Self {
        Self::Tokenizer(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_record() {
        let err = QaError::alignment("q-17", "answer text does not match context");
        assert!(err.to_string().contains("q-17"));

        let err = QaError::format("train.json", "expected version 1.1, found 2.0");
        assert!(err.to_string().contains("train.json"));
        assert!(err.to_string().contains("2.0"));
    }
}
