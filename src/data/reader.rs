// ============================================================
// Layer 4 — SQuAD Reader
// ============================================================
// Loads a SQuAD-format JSON file into a version-checked Corpus.
//
// Checks, all fatal (QaError::Format):
//   - the file parses as JSON
//   - `version` is a string equal to the expected version
//   - `data` matches the article/paragraph/qa/answer schema
//   - every answer_start points inside its paragraph context
//
// The version is checked before the schema so a file from a
// different SQuAD release reports the version, not a field error.

use std::{fs::File, io::BufReader, path::Path};

use serde_json::Value;

use crate::domain::error::{QaError, Result};
use crate::domain::squad::{Corpus, SquadFile};

pub fn read_corpus(path: impl AsRef<Path>, expected_version: &str) -> Result<Corpus> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| QaError::io(e, path))?;

    let root: Value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| QaError::format(path, format!("invalid JSON: {e}")))?;

    let version = root
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| QaError::format(path, "missing string field 'version'"))?;
    if version != expected_version {
        return Err(QaError::format(
            path,
            format!("expected version {expected_version}, found {version}"),
        ));
    }

    let squad: SquadFile = serde_json::from_value(root)
        .map_err(|e| QaError::format(path, format!("schema mismatch: {e}")))?;
    let version = squad.version;

    let corpus = Corpus::new(squad.data);
    check_answer_offsets(path, &corpus)?;

    tracing::info!(
        "Read '{}': {} articles, {} questions (version {})",
        path.display(),
        corpus.articles.len(),
        corpus.qa_count(),
        version,
    );
    Ok(corpus)
}

fn check_answer_offsets(path: &Path, corpus: &Corpus) -> Result<()> {
    for paragraph in corpus.paragraphs() {
        let context_chars = paragraph.context.chars().count();
        for qa in &paragraph.qas {
            for answer in &qa.answers {
                if answer.answer_start >= context_chars {
                    return Err(QaError::format(
                        path,
                        format!(
                            "question '{}': answer_start {} is outside its context ({} characters)",
                            qa.id, answer.answer_start, context_chars
                        ),
                    ));
                }
            }
        }
    }
    Ok(())
}
