// ============================================================
// Layer 4 — Pretrained Embedding Loader
// ============================================================
// Reads a GloVe-style text table ("token v1 v2 ... v_dim" per
// line) and aligns it to vocabulary ids:
//
//   row 0 (<pad>)            → always zeros
//   token found in the file  → the pretrained vector
//   token missing            → fallback (zeros or seeded uniform)
//
// Pretrained tokens the vocabulary does not know are either
// ignored or appended to the vocabulary (OovPolicy). Lines with
// the wrong field count or an unparsable number are skipped and
// counted; a file with no usable line at all is fatal.

use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::application::config::{FallbackInit, OovPolicy};
use crate::data::tokenizer::vocab_key;
use crate::data::vocab::{Vocabulary, PAD_ID};
use crate::domain::error::{QaError, Result};

/// Only the first few malformed lines are logged at warn level.
const MALFORMED_WARN_LIMIT: usize = 5;

/// Row-major [vocab_size × dim] matrix. Row i belongs to id i.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    rows: usize,
    dim:  usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    pub fn zeros(rows: usize, dim: usize) -> Self {
        Self { rows, dim, data: vec![0.0; rows * dim] }
    }

    pub fn rows(&self) -> usize { self.rows }

    pub fn dim(&self) -> usize { self.dim }

    pub fn row(&self, id: u32) -> &[f32] {
        let i = id as usize * self.dim;
        &self.data[i..i + self.dim]
    }

    fn row_mut(&mut self, id: u32) -> &mut [f32] {
        let i = id as usize * self.dim;
        &mut self.data[i..i + self.dim]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbeddingReport {
    /// Well-formed lines in the file
    pub usable:    usize,
    pub malformed: usize,
    /// Vocabulary entries that received a pretrained vector
    pub matched:   usize,
    /// Vocabulary entries that received the fallback vector
    pub fallback:  usize,
    /// Entries appended under OovPolicy::Extend
    pub added:     usize,
}

#[derive(Debug, Clone, Copy)]
pub struct EmbeddingOptions {
    pub dim:      usize,
    pub oov:      OovPolicy,
    pub fallback: FallbackInit,
    pub seed:     u64,
}

/// Load vectors for `vocab` from `path`. Returns the matrix, the
/// (possibly extended) vocabulary, and counts for logging.
pub fn load_embeddings(
    vocab: Vocabulary,
    path:  impl AsRef<Path>,
    opts:  EmbeddingOptions,
) -> Result<(EmbeddingMatrix, Vocabulary, EmbeddingReport)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| QaError::io(e, path))?;

    let mut report = EmbeddingReport::default();
    let mut known: HashMap<u32, Vec<f32>> = HashMap::new();
    let mut extra: Vec<(String, Vec<f32>)> = Vec::new();
    let mut extra_seen: HashSet<String> = HashSet::new();

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| QaError::io(e, path))?;
        if line.trim().is_empty() {
            continue;
        }

        let (token, vector) = match parse_line(&line, opts.dim) {
            Ok(parsed) => parsed,
            Err(reason) => {
                report.malformed += 1;
                let err = QaError::EmbeddingFormat {
                    path:   path.to_path_buf(),
                    line:   Some(line_no),
                    reason,
                };
                if report.malformed <= MALFORMED_WARN_LIMIT {
                    tracing::warn!("Skipping vector: {err}");
                } else {
                    tracing::debug!("Skipping vector: {err}");
                }
                continue;
            }
        };
        report.usable += 1;

        // First occurrence wins for duplicate keys
        let key = vocab_key(token);
        match vocab.key_id(&key) {
            Some(id) => {
                known.entry(id).or_insert(vector);
            }
            None if opts.oov == OovPolicy::Extend => {
                if extra_seen.insert(key.clone()) {
                    extra.push((key, vector));
                }
            }
            None => {}
        }
    }

    if report.usable == 0 {
        return Err(QaError::EmbeddingFormat {
            path:   path.to_path_buf(),
            line:   None,
            reason: format!("no usable {}-dimensional vectors", opts.dim),
        });
    }

    // Extension happens after the scan so ids of existing entries never move
    let base_len = vocab.len();
    report.added = extra.len();
    let (extra_keys, extra_vectors): (Vec<String>, Vec<Vec<f32>>) = extra.into_iter().unzip();
    let vocab = vocab.extended(extra_keys);

    let mut matrix = EmbeddingMatrix::zeros(vocab.len(), opts.dim);
    let mut rng    = StdRng::seed_from_u64(opts.seed);

    for id in 0..base_len as u32 {
        if id == PAD_ID {
            continue;
        }
        match known.get(&id) {
            Some(v) => {
                matrix.row_mut(id).copy_from_slice(v);
                report.matched += 1;
            }
            None => {
                fill_fallback(matrix.row_mut(id), opts.fallback, &mut rng);
                report.fallback += 1;
            }
        }
    }
    for (offset, v) in extra_vectors.iter().enumerate() {
        matrix.row_mut((base_len + offset) as u32).copy_from_slice(v);
    }

    tracing::info!(
        "Embeddings from '{}': {} usable lines, {} malformed, {} matched, {} fallback, {} added",
        path.display(),
        report.usable,
        report.malformed,
        report.matched,
        report.fallback,
        report.added,
    );
    Ok((matrix, vocab, report))
}

/// Split one line into its token and exactly `dim` floats.
fn parse_line(line: &str, dim: usize) -> std::result::Result<(&str, Vec<f32>), String> {
    let mut fields = line.split_whitespace();
    let token = fields.next().ok_or_else(|| "empty line".to_string())?;

    let values = fields
        .map(|f| f.parse::<f32>().map_err(|_| format!("'{f}' is not a number")))
        .collect::<std::result::Result<Vec<f32>, String>>()?;

    if values.len() != dim {
        return Err(format!("expected {dim} values, found {}", values.len()));
    }
    Ok((token, values))
}

fn fill_fallback(row: &mut [f32], init: FallbackInit, rng: &mut StdRng) {
    match init {
        FallbackInit::Zero => row.fill(0.0),
        FallbackInit::Uniform { scale } => {
            for x in row.iter_mut() {
                *x = rng.gen_range(-scale..scale);
            }
        }
    }
}
