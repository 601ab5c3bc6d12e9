// ============================================================
// Layer 4 — Vocabulary
// ============================================================
// Dense token ↔ id mapping built from the TRAINING corpus only.
//
//   id 0 → <pad>   (right-padding of every sequence)
//   id 1 → <unk>   (any token not seen in training)
//   id 2.. → tokens in first-seen order over contexts then
//            questions, paragraph by paragraph
//
// The vocabulary is immutable once built. The embedding loader
// may extend it, which consumes the old value and returns a new one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::application::config::RunConfig;
use crate::data::tokenizer::{vocab_key, WordTokenizer};
use crate::domain::error::Result;
use crate::domain::squad::Corpus;

pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;
pub const PAD_TOKEN: &str = "<pad>";
pub const UNK_TOKEN: &str = "<unk>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    idx2word: Vec<String>,
    word2idx: HashMap<String, u32>,
}

impl Vocabulary {
    /// A vocabulary holding only the two reserved tokens
    pub fn new() -> Self {
        let mut v = Self { idx2word: Vec::new(), word2idx: HashMap::new() };
        v.insert(PAD_TOKEN);
        v.insert(UNK_TOKEN);
        v
    }

    /// Add a key if unseen and return its id
    fn insert(&mut self, key: &str) -> u32 {
        if let Some(&id) = self.word2idx.get(key) {
            return id;
        }
        let id = self.idx2word.len() as u32;
        self.idx2word.push(key.to_string());
        self.word2idx.insert(key.to_string(), id);
        id
    }

    /// Id for a raw token, `UNK_ID` when unknown
    pub fn id(&self, token: &str) -> u32 {
        self.word2idx.get(&vocab_key(token)).copied().unwrap_or(UNK_ID)
    }

    pub fn key_id(&self, key: &str) -> Option<u32> {
        self.word2idx.get(key).copied()
    }

    pub fn token(&self, id: u32) -> Option<&str> {
        self.idx2word.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.idx2word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idx2word.is_empty()
    }

    /// Map raw tokens to ids, truncate to `max_len`, right-pad with `PAD_ID`.
    /// Returns the padded ids and the number of real tokens kept.
    pub fn encode_padded<S: AsRef<str>>(&self, tokens: &[S], max_len: usize) -> (Vec<u32>, usize) {
        let kept = tokens.len().min(max_len);
        let mut ids: Vec<u32> = tokens[..kept].iter().map(|t| self.id(t.as_ref())).collect();
        ids.resize(max_len, PAD_ID);
        (ids, kept)
    }

    /// A new vocabulary with `keys` appended in order, skipping known ones.
    pub fn extended<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        for key in keys {
            self.insert(&key);
        }
        self
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<String>> for Vocabulary {
    fn from(words: Vec<String>) -> Self {
        let mut v = Self { idx2word: Vec::new(), word2idx: HashMap::new() };
        for w in &words {
            v.insert(w);
        }
        v
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(v: Vocabulary) -> Self {
        v.idx2word
    }
}

/// Result of scanning the training corpus.
#[derive(Debug, Clone)]
pub struct VocabularyBuild {
    pub vocab:           Vocabulary,
    pub context_max_len: usize,
    pub question_max_len: usize,
}

/// Build the vocabulary and sequence lengths from the training corpus.
///
/// The observed maxima are used unless the config sets a positive
/// `context_maxlen` / `question_maxlen`, which then wins even when
/// it is shorter than some sequences (they get truncated at encode time).
pub fn build_vocabulary(corpus: &Corpus, cfg: &RunConfig) -> Result<VocabularyBuild> {
    let tokenizer = WordTokenizer::new();
    let mut vocab = Vocabulary::new();
    let mut context_max  = 0usize;
    let mut question_max = 0usize;
    let mut total_tokens = 0usize;

    for paragraph in corpus.paragraphs() {
        let context = tokenizer.words(&paragraph.context)?;
        context_max   = context_max.max(context.len());
        total_tokens += context.len();
        for word in &context {
            vocab.insert(&vocab_key(word));
        }

        for qa in &paragraph.qas {
            let question = tokenizer.words(&qa.question)?;
            question_max  = question_max.max(question.len());
            total_tokens += question.len();
            for word in &question {
                vocab.insert(&vocab_key(word));
            }
        }
    }

    let context_max_len  = if cfg.context_maxlen  > 0 { cfg.context_maxlen }  else { context_max };
    let question_max_len = if cfg.question_maxlen > 0 { cfg.question_maxlen } else { question_max };

    tracing::info!(
        "Vocabulary: {} entries from {} tokens (context max {} → {}, question max {} → {})",
        vocab.len(),
        total_tokens,
        context_max,
        context_max_len,
        question_max,
        question_max_len,
    );

    Ok(VocabularyBuild {
        vocab,
        context_max_len:  context_max_len.max(1),
        question_max_len: question_max_len.max(1),
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::squad::{Answer, Article, Paragraph, Qa};

    fn corpus(context: &str, question: &str) -> Corpus {
        Corpus::new(vec![Article {
            title: "t".into(),
            paragraphs: vec![Paragraph {
                context: context.into(),
                qas: vec![Qa {
                    id:       "q1".into(),
                    question: question.into(),
                    answers:  vec![Answer::new("x", 0)],
                }],
            }],
        }])
    }

    #[test]
    fn test_reserved_ids() {
        let v = Vocabulary::new();
        assert_eq!(v.token(PAD_ID), Some(PAD_TOKEN));
        assert_eq!(v.token(UNK_ID), Some(UNK_TOKEN));
        assert_eq!(v.id("never-seen"), UNK_ID);
    }

    #[test]
    fn test_ids_follow_first_occurrence() {
        let build = build_vocabulary(&corpus("b a b c", "c d"), &RunConfig::default()).unwrap();
        let v = build.vocab;
        assert_eq!(v.id("b"), 2);
        assert_eq!(v.id("a"), 3);
        assert_eq!(v.id("c"), 4);
        assert_eq!(v.id("d"), 5);
        assert_eq!(v.len(), 6);
        assert_eq!(build.context_max_len, 4);
        assert_eq!(build.question_max_len, 2);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let v = build_vocabulary(&corpus("Brown fox", "?"), &RunConfig::default()).unwrap().vocab;
        assert_eq!(v.id("brown"), v.id("BROWN"));
        assert_ne!(v.id("brown"), UNK_ID);
    }

    #[test]
    fn test_override_wins_over_observed_max() {
        let cfg = RunConfig { context_maxlen: 2, ..RunConfig::default() };
        let build = build_vocabulary(&corpus("one two three four", "q"), &cfg).unwrap();
        assert_eq!(build.context_max_len, 2);
    }

    #[test]
    fn test_encode_padded_truncates_and_pads() {
        let v = Vocabulary::from(vec![
            PAD_TOKEN.to_string(), UNK_TOKEN.to_string(), "a".into(), "b".into(),
        ]);
        assert_eq!(v.encode_padded(&["a", "b", "zzz"], 5), (vec![2, 3, UNK_ID, 0, 0], 3));
        assert_eq!(v.encode_padded(&["a", "b", "a"], 2), (vec![2, 3], 2));
    }

    #[test]
    fn test_extended_keeps_existing_ids() {
        let v = Vocabulary::new().extended(vec!["x".to_string()]);
        let w = v.clone().extended(vec!["y".to_string(), "x".to_string()]);
        assert_eq!(w.id("x"), v.id("x"));
        assert_eq!(w.id("y"), 3);
        assert_eq!(w.len(), 4);
    }

    #[test]
    fn test_serde_round_trip_restores_lookup() {
        let v = Vocabulary::new().extended(vec!["fox".to_string()]);
        let json = serde_json::to_string(&v).unwrap();
        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id("fox"), 2);
    }
}
