// ============================================================
// Layer 3 — SQuAD Corpus Types
// ============================================================
// Mirrors the SQuAD JSON layout one struct per level:
//
//   SquadFile { version, data: [Article] }
//     Article   { title, paragraphs: [Paragraph] }
//       Paragraph { context, qas: [Qa] }
//         Qa        { id, question, answers: [Answer] }
//           Answer    { text, answer_start }
//
// answer_start is a CHARACTER offset into the paragraph context,
// not a byte offset and not a token index.
//
// Reference: Rajpurkar et al. (2016) SQuAD

use serde::{Deserialize, Serialize};

/// Top-level file wrapper. Only the reader sees this type;
/// after the version check it is unwrapped into a `Corpus`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadFile {
    pub version: String,
    pub data:    Vec<Article>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title:      String,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paragraph {
    pub context: String,
    pub qas:     Vec<Qa>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Qa {
    pub id:       String,
    pub question: String,
    pub answers:  Vec<Answer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text:         String,
    /// Character offset of the first answer character in the context
    pub answer_start: usize,
}

/// An ordered sequence of articles, already version-checked.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub articles: Vec<Article>,
}

impl Corpus {
    pub fn new(articles: Vec<Article>) -> Self {
        Self { articles }
    }

    /// Every paragraph in article order
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.articles.iter().flat_map(|a| a.paragraphs.iter())
    }

    /// Total number of QAs across all paragraphs
    pub fn qa_count(&self) -> usize {
        self.paragraphs().map(|p| p.qas.len()).sum()
    }
}

impl Answer {
    pub fn new(text: impl Into<String>, answer_start: usize) -> Self {
        Self { text: text.into(), answer_start }
    }

    /// Exclusive character offset one past the last answer character
    pub fn answer_end(&self) -> usize {
        self.answer_start + self.text.chars().count()
    }
}
