// ============================================================
// Layer 4 — Example Encoder
// ============================================================
// Turns every QA of a corpus into a padded, integer-encoded
// EncodedExample with a token-level gold span.
//
// Character → token alignment for an answer covering
// characters [s, e), surrounding whitespace trimmed:
//   start token = the token starting exactly at s
//   end token   = the token ending exactly at e
// An answer that starts or ends inside a token is misaligned.
//
//   context: "The quick brown fox"
//   tokens:   The(0,3) quick(4,9) brown(10,15) fox(16,19)
//   answer "brown" @10 → chars [10,15) → tokens 2..=2
//
// Per-QA failures never abort the run:
//   misaligned → QaError::Alignment, logged and counted
//   truncated  → the span lies past context_max_len, counted

use std::sync::Arc;

use crate::data::tokenizer::{Token, WordTokenizer};
use crate::data::vocab::Vocabulary;
use crate::domain::error::{QaError, Result};
use crate::domain::example::EncodedExample;
use crate::domain::squad::{Answer, Corpus, Qa};

/// Counts reported after encoding a corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeReport {
    pub encoded:    usize,
    pub misaligned: usize,
    pub truncated:  usize,
}

impl EncodeReport {
    pub fn skipped(&self) -> usize {
        self.misaligned + self.truncated
    }
}

pub fn encode_corpus(
    corpus:           &Corpus,
    vocab:            &Vocabulary,
    context_max_len:  usize,
    question_max_len: usize,
) -> Result<(Vec<EncodedExample>, EncodeReport)> {
    let tokenizer    = WordTokenizer::new();
    let mut examples = Vec::with_capacity(corpus.qa_count());
    let mut report   = EncodeReport::default();

    for paragraph in corpus.paragraphs() {
        let context_chars: Vec<char> = paragraph.context.chars().collect();
        let tokens = tokenizer.tokenize(&paragraph.context)?;
        let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();

        let (context_ids, context_len) = vocab.encode_padded(&words, context_max_len);
        let context_tokens: Arc<[String]> = words[..context_len]
            .iter()
            .map(|w| w.to_string())
            .collect();

        for qa in &paragraph.qas {
            let span = match gold_span(qa, &context_chars, &tokens) {
                Ok(span) => span,
                Err(e) => {
                    tracing::warn!("Skipping: {e}");
                    report.misaligned += 1;
                    continue;
                }
            };
            if span.1 >= context_len {
                tracing::warn!(
                    "Skipping '{}': answer tokens {}..={} fall outside the truncated context ({} tokens)",
                    qa.id, span.0, span.1, context_len
                );
                report.truncated += 1;
                continue;
            }

            let question = tokenizer.words(&qa.question)?;
            let (question_ids, question_len) = vocab.encode_padded(&question, question_max_len);

            examples.push(EncodedExample {
                qa_id:          qa.id.clone(),
                context_ids:    context_ids.clone(),
                context_len,
                question_ids,
                question_len,
                answer_start:   span.0,
                answer_end:     span.1,
                context_tokens: Arc::clone(&context_tokens),
                gold_answers:   qa.answers.iter().map(|a| a.text.clone()).collect(),
            });
            report.encoded += 1;
        }
    }

    tracing::info!(
        "Encoded {} examples, skipped {} ({} misaligned, {} truncated)",
        report.encoded,
        report.skipped(),
        report.misaligned,
        report.truncated,
    );
    Ok((examples, report))
}

/// Span of the first answer that aligns cleanly. When none do,
/// the error of the first answer is returned.
fn gold_span(qa: &Qa, context_chars: &[char], tokens: &[Token]) -> Result<(usize, usize)> {
    let mut first_err = None;
    for answer in &qa.answers {
        match align_answer(&qa.id, answer, context_chars, tokens) {
            Ok(span) => return Ok(span),
            Err(e) => {
                first_err.get_or_insert(e);
            }
        }
    }
    Err(first_err.unwrap_or_else(|| QaError::alignment(&qa.id, "question has no answers")))
}

/// Map one character-offset answer onto an inclusive token span.
pub fn align_answer(
    qa_id:         &str,
    answer:        &Answer,
    context_chars: &[char],
    tokens:        &[Token],
) -> Result<(usize, usize)> {
    let start = answer.answer_start;
    let end   = answer.answer_end();

    if answer.text.trim().is_empty() {
        return Err(QaError::alignment(qa_id, "answer text is empty"));
    }
    if end > context_chars.len() {
        return Err(QaError::alignment(
            qa_id,
            format!("answer ends at character {end}, past the context ({} characters)", context_chars.len()),
        ));
    }
    if !context_chars[start..end].iter().copied().eq(answer.text.chars()) {
        return Err(QaError::alignment(
            qa_id,
            format!("answer text {:?} does not match the context at offset {start}", answer.text),
        ));
    }

    let answer_chars = &context_chars[start..end];
    let lead  = answer_chars.iter().take_while(|c| c.is_whitespace()).count();
    let trail = answer_chars.iter().rev().take_while(|c| c.is_whitespace()).count();
    let (start, end) = (start + lead, end - trail);

    let first = tokens.iter().position(|t| t.start == start);
    let last  = tokens.iter().position(|t| t.end == end);
    match (first, last) {
        (Some(s), Some(e)) if s <= e => Ok((s, e)),
        _ => Err(QaError::alignment(
            qa_id,
            format!("characters {start}..{end} do not fall on token boundaries"),
        )),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::RunConfig;
    use crate::data::vocab::build_vocabulary;
    use crate::domain::squad::{Article, Paragraph};

    fn corpus(context: &str, qas: Vec<Qa>) -> Corpus {
        Corpus::new(vec![Article {
            title:      "t".into(),
            paragraphs: vec![Paragraph { context: context.into(), qas }],
        }])
    }

    fn qa(id: &str, question: &str, answers: Vec<Answer>) -> Qa {
        Qa { id: id.into(), question: question.into(), answers }
    }

    fn tokens(text: &str) -> Vec<Token> {
        WordTokenizer::new().tokenize(text).unwrap()
    }

    #[test]
    fn test_fox_example_aligns_to_brown() {
        let c = corpus(
            "The quick brown fox",
            vec![qa("q1", "What color is the fox?", vec![Answer::new("brown", 10)])],
        );
        let build = build_vocabulary(&c, &RunConfig::default()).unwrap();
        let (examples, report) =
            encode_corpus(&c, &build.vocab, build.context_max_len, build.question_max_len).unwrap();

        assert_eq!(report, EncodeReport { encoded: 1, misaligned: 0, truncated: 0 });
        let ex = &examples[0];
        assert_eq!((ex.answer_start, ex.answer_end), (2, 2));
        assert_eq!(ex.context_ids[2], build.vocab.id("brown"));
        assert_eq!(ex.span_text(ex.answer_start, ex.answer_end), "brown");
        assert_eq!(ex.context_len, 4);
        assert_eq!(ex.question_len, 6);
    }

    #[test]
    fn test_multi_token_answer_with_punctuation() {
        let text = "Founded in 1999, the club won.";
        let span = align_answer("q", &Answer::new("1999, the club", 11), &text.chars().collect::<Vec<_>>(), &tokens(text)).unwrap();
        // Founded in 1999 , the club won .
        assert_eq!(span, (2, 5));
    }

    #[test]
    fn test_answer_inside_a_token_is_alignment_error() {
        let text = "a multinational firm";
        let err = align_answer("q", &Answer::new("national", 7), &text.chars().collect::<Vec<_>>(), &tokens(text)).unwrap_err();
        assert!(matches!(err, QaError::Alignment { .. }));
    }

    #[test]
    fn test_answer_ending_inside_a_token_is_alignment_error() {
        let text = "The fox's den";
        let err = align_answer("q", &Answer::new("fox", 4), &text.chars().collect::<Vec<_>>(), &tokens(text)).unwrap_err();
        assert!(matches!(err, QaError::Alignment { .. }));
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed_before_alignment() {
        let text = "The quick brown fox";
        let span = align_answer("q", &Answer::new(" brown ", 9), &text.chars().collect::<Vec<_>>(), &tokens(text)).unwrap();
        assert_eq!(span, (2, 2));
    }

    #[test]
    fn test_punctuated_answers_align_to_whole_tokens() {
        let text = "It cost 1,000 dollars in the U.S. and was well-known.";
        let chars: Vec<char> = text.chars().collect();
        let toks = tokens(text);
        // It cost 1,000 dollars in the U.S . and was well-known .
        assert_eq!(align_answer("a", &Answer::new("1,000", 8), &chars, &toks).unwrap(), (2, 2));
        assert_eq!(align_answer("b", &Answer::new("U.S.", 29), &chars, &toks).unwrap(), (6, 7));
        assert_eq!(align_answer("c", &Answer::new("well-known", 42), &chars, &toks).unwrap(), (10, 10));
    }

    #[test]
    fn test_mismatched_text_is_alignment_error() {
        let text = "The quick brown fox";
        let err = align_answer("q9", &Answer::new("brown", 4), &text.chars().collect::<Vec<_>>(), &tokens(text)).unwrap_err();
        assert!(matches!(err, QaError::Alignment { ref qa_id, .. } if qa_id == "q9"));
    }

    #[test]
    fn test_whitespace_only_answer_is_alignment_error() {
        let text = "a  b";
        assert!(align_answer("q", &Answer::new(" ", 1), &text.chars().collect::<Vec<_>>(), &tokens(text)).is_err());
    }

    #[test]
    fn test_bad_examples_are_skipped_and_counted() {
        let c = corpus(
            "one two three four five",
            vec![
                qa("ok", "which?", vec![Answer::new("two", 4)]),
                qa("bad", "which?", vec![Answer::new("zzz", 4)]),
                qa("late", "which?", vec![Answer::new("five", 19)]),
            ],
        );
        let vocab = build_vocabulary(&c, &RunConfig::default()).unwrap().vocab;
        let (examples, report) = encode_corpus(&c, &vocab, 3, 4).unwrap();

        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].qa_id, "ok");
        assert_eq!(report, EncodeReport { encoded: 1, misaligned: 1, truncated: 1 });
        assert_eq!(report.skipped(), 2);
        assert_eq!(examples[0].context_tokens.len(), 3);
        assert_eq!(examples[0].context_ids.len(), 3);
    }

    #[test]
    fn test_second_answer_used_when_first_misaligns() {
        let c = corpus(
            "red green blue",
            vec![qa("q", "which?", vec![Answer::new("nope", 0), Answer::new("green", 4)])],
        );
        let vocab = build_vocabulary(&c, &RunConfig::default()).unwrap().vocab;
        let (examples, _) = encode_corpus(&c, &vocab, 8, 4).unwrap();
        assert_eq!((examples[0].answer_start, examples[0].answer_end), (1, 1));
        assert_eq!(examples[0].gold_answers, vec!["nope", "green"]);
    }

    #[test]
    fn test_invariant_holds_for_encoded_examples() {
        let c = corpus(
            "alpha beta gamma delta",
            vec![
                qa("a", "q?", vec![Answer::new("alpha beta", 0)]),
                qa("b", "q?", vec![Answer::new("delta", 17)]),
            ],
        );
        let vocab = build_vocabulary(&c, &RunConfig::default()).unwrap().vocab;
        let (examples, _) = encode_corpus(&c, &vocab, 6, 3).unwrap();
        for ex in &examples {
            assert!(ex.answer_start <= ex.answer_end);
            assert!(ex.answer_end < ex.context_len);
            assert!(ex.context_len <= ex.context_ids.len());
        }
    }
}
