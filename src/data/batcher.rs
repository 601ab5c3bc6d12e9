// ============================================================
// Layer 4 — Span Batcher
// ============================================================
// Implements Burn's Batcher trait to stack EncodedExamples into
// device tensors.
//
//   Input:  N examples, contexts padded to C, questions to Q
//   Output: SpanBatch with
//             context_ids / context_pad     [N, C]
//             question_ids / question_pad   [N, Q]
//             question_weight               [N, Q]  (1.0 real, 0.0 pad)
//             question_len                  [N, 1]
//             start_positions / end_positions [N]
//
// Padding masks are derived from the stored lengths, not from
// the pad id, so an <unk>-heavy sequence is never mistaken
// for padding.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::example::EncodedExample;

#[derive(Debug, Clone)]
pub struct SpanBatch<B: Backend> {
    pub context_ids:     Tensor<B, 2, Int>,
    /// true at padding positions
    pub context_pad:     Tensor<B, 2, Bool>,
    pub question_ids:    Tensor<B, 2, Int>,
    pub question_pad:    Tensor<B, 2, Bool>,
    pub question_weight: Tensor<B, 2>,
    pub question_len:    Tensor<B, 2>,
    pub start_positions: Tensor<B, 1, Int>,
    pub end_positions:   Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct SpanBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SpanBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Build a batch from borrowed examples.
    /// All examples must share the same padded lengths.
    pub fn build(&self, items: &[EncodedExample]) -> SpanBatch<B> {
        let batch_size   = items.len();
        let context_max  = items[0].context_ids.len();
        let question_max = items[0].question_ids.len();

        let context_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.context_ids.iter().map(|&x| x as i32))
            .collect();
        let question_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.question_ids.iter().map(|&x| x as i32))
            .collect();

        let context_mask  = length_mask(items.iter().map(|s| s.context_len), context_max);
        let question_mask = length_mask(items.iter().map(|s| s.question_len), question_max);
        let question_weight: Vec<f32> = question_mask.iter().map(|&m| m as f32).collect();
        let question_len: Vec<f32> = items.iter().map(|s| s.question_len.max(1) as f32).collect();

        let starts: Vec<i32> = items.iter().map(|s| s.answer_start as i32).collect();
        let ends:   Vec<i32> = items.iter().map(|s| s.answer_end as i32).collect();

        let context_ids = Tensor::<B, 1, Int>::from_ints(context_flat.as_slice(), &self.device)
            .reshape([batch_size, context_max]);
        let question_ids = Tensor::<B, 1, Int>::from_ints(question_flat.as_slice(), &self.device)
            .reshape([batch_size, question_max]);

        let context_pad = Tensor::<B, 1, Int>::from_ints(context_mask.as_slice(), &self.device)
            .reshape([batch_size, context_max])
            .equal_elem(0);
        let question_pad = Tensor::<B, 1, Int>::from_ints(question_mask.as_slice(), &self.device)
            .reshape([batch_size, question_max])
            .equal_elem(0);

        let question_weight = Tensor::<B, 1>::from_floats(question_weight.as_slice(), &self.device)
            .reshape([batch_size, question_max]);
        let question_len = Tensor::<B, 1>::from_floats(question_len.as_slice(), &self.device)
            .reshape([batch_size, 1]);

        SpanBatch {
            context_ids,
            context_pad,
            question_ids,
            question_pad,
            question_weight,
            question_len,
            start_positions: Tensor::<B, 1, Int>::from_ints(starts.as_slice(), &self.device),
            end_positions:   Tensor::<B, 1, Int>::from_ints(ends.as_slice(), &self.device),
        }
    }
}

impl<B: Backend> Batcher<EncodedExample, SpanBatch<B>> for SpanBatcher<B> {
    fn batch(&self, items: Vec<EncodedExample>) -> SpanBatch<B> {
        self.build(&items)
    }
}

/// Row-major 1/0 mask: 1 for the first `len` positions of each row.
fn length_mask(lengths: impl Iterator<Item = usize>, max_len: usize) -> Vec<i32> {
    lengths
        .flat_map(|len| (0..max_len).map(move |i| i32::from(i < len)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn example(context_len: usize, question_len: usize) -> EncodedExample {
        EncodedExample {
            qa_id:          "q".into(),
            context_ids:    vec![5; 4],
            context_len,
            question_ids:   vec![7; 3],
            question_len,
            answer_start:   0,
            answer_end:     context_len - 1,
            context_tokens: vec!["w".to_string(); context_len].into(),
            gold_answers:   vec!["w".into()],
        }
    }

    #[test]
    fn test_length_mask() {
        assert_eq!(length_mask([2usize, 0].into_iter(), 3), vec![1, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_batch_shapes_and_masks() {
        let batcher = SpanBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![example(2, 1), example(4, 3)]);

        assert_eq!(batch.context_ids.dims(), [2, 4]);
        assert_eq!(batch.question_ids.dims(), [2, 3]);
        assert_eq!(batch.start_positions.dims(), [2]);

        let pads: Vec<bool> = batch.context_pad.into_data().to_vec::<bool>().unwrap();
        assert_eq!(pads, vec![false, false, true, true, false, false, false, false]);

        let ends: Vec<i64> = batch.end_positions.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(ends, vec![1, 3]);
    }
}
