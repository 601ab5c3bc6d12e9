// ============================================================
// Layer 5 — Span Prediction Network
// ============================================================
// Recurrent encoder for extractive Q&A:
//
//   question ids ─► embedding ─► BiLSTM ─► Q  [b, q, 2h]
//   context ids  ─► embedding ─► BiLSTM ─► C  [b, c, 2h]
//
//   Basic:     features = [C ; mean-pooled Q broadcast over c]
//   Attentive: A = softmax(C·Qᵀ)·Q,  features = [C ; A ; C∘A]
//
//   features ─► Linear+ReLU ─► start head / end head ─► [b, c] logits
//
// Padding positions of the context get a large negative logit so
// neither the loss nor the argmax can pick them.

use burn::{
    module::Ignored,
    nn::{
        loss::CrossEntropyLossConfig,
        BiLstm, BiLstmConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{relu, softmax},
};

use crate::application::config::ModelKind;
use crate::data::batcher::SpanBatch;
use crate::data::embedding::EmbeddingMatrix;

const MASKED_LOGIT: f32 = -1.0e9;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct SpanNetConfig {
    pub kind:         ModelKind,
    pub vocab_size:   usize,
    pub dim_embed:    usize,
    pub dim_rnn_cell: usize,
    pub dim_hidden:   usize,
    #[config(default = 0.2)]
    pub embed_dropout: f64,
    #[config(default = 0.5)]
    pub rnn_dropout: f64,
    #[config(default = 0.5)]
    pub hidden_dropout: f64,
    #[config(default = false)]
    pub embed_trainable: bool,
}

impl SpanNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SpanNet<B> {
        let encoded  = 2 * self.dim_rnn_cell;
        let features = match self.kind {
            ModelKind::Basic     => 2 * encoded,
            ModelKind::Attentive => 3 * encoded,
        };

        SpanNet {
            embedding:       EmbeddingConfig::new(self.vocab_size, self.dim_embed).init(device),
            question_rnn:    BiLstmConfig::new(self.dim_embed, self.dim_rnn_cell, true).init(device),
            context_rnn:     BiLstmConfig::new(self.dim_embed, self.dim_rnn_cell, true).init(device),
            hidden:          LinearConfig::new(features, self.dim_hidden).init(device),
            start_head:      LinearConfig::new(self.dim_hidden, 1).init(device),
            end_head:        LinearConfig::new(self.dim_hidden, 1).init(device),
            embed_dropout:   DropoutConfig::new(self.embed_dropout).init(),
            rnn_dropout:     DropoutConfig::new(self.rnn_dropout).init(),
            hidden_dropout:  DropoutConfig::new(self.hidden_dropout).init(),
            kind:            Ignored(self.kind),
            embed_trainable: Ignored(self.embed_trainable),
        }
    }

    /// Initialise and copy `matrix` into the word embedding table.
    pub fn init_with_embeddings<B: Backend>(
        &self,
        matrix: &EmbeddingMatrix,
        device: &B::Device,
    ) -> SpanNet<B> {
        let mut net = self.init(device);
        let weight  = Tensor::<B, 1>::from_floats(matrix.as_slice(), device)
            .reshape([matrix.rows(), matrix.dim()]);
        net.embedding.weight = burn::module::Param::from_tensor(weight);
        net
    }
}

#[derive(Module, Debug)]
pub struct SpanNet<B: Backend> {
    pub embedding:       Embedding<B>,
    pub question_rnn:    BiLstm<B>,
    pub context_rnn:     BiLstm<B>,
    pub hidden:          Linear<B>,
    pub start_head:      Linear<B>,
    pub end_head:        Linear<B>,
    pub embed_dropout:   Dropout,
    pub rnn_dropout:     Dropout,
    pub hidden_dropout:  Dropout,
    pub kind:            Ignored<ModelKind>,
    pub embed_trainable: Ignored<bool>,
}

pub struct SpanLogits<B: Backend> {
    /// [batch, context_max_len]
    pub start: Tensor<B, 2>,
    pub end:   Tensor<B, 2>,
}

impl<B: Backend> SpanNet<B> {
    pub fn forward(&self, batch: &SpanBatch<B>) -> SpanLogits<B> {
        let [batch_size, context_max] = batch.context_ids.dims();

        let q = self.encode(&self.question_rnn, batch.question_ids.clone());
        let c = self.encode(&self.context_rnn, batch.context_ids.clone());
        let encoded = c.dims()[2];

        let features = match *self.kind {
            ModelKind::Basic => {
                let pooled = Self::pool_question(q, batch)
                    .expand([batch_size, context_max, encoded]);
                Tensor::cat(vec![c, pooled], 2)
            }
            ModelKind::Attentive => {
                let attended = Self::attend(c.clone(), q, batch);
                let product  = c.clone() * attended.clone();
                Tensor::cat(vec![c, attended, product], 2)
            }
        };

        let h = self.hidden_dropout.forward(relu(self.hidden.forward(features)));
        let start = self.start_head.forward(h.clone())
            .reshape([batch_size, context_max])
            .mask_fill(batch.context_pad.clone(), MASKED_LOGIT);
        let end = self.end_head.forward(h)
            .reshape([batch_size, context_max])
            .mask_fill(batch.context_pad.clone(), MASKED_LOGIT);

        SpanLogits { start, end }
    }

    /// Loss = (CE_start + CE_end) / 2
    pub fn forward_loss(&self, batch: &SpanBatch<B>) -> (Tensor<B, 1>, SpanLogits<B>) {
        let logits = self.forward(batch);
        let ce = CrossEntropyLossConfig::new().init(&logits.start.device());
        let loss = (ce.forward(logits.start.clone(), batch.start_positions.clone())
                  + ce.forward(logits.end.clone(),   batch.end_positions.clone())) / 2.0_f64;
        (loss, logits)
    }

    fn encode(&self, rnn: &BiLstm<B>, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let embedded = self.embedding.forward(ids);
        // Frozen embeddings: cut the graph so no gradient reaches the table.
        let embedded = if *self.embed_trainable { embedded } else { embedded.detach() };
        let (output, _) = rnn.forward(self.embed_dropout.forward(embedded), None);
        self.rnn_dropout.forward(output)
    }

    /// Mean of the real question positions → [b, 1, 2h]
    fn pool_question(q: Tensor<B, 3>, batch: &SpanBatch<B>) -> Tensor<B, 3> {
        let weights = batch.question_weight.clone().unsqueeze_dim::<3>(2);
        let lengths = batch.question_len.clone().unsqueeze_dim::<3>(2);
        (q * weights).sum_dim(1) / lengths
    }

    /// Context-to-question attention → [b, c, 2h]
    fn attend(c: Tensor<B, 3>, q: Tensor<B, 3>, batch: &SpanBatch<B>) -> Tensor<B, 3> {
        let [batch_size, context_max, _] = c.dims();
        let question_max = q.dims()[1];

        let scores = c.matmul(q.clone().swap_dims(1, 2));
        let pad = batch.question_pad.clone()
            .unsqueeze_dim::<3>(1)
            .expand([batch_size, context_max, question_max]);
        softmax(scores.mask_fill(pad, MASKED_LOGIT), 2).matmul(q)
    }
}
