// ============================================================
// Layer 5 — Burn Span Model
// ============================================================
// Adapts SpanNet + Adam to the SpanModel contract so the
// batching loop can drive it without touching tensors.
//
//   Mode::Train    → batch on B (autodiff), forward, backward,
//                    one Adam step with gradient-norm clipping,
//                    then the batch is re-scored with the updated
//                    parameters (dropout off); the reported loss
//                    is the pre-update training loss
//   Mode::Evaluate → model.valid() on B::InnerBackend,
//                    dropout off, no gradients, no update
//
// One BurnSpanModel lives for exactly one trial. reset() puts
// the network back to its pretrained-embedding initialisation
// and rebuilds the optimiser, so no Adam moments leak.
//
// Reference: Burn Book §5 (Custom Training Loop)

use std::{path::Path, sync::Arc};

use anyhow::{anyhow, Result};
use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::config::RunConfig;
use crate::data::{batcher::SpanBatcher, embedding::EmbeddingMatrix};
use crate::domain::{
    example::EncodedExample,
    traits::{Mode, SpanModel, StepOutput},
};
use crate::infra::checkpoint::{load_module, save_module};
use crate::ml::model::{SpanLogits, SpanNet, SpanNetConfig};

pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

pub struct BurnSpanModel<B: AutodiffBackend, O> {
    net_config:    SpanNetConfig,
    embeddings:    Arc<EmbeddingMatrix>,
    net:           SpanNet<B>,
    optim:         O,
    new_optim:     Box<dyn Fn() -> O>,
    train_batcher: SpanBatcher<B>,
    eval_batcher:  SpanBatcher<B::InnerBackend>,
    device:        B::Device,
    learning_rate: f64,
}

/// Network hyperparameters taken from a run configuration.
pub fn net_config(cfg: &RunConfig, vocab_size: usize) -> SpanNetConfig {
    SpanNetConfig::new(cfg.model_kind, vocab_size, cfg.dim_embed_word, cfg.dim_rnn_cell, cfg.dim_hidden)
        .with_embed_dropout(cfg.embed_dropout)
        .with_rnn_dropout(cfg.rnn_dropout)
        .with_hidden_dropout(cfg.hidden_dropout)
        .with_embed_trainable(cfg.embed_trainable)
}

/// Build a fresh model for one trial.
/// The embedding table is initialised from `embeddings`.
pub fn build_span_model<B: AutodiffBackend>(
    cfg:        &RunConfig,
    embeddings: Arc<EmbeddingMatrix>,
    device:     B::Device,
) -> BurnSpanModel<B, impl Optimizer<SpanNet<B>, B>> {
    B::seed(cfg.seed);

    let net_config = net_config(cfg, embeddings.rows());
    let net        = net_config.init_with_embeddings::<B>(&embeddings, &device);

    let adam = AdamConfig::new()
        .with_epsilon(1e-8)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(cfg.max_grad_norm as f32)));
    let new_optim: Box<dyn Fn() -> _> = Box::new(move || adam.init::<B, SpanNet<B>>());
    let optim = new_optim();

    tracing::info!(
        "Model ready: {} encoder, rnn_cell={}, hidden={}, vocab={}",
        cfg.model_kind, cfg.dim_rnn_cell, cfg.dim_hidden, embeddings.rows()
    );

    BurnSpanModel {
        net_config,
        embeddings,
        net,
        optim,
        new_optim,
        train_batcher: SpanBatcher::new(device.clone()),
        eval_batcher:  SpanBatcher::new(device.clone()),
        device,
        learning_rate: cfg.learning_rate,
    }
}

impl<B: AutodiffBackend, O: Optimizer<SpanNet<B>, B>> SpanModel for BurnSpanModel<B, O> {
    fn step(&mut self, examples: &[EncodedExample], mode: Mode) -> Result<StepOutput> {
        match mode {
            Mode::Train => {
                let batch = self.train_batcher.build(examples);
                let (loss, _) = self.net.forward_loss(&batch);
                let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

                // Backward pass + Adam update
                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &self.net);
                self.net  = self.optim.step(self.learning_rate, self.net.clone(), grads);

                let logits = self.net.valid().forward(&self.eval_batcher.build(examples));
                step_output(loss_val, logits)
            }
            Mode::Evaluate => {
                let net   = self.net.valid();
                let batch = self.eval_batcher.build(examples);
                let (loss, logits) = net.forward_loss(&batch);
                step_output(loss.into_scalar().elem::<f64>(), logits)
            }
        }
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }

    fn save(&self, path: &Path) -> Result<()> {
        save_module(&self.net, path)
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        self.net = load_module(self.net.clone(), path, &self.device)?;
        tracing::info!("Loaded weights from '{}'", path.display());
        Ok(())
    }

    fn reset(&mut self) {
        self.net   = self.net_config.init_with_embeddings::<B>(&self.embeddings, &self.device);
        self.optim = (self.new_optim)();
    }
}

fn step_output<B: Backend>(loss: f64, logits: SpanLogits<B>) -> Result<StepOutput> {
    Ok(StepOutput {
        loss,
        start_logits: rows(logits.start)?,
        end_logits:   rows(logits.end)?,
    })
}

/// [N, C] tensor → N rows of C values
fn rows<B: Backend>(t: Tensor<B, 2>) -> Result<Vec<Vec<f32>>> {
    let [_, width] = t.dims();
    let flat = t
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("cannot read logits: {e:?}"))?;
    Ok(flat.chunks(width.max(1)).map(<[f32]>::to_vec).collect())
}
