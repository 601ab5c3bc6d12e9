// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands: `train` and `evaluate`.
//
// `train` settings resolve in three steps:
//   RunConfig::default() → --config JSON file → individual flags
// Every flag is optional so an unset flag never clobbers a value
// from the JSON file. Switches take an optional value:
//   --save          → true
//   --save false    → false, even when the JSON file says true
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::config::{ModelKind, OovPolicy, RunConfig};
use crate::domain::error::QaError;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train span-prediction models on a SQuAD training set
    Train(TrainArgs),

    /// Score a saved model on a dev set and write predictions
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug, Default)]
pub struct TrainArgs {
    /// JSON file with RunConfig fields; missing fields keep defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Architecture: basic or attentive
    #[arg(long)]
    pub model_kind: Option<ModelKind>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub learning_rate: Option<f64>,

    #[arg(long)]
    pub dim_embed_word: Option<usize>,

    #[arg(long)]
    pub dim_rnn_cell: Option<usize>,

    #[arg(long)]
    pub dim_hidden: Option<usize>,

    /// Number of passes over the training set per trial
    #[arg(long)]
    pub train_epoch: Option<usize>,

    /// Evaluate on the dev set every N epochs
    #[arg(long)]
    pub test_epoch: Option<usize>,

    /// Number of trials when sampling hyperparameters
    #[arg(long)]
    pub validation_cnt: Option<usize>,

    /// Context length cap (0 = longest training context)
    #[arg(long)]
    pub context_maxlen: Option<usize>,

    /// Question length cap (0 = longest training question)
    #[arg(long)]
    pub question_maxlen: Option<usize>,

    /// Halve the learning rate on stagnation and stop after the patience runs out
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub early_stop: Option<bool>,

    #[arg(long)]
    pub early_stop_patience: Option<usize>,

    /// Sample a learning rate per trial
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub sample_params: Option<bool>,

    /// Save weights whenever dev F1 improves
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub save: Option<bool>,

    /// Start from the saved model named by --load-name
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub load: Option<bool>,

    #[arg(long)]
    pub load_name: Option<String>,

    /// `--train false` skips training epochs (requires --load)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub train: Option<bool>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub embed_trainable: Option<bool>,

    /// Pretrained tokens missing from the vocabulary: ignore or extend
    #[arg(long)]
    pub oov_policy: Option<OovPolicy>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub train_path: Option<String>,

    #[arg(long)]
    pub dev_path: Option<String>,

    #[arg(long)]
    pub glove_path: Option<String>,

    #[arg(long)]
    pub checkpoint_dir: Option<String>,

    #[arg(long)]
    pub validation_path: Option<String>,
}

/// Convert CLI TrainArgs into the application-layer RunConfig.
/// The application layer never sees clap types.
impl TryFrom<TrainArgs> for RunConfig {
    type Error = QaError;

    fn try_from(a: TrainArgs) -> Result<Self, Self::Error> {
        let mut cfg = match &a.config {
            Some(path) => RunConfig::from_json_file(path)?,
            None       => RunConfig::default(),
        };

        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }

        set(&mut cfg.model_kind,          a.model_kind);
        set(&mut cfg.batch_size,          a.batch_size);
        set(&mut cfg.learning_rate,       a.learning_rate);
        set(&mut cfg.dim_embed_word,      a.dim_embed_word);
        set(&mut cfg.dim_rnn_cell,        a.dim_rnn_cell);
        set(&mut cfg.dim_hidden,          a.dim_hidden);
        set(&mut cfg.train_epoch,         a.train_epoch);
        set(&mut cfg.test_epoch,          a.test_epoch);
        set(&mut cfg.validation_cnt,      a.validation_cnt);
        set(&mut cfg.context_maxlen,      a.context_maxlen);
        set(&mut cfg.question_maxlen,     a.question_maxlen);
        set(&mut cfg.early_stop_patience, a.early_stop_patience);
        set(&mut cfg.load_name,           a.load_name);
        set(&mut cfg.oov_policy,          a.oov_policy);
        set(&mut cfg.seed,                a.seed);
        set(&mut cfg.train_path,          a.train_path);
        set(&mut cfg.dev_path,            a.dev_path);
        set(&mut cfg.glove_path,          a.glove_path);
        set(&mut cfg.checkpoint_dir,      a.checkpoint_dir);
        set(&mut cfg.validation_path,     a.validation_path);

        set(&mut cfg.early_stop,          a.early_stop);
        set(&mut cfg.sample_params,       a.sample_params);
        set(&mut cfg.save,                a.save);
        set(&mut cfg.load,                a.load);
        set(&mut cfg.train,               a.train);
        set(&mut cfg.embed_trainable,     a.embed_trainable);

        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Name of the saved model (file stem inside the checkpoint dir)
    #[arg(long)]
    pub model: String,

    /// Directory where `train --save` stored the checkpoint
    #[arg(long, default_value = "result/ckpt")]
    pub checkpoint_dir: String,

    /// Dev set to score (defaults to the one used in training)
    #[arg(long)]
    pub dev_path: Option<String>,

    /// Where to write {qa_id: answer} predictions
    #[arg(long)]
    pub pred_path: Option<String>,
}
