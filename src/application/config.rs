// ============================================================
// Layer 2 — Run Configuration
// ============================================================
// Every option for a training run lives in one typed record.
// It is built once at startup (defaults → optional JSON file →
// CLI overrides), validated once, and then passed by reference.
// Nothing reads global flag state.
//
// Serialisable so the resolved config can be stored next to a
// checkpoint and reloaded by the `evaluate` command.

use std::{fmt, fs, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::error::{QaError, Result};

// ─── Enumerated Options ──────────────────────────────────────────────────────

/// Which span-prediction architecture a trial builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Passage encoding concatenated with a pooled question vector
    Basic,
    /// Passage encoding matched against the question with attention
    Attentive,
}

impl ModelKind {
    /// One-letter tag used in generated model names
    pub fn tag(self) -> &'static str {
        match self {
            ModelKind::Basic     => "b",
            ModelKind::Attentive => "a",
        }
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" | "b"     => Ok(ModelKind::Basic),
            "attentive" | "a" => Ok(ModelKind::Attentive),
            other => Err(format!("unknown model kind '{other}' (expected basic or attentive)")),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Basic     => write!(f, "basic"),
            ModelKind::Attentive => write!(f, "attentive"),
        }
    }
}

/// What to do with pretrained tokens the training corpus never used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OovPolicy {
    /// Skip them; the vocabulary stays exactly the training vocabulary
    Ignore,
    /// Append them to the vocabulary in file order
    Extend,
}

impl FromStr for OovPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(OovPolicy::Ignore),
            "extend" => Ok(OovPolicy::Extend),
            other => Err(format!("unknown oov policy '{other}' (expected ignore or extend)")),
        }
    }
}

/// Initial vector for vocabulary tokens missing from the pretrained file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FallbackInit {
    Zero,
    /// U(-scale, scale) from an RNG seeded with the run seed
    Uniform { scale: f32 },
}

// ─── RunConfig ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    // model
    pub model_kind:      ModelKind,
    pub batch_size:      usize,
    pub dim_embed_word:  usize,
    pub dim_rnn_cell:    usize,
    pub dim_hidden:      usize,
    pub rnn_dropout:     f64,
    pub hidden_dropout:  f64,
    pub embed_dropout:   f64,
    pub embed_trainable: bool,

    // optimisation
    pub learning_rate: f64,
    /// Multiplier applied to the learning rate on each stagnant evaluation
    pub lr_decay:      f64,
    pub max_grad_norm: f64,

    // schedule
    pub train_epoch:    usize,
    /// Evaluate on the dev set every `test_epoch` epochs
    pub test_epoch:     usize,
    /// Number of trials (only the first runs unless sample_params)
    pub validation_cnt: usize,
    pub progress_every: usize,

    // sequence lengths; 0 means "longest observed in training data"
    pub context_maxlen:  usize,
    pub question_maxlen: usize,

    // early stopping
    pub early_stop:           bool,
    pub early_stop_tolerance: f64,
    pub early_stop_patience:  usize,

    // run switches
    pub train:         bool,
    pub save:          bool,
    pub load:          bool,
    pub load_name:     String,
    pub sample_params: bool,
    pub seed:          u64,

    // embeddings
    pub oov_policy:    OovPolicy,
    pub fallback_init: FallbackInit,

    // data and output paths
    pub expected_version: String,
    pub train_path:       String,
    pub dev_path:         String,
    pub glove_path:       String,
    pub checkpoint_dir:   String,
    pub validation_path:  String,
    pub pred_path:        String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model_kind:      ModelKind::Basic,
            batch_size:      32,
            dim_embed_word:  300,
            dim_rnn_cell:    100,
            dim_hidden:      100,
            rnn_dropout:     0.5,
            hidden_dropout:  0.5,
            embed_dropout:   0.2,
            embed_trainable: false,

            learning_rate: 0.00162,
            lr_decay:      0.5,
            max_grad_norm: 5.0,

            train_epoch:    10,
            test_epoch:     1,
            validation_cnt: 100,
            progress_every: 5,

            context_maxlen:  0,
            question_maxlen: 0,

            early_stop:           false,
            early_stop_tolerance: 0.01,
            early_stop_patience:  3,

            train:         true,
            save:          false,
            load:          false,
            load_name:     "b300_default".to_string(),
            sample_params: false,
            seed:          42,

            oov_policy:    OovPolicy::Ignore,
            fallback_init: FallbackInit::Uniform { scale: 0.1 },

            expected_version: "1.1".to_string(),
            train_path:       "data/train-v1.1.json".to_string(),
            dev_path:         "data/dev-v1.1.json".to_string(),
            glove_path:       "data/glove.6B.300d.txt".to_string(),
            checkpoint_dir:   "result/ckpt".to_string(),
            validation_path:  "result/validation.txt".to_string(),
            pred_path:        "result/dev-v1.1-pred.json".to_string(),
        }
    }
}

impl RunConfig {
    /// Read a (possibly partial) JSON config; absent fields keep defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| QaError::io(e, path))?;
        serde_json::from_str(&text).map_err(|e| {
            QaError::Configuration(format!("cannot parse {}: {e}", path.display()))
        })
    }

    /// Check every range and cross-field constraint.
    /// Called once at startup, before any data is touched.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, v: usize) -> Result<()> {
            if v == 0 {
                return Err(QaError::Configuration(format!("{name} must be greater than zero")));
            }
            Ok(())
        }
        fn probability(name: &str, p: f64) -> Result<()> {
            if !(0.0..1.0).contains(&p) {
                return Err(QaError::Configuration(format!("{name} must be in [0, 1), got {p}")));
            }
            Ok(())
        }
        fn non_empty(name: &str, v: &str) -> Result<()> {
            if v.trim().is_empty() {
                return Err(QaError::Configuration(format!("{name} must not be empty")));
            }
            Ok(())
        }

        positive("batch_size", self.batch_size)?;
        positive("dim_embed_word", self.dim_embed_word)?;
        positive("dim_rnn_cell", self.dim_rnn_cell)?;
        positive("dim_hidden", self.dim_hidden)?;
        positive("train_epoch", self.train_epoch)?;
        positive("test_epoch", self.test_epoch)?;
        positive("validation_cnt", self.validation_cnt)?;
        positive("progress_every", self.progress_every)?;

        probability("rnn_dropout", self.rnn_dropout)?;
        probability("hidden_dropout", self.hidden_dropout)?;
        probability("embed_dropout", self.embed_dropout)?;

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(QaError::Configuration(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if !(self.lr_decay > 0.0 && self.lr_decay <= 1.0) {
            return Err(QaError::Configuration(format!(
                "lr_decay must be in (0, 1], got {}",
                self.lr_decay
            )));
        }
        if !(self.max_grad_norm.is_finite() && self.max_grad_norm > 0.0) {
            return Err(QaError::Configuration(format!(
                "max_grad_norm must be a positive number, got {}",
                self.max_grad_norm
            )));
        }
        if self.test_epoch > self.train_epoch {
            return Err(QaError::Configuration(format!(
                "test_epoch ({}) exceeds train_epoch ({}), the dev set would never be evaluated",
                self.test_epoch, self.train_epoch
            )));
        }
        if !(self.early_stop_tolerance.is_finite() && self.early_stop_tolerance >= 0.0) {
            return Err(QaError::Configuration(format!(
                "early_stop_tolerance must be non-negative, got {}",
                self.early_stop_tolerance
            )));
        }
        if self.early_stop && self.early_stop_patience == 0 {
            return Err(QaError::Configuration(
                "early_stop_patience must be > 0 when early_stop is enabled".into(),
            ));
        }
        if let FallbackInit::Uniform { scale } = self.fallback_init {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(QaError::Configuration(format!(
                    "fallback uniform scale must be positive, got {scale}"
                )));
            }
        }
        if !self.train && !self.load {
            return Err(QaError::Configuration(
                "train = false requires load = true, otherwise an untrained model is evaluated".into(),
            ));
        }
        if self.load {
            non_empty("load_name", &self.load_name)?;
        }

        non_empty("expected_version", &self.expected_version)?;
        non_empty("train_path", &self.train_path)?;
        non_empty("dev_path", &self.dev_path)?;
        non_empty("glove_path", &self.glove_path)?;
        non_empty("checkpoint_dir", &self.checkpoint_dir)?;
        non_empty("validation_path", &self.validation_path)?;
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let cfg = RunConfig { batch_size: 0, ..RunConfig::default() };
        assert!(matches!(cfg.validate(), Err(QaError::Configuration(_))));
    }

    #[test]
    fn test_dropout_out_of_range_is_rejected() {
        let cfg = RunConfig { hidden_dropout: 1.0, ..RunConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_evaluate_only_needs_a_checkpoint() {
        let cfg = RunConfig { train: false, load: false, ..RunConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = RunConfig { train: false, load: true, ..RunConfig::default() };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_early_stop_needs_patience() {
        let cfg = RunConfig { early_stop: true, early_stop_patience: 0, ..RunConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, r#"{ "batch_size": 4, "model_kind": "attentive" }"#).unwrap();

        let cfg = RunConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.batch_size, 4);
        assert_eq!(cfg.model_kind, ModelKind::Attentive);
        assert_eq!(cfg.dim_embed_word, 300);
    }

    #[test]
    fn test_model_kind_parses_tags_and_names() {
        assert_eq!("b".parse::<ModelKind>().unwrap(), ModelKind::Basic);
        assert_eq!("Attentive".parse::<ModelKind>().unwrap(), ModelKind::Attentive);
        assert!("q".parse::<ModelKind>().is_err());
    }
}
