// ============================================================
// Layer 5 — Epoch Controller
// ============================================================
// Decides after each held-out evaluation whether a trial keeps
// going, lowers its learning rate, or stops.
//
//                 improved
//        ┌──────────────────────────┐
//        ▼                          │
//   ┌─────────┐  stagnant  ┌──────────┐  count > patience  ┌─────────┐
//   │ Running │ ─────────► │ Decaying │ ─────────────────► │ Stopped │
//   └─────────┘            └──────────┘                    └─────────┘
//                           stagnant ⟲ (lr *= decay each time)
//
// "Improved" means f1 > best_f1 + tolerance. With early stopping
// disabled a stagnant evaluation only updates bookkeeping.

use crate::application::config::RunConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Running,
    Decaying,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarlyStopPolicy {
    pub enabled:   bool,
    pub tolerance: f64,
    pub patience:  usize,
    pub decay:     f64,
}

impl EarlyStopPolicy {
    pub fn from_config(cfg: &RunConfig) -> Self {
        Self {
            enabled:   cfg.early_stop,
            tolerance: cfg.early_stop_tolerance,
            patience:  cfg.early_stop_patience,
            decay:     cfg.lr_decay,
        }
    }
}

/// Bookkeeping for one trial. Created fresh per trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRunState {
    pub epoch:         usize,
    pub learning_rate: f64,
    pub best_em:       f64,
    pub best_f1:       f64,
    pub best_epoch:    usize,
    pub stale_evals:   usize,
}

/// Outcome of feeding one evaluation to the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Improved,
    /// Stagnant but early stopping is off
    Unchanged,
    Decayed { from: f64, to: f64 },
    Stop { from: f64, to: f64 },
}

#[derive(Debug, Clone)]
pub struct EpochController {
    policy: EarlyStopPolicy,
    state:  ControllerState,
    run:    TrainingRunState,
    decays: usize,
}

impl EpochController {
    pub fn new(initial_lr: f64, policy: EarlyStopPolicy) -> Self {
        Self {
            policy,
            state: ControllerState::Running,
            run: TrainingRunState {
                epoch:         0,
                learning_rate: initial_lr,
                best_em:       0.0,
                best_f1:       0.0,
                best_epoch:    0,
                stale_evals:   0,
            },
            decays: 0,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn run_state(&self) -> &TrainingRunState {
        &self.run
    }

    pub fn learning_rate(&self) -> f64 {
        self.run.learning_rate
    }

    pub fn decays(&self) -> usize {
        self.decays
    }

    pub fn is_stopped(&self) -> bool {
        self.state == ControllerState::Stopped
    }

    /// Record one held-out evaluation.
    /// Evaluations after Stopped are ignored.
    pub fn observe(&mut self, epoch: usize, em: f64, f1: f64) -> Decision {
        if self.is_stopped() {
            let lr = self.run.learning_rate;
            return Decision::Stop { from: lr, to: lr };
        }
        self.run.epoch = epoch;

        if f1 > self.run.best_f1 + self.policy.tolerance {
            self.run.best_em     = em;
            self.run.best_f1     = f1;
            self.run.best_epoch  = epoch;
            self.run.stale_evals = 0;
            self.state = ControllerState::Running;
            return Decision::Improved;
        }

        if !self.policy.enabled {
            return Decision::Unchanged;
        }

        self.run.stale_evals += 1;
        let from = self.run.learning_rate;
        let to   = from * self.policy.decay;
        self.run.learning_rate = to;
        self.decays += 1;

        if self.run.stale_evals > self.policy.patience {
            self.state = ControllerState::Stopped;
            Decision::Stop { from, to }
        } else {
            self.state = ControllerState::Decaying;
            Decision::Decayed { from, to }
        }
    }
}
