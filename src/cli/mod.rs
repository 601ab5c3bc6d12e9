// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and delegates to Layer 2.
//
//   `train`    — one or more training trials on SQuAD data
//   `evaluate` — score a saved model and write predictions
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

use crate::application::config::RunConfig;

#[derive(Parser, Debug)]
#[command(
    name = "squad-span-qa",
    version = "0.1.0",
    about = "Train and evaluate extractive span-prediction models on SQuAD."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand; no computation happens here.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => Self::run_train(args),
            Commands::Evaluate(args) => Self::run_evaluate(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        let cfg = RunConfig::try_from(args)?;
        tracing::info!("Training on '{}', evaluating on '{}'", cfg.train_path, cfg.dev_path);

        let records = TrainUseCase::new(cfg).execute()?;
        if let Some(best) = records
            .iter()
            .max_by(|a, b| a.best_f1.total_cmp(&b.best_f1))
        {
            println!(
                "\nBest trial {}: em={:.2}% f1={:.2}% (epoch {})",
                best.model_name,
                best.best_em * 100.0,
                best.best_f1 * 100.0,
                best.best_epoch,
            );
        }
        Ok(())
    }

    fn run_evaluate(args: EvaluateArgs) -> Result<()> {
        use crate::application::evaluate_use_case::EvaluateUseCase;

        EvaluateUseCase::new(args.checkpoint_dir, args.model, args.dev_path, args.pred_path)
            .execute()?;
        Ok(())
    }
}
