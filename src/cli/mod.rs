//! Command-line parsing for the credit-risk estimators.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code. Every model knob can also be set from
//! the environment (or a `.env` file).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "cr",
    version,
    about = "Bayesian credit-risk estimators (PD, LGD, time to default)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Train PD/LGD/hazard models on a loan-book CSV and score the book.
    Train(TrainArgs),
    /// Predict PD, LGD and expected loss for a hypothetical loan.
    Predict(PredictArgs),
    /// Survival probability and hazard rate at a horizon (months).
    Survival(SurvivalArgs),
    /// Train and score on a synthetic loan book.
    Demo(DemoArgs),
}

/// Monte Carlo options shared by every command that predicts PD.
#[derive(Debug, Args, Clone)]
pub struct SamplingArgs {
    /// Posterior draws per PD prediction.
    #[arg(long, env = "CR_SAMPLES", default_value_t = 1000)]
    pub samples: usize,

    /// Seed for posterior draws (omit for a fresh seed per run).
    #[arg(id = "mc_seed", long = "mc-seed", env = "CR_SEED")]
    pub seed: Option<u64>,
}

/// Prior and optimizer options for training.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Precision of the Gaussian prior on PD weights.
    #[arg(long, env = "CR_PRIOR_PRECISION", default_value_t = 1.0)]
    pub prior_precision: f64,

    /// LGD prior Beta alpha.
    #[arg(long, env = "CR_LGD_ALPHA", default_value_t = 2.0)]
    pub lgd_alpha: f64,

    /// LGD prior Beta beta.
    #[arg(long, env = "CR_LGD_BETA", default_value_t = 2.0)]
    pub lgd_beta: f64,

    /// Optimizer iteration cap (default: 200 x number of weights).
    #[arg(long, env = "CR_MAX_ITER")]
    pub max_iter: Option<usize>,

    #[command(flatten)]
    pub sampling: SamplingArgs,
}

/// Where to write training outputs.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Save the trained models to JSON.
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Export per-loan metrics to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Show top-N loans by expected loss.
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    /// Loan-book CSV.
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    /// Model JSON written by `cr train --save`.
    #[arg(short = 'm', long)]
    pub model: PathBuf,

    /// principal,monthly_rate,tenure_months,monthly_income
    #[arg(long, value_delimiter = ',', num_args = 1.., allow_negative_numbers = true)]
    pub features: Vec<f64>,

    #[command(flatten)]
    pub sampling: SamplingArgs,
}

#[derive(Debug, Args, Clone)]
pub struct SurvivalArgs {
    /// Model JSON written by `cr train --save`.
    #[arg(short = 'm', long)]
    pub model: PathBuf,

    /// Horizon in months.
    #[arg(short = 't', long = "t")]
    pub t: f64,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Number of synthetic loans.
    #[arg(short = 'n', long, default_value_t = 500)]
    pub loans: usize,

    /// Seed for the synthetic book.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_predict_features() {
        let cli = Cli::try_parse_from([
            "cr",
            "predict",
            "--model",
            "m.json",
            "--features",
            "1000,0.05,12,400",
            "--samples",
            "50",
        ])
        .unwrap();
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(args.features, vec![1000.0, 0.05, 12.0, 400.0]);
        assert_eq!(args.sampling.samples, 50);
    }

    #[test]
    fn demo_defaults() {
        let cli = Cli::try_parse_from(["cr", "demo"]).unwrap();
        let Command::Demo(args) = cli.command else {
            panic!("expected demo");
        };
        assert_eq!(args.loans, 500);
        assert_eq!(args.seed, 42);
        assert_eq!(args.output.top, 10);
    }
}
