//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs logging
//! - parses CLI arguments
//! - trains/scores through the shared pipeline
//! - prints reports and writes optional exports

use std::path::Path;

use chrono::Utc;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, DemoArgs, ModelArgs, OutputArgs, PredictArgs, SurvivalArgs, TrainArgs};
use crate::domain::RiskConfig;
use crate::error::AppError;
use crate::io::{
    ModelSnapshot, load_loan_book, read_model_json, write_metrics_csv, write_model_json,
};
use crate::report::format::{
    format_loan_prediction, format_portfolio, format_survival, format_training_summary,
};

pub mod pipeline;

/// Entry point for the `cr` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Train(args) => handle_train(args),
        Command::Predict(args) => handle_predict(args),
        Command::Survival(args) => handle_survival(args),
        Command::Demo(args) => handle_demo(args),
    }
}

/// Logs go to stderr so report output on stdout stays pipeable.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let config = risk_config_from_args(&args.model)?;
    let ingested = load_loan_book(&args.input)?;
    for row in &ingested.row_errors {
        warn!(
            line = row.line,
            id = row.id.as_deref().unwrap_or("-"),
            "skipped row: {}",
            row.message
        );
    }
    if !ingested.row_errors.is_empty() {
        eprintln!(
            "Skipped {} of {} row(s); set RUST_LOG=warn for details.",
            ingested.row_errors.len(),
            ingested.rows_read
        );
    }

    let run = pipeline::run_train(&ingested.loans, &config)?;
    finish_run(&run, &args.output)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let mut config = risk_config_from_args(&args.model)?;
    config.seed = config.seed.or(Some(args.seed));

    let book = crate::data::generate_loan_book(args.loans, args.seed)?;
    let run = pipeline::run_train(&book, &config)?;
    finish_run(&run, &args.output)
}

fn finish_run(run: &pipeline::RunOutput, output: &OutputArgs) -> Result<(), AppError> {
    println!("{}", format_training_summary(&run.report, &run.models));
    let top = crate::report::top_by_expected_loss(&run.metrics, output.top);
    println!("{}", format_portfolio(&run.summary, &top));

    if let Some(path) = &output.save {
        let snapshot = ModelSnapshot::from_models(&run.models, Utc::now());
        write_model_json(path, &snapshot)?;
    }
    if let Some(path) = &output.export {
        write_metrics_csv(path, &run.metrics)?;
    }
    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    if args.sampling.samples == 0 {
        return Err(AppError::new(2, "--samples must be > 0."));
    }
    let models = load_models(&args.model)?;
    let mut rng = match args.sampling.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let prediction = crate::fit::scoring::predict_features(
        &models,
        &args.features,
        args.sampling.samples,
        &mut rng,
    )?;
    print!("{}", format_loan_prediction(&prediction));
    Ok(())
}

fn handle_survival(args: SurvivalArgs) -> Result<(), AppError> {
    if !args.t.is_finite() {
        return Err(AppError::new(2, "--t must be a finite number of months."));
    }
    let models = load_models(&args.model)?;
    let result = models.hazard.predict_survival(args.t);
    let rate = models.hazard.hazard_rate(args.t);
    print!("{}", format_survival(args.t, &result, rate));
    Ok(())
}

fn load_models(path: &Path) -> Result<crate::fit::training::TrainedModels, AppError> {
    read_model_json(path)?.into_models()
}

/// Build a validated [`RiskConfig`] from CLI/env options.
pub fn risk_config_from_args(args: &ModelArgs) -> Result<RiskConfig, AppError> {
    if !(args.prior_precision.is_finite() && args.prior_precision > 0.0) {
        return Err(AppError::new(2, "--prior-precision must be finite and > 0."));
    }
    if args.sampling.samples == 0 {
        return Err(AppError::new(2, "--samples must be > 0."));
    }
    let shape_ok = |v: f64| v.is_finite() && v > 0.0;
    if !(shape_ok(args.lgd_alpha) && shape_ok(args.lgd_beta)) {
        return Err(AppError::new(2, "--lgd-alpha and --lgd-beta must be finite and > 0."));
    }
    if args.max_iter == Some(0) {
        return Err(AppError::new(2, "--max-iter must be > 0."));
    }

    Ok(RiskConfig {
        prior_precision: args.prior_precision,
        n_samples: args.sampling.samples,
        lgd_prior_alpha: args.lgd_alpha,
        lgd_prior_beta: args.lgd_beta,
        seed: args.sampling.seed,
        max_iterations: args.max_iter,
    })
}
