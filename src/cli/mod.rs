// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2. Everything
// printed to stdout is decided here; the use cases only return data.
//
//   1. `init-model` — write an untrained mlp/cnn artifact
//   2. `evaluate`   — before/after reports at one epsilon
//   3. `sweep`      — accuracy across an epsilon grid
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Arch, Commands, EvaluateArgs, InitModelArgs, RunArgs, SweepArgs};

use crate::application::{
    evaluate_use_case::{EvalConfig, EvaluateUseCase},
    session::Panel,
    sweep_use_case::{epsilon_grid, SweepUseCase},
};
use crate::infra::artifact::save_artifact;
use crate::ml::{context::CpuBackend, model::ClassifierSpec};

#[derive(Parser, Debug)]
#[command(
    name = "fgsm-lab",
    version = "0.1.0",
    about = "Evaluate an image classifier before and after an FGSM adversarial perturbation."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match &self.command {
            Commands::InitModel(args) => run_init_model(args),
            Commands::Evaluate(args)  => run_evaluate(args),
            Commands::Sweep(args)     => run_sweep(args),
        }
    }
}

fn run_init_model(args: &InitModelArgs) -> Result<()> {
    let name = args.name.clone().unwrap_or_else(|| format!("{:?}-{}", args.arch, args.classes).to_lowercase());
    let mut spec = match args.arch {
        Arch::Mlp => ClassifierSpec::mlp(name, args.classes),
        Arch::Cnn => ClassifierSpec::cnn(name, args.classes),
    };
    spec.differentiable = !args.frozen;

    let net = spec.init::<CpuBackend>(&Default::default());
    let bytes = save_artifact(&args.out, &spec, &net)?;
    println!("Wrote '{}' ({} bytes) to {}", spec.name, bytes, args.out.display());
    Ok(())
}

/// CLI flags, or the --config file when one is given.
fn base_config(run: &RunArgs) -> Result<EvalConfig> {
    match &run.config {
        Some(path) => EvalConfig::load(path),
        None => Ok(EvalConfig::from(run)),
    }
}

fn run_evaluate(args: &EvaluateArgs) -> Result<()> {
    let config = match &args.run.config {
        Some(path) => EvalConfig::load(path)?,
        None => EvalConfig::from(args),
    };
    tracing::info!("Evaluating '{}' on {:?}", args.run.dataset.display(), config.device);

    let outcome = EvaluateUseCase::new(config.clone(), (&args.run).into()).execute()?;

    print_panel("Before attack", &outcome.before);
    print_panel(&format!("After FGSM (epsilon = {:.3})", outcome.epsilon), &outcome.after);
    println!("\nReports written to {}", config.output_dir);
    Ok(())
}

fn run_sweep(args: &SweepArgs) -> Result<()> {
    let config = base_config(&args.run)?;
    let grid = epsilon_grid(args.from, args.to, args.step)?;
    let rows = SweepUseCase::new(config.clone(), (&args.run).into(), grid).execute()?;

    println!("{:>8} {:>10} {:>10} {:>10} {:>10}", "epsilon", "baseline", "attacked", "drop", "macro F1");
    for r in &rows {
        println!(
            "{:>8.3} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            r.epsilon, r.baseline_acc, r.attacked_acc, r.accuracy_drop(), r.macro_f1
        );
    }
    println!("\nLogged to {}/sweep.csv", config.output_dir);
    Ok(())
}

fn print_panel(title: &str, panel: &Panel) {
    println!("\n=== {title} ===");
    match panel {
        Panel::Rendered(view) => {
            println!("Accuracy: {:.4}\n", view.accuracy);
            print!("{}", view.table);
        }
        Panel::Placeholder(text) => println!("{text}"),
    }
}
