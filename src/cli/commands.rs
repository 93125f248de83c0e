// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands: `init-model`, `evaluate` and `sweep`.
//
// clap's derive macros generate --help, error messages for missing
// args and the string → number conversions.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::evaluate_use_case::{EvalConfig, EvalInputs};
use crate::domain::labels::LabelPolicy;
use crate::ml::context::DeviceKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a freshly initialised classifier artifact
    InitModel(InitModelArgs),

    /// Report on a dataset before and after an FGSM attack
    Evaluate(EvaluateArgs),

    /// Attack over a range of epsilons and log accuracy per step
    Sweep(SweepArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arch {
    /// Flatten → Linear(784,128) → ReLU → Linear(128,N)
    Mlp,
    /// Two 3x3 conv + ReLU + 2x2 max-pool blocks, then Linear
    Cnn,
}

#[derive(Args, Debug)]
pub struct InitModelArgs {
    /// Where to write the artifact
    #[arg(long)]
    pub out: PathBuf,

    #[arg(long, value_enum, default_value_t = Arch::Mlp)]
    pub arch: Arch,

    /// Number of output classes
    #[arg(long, default_value_t = 10)]
    pub classes: usize,

    /// Mark the graph as frozen: inference works, FGSM reports
    /// a gradient error
    #[arg(long)]
    pub frozen: bool,

    #[arg(long)]
    pub name: Option<String>,
}

/// Flags shared by `evaluate` and `sweep`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Classifier artifact produced by init-model
    #[arg(long)]
    pub model: PathBuf,

    /// CSV: label followed by 784 pixel intensities per row
    #[arg(long)]
    pub dataset: PathBuf,

    /// JSON object of class index → display name
    #[arg(long)]
    pub labels: Option<PathBuf>,

    /// cpu (reproducible) or wgpu (GPU)
    #[arg(long, default_value = "cpu")]
    pub device: DeviceKind,

    /// Images per forward pass
    #[arg(long, default_value_t = 256)]
    pub batch_size: usize,

    #[arg(long, default_value = "reports")]
    pub output_dir: String,

    /// Drop existing label names when the class count changes
    #[arg(long)]
    pub reset_labels: bool,

    /// Load device, batch size, epsilon, label policy and output
    /// directory from a JSON file instead of the flags above
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Perturbation magnitude in [0, 0.5]
    #[arg(long, default_value_t = 0.0)]
    pub epsilon: f32,
}

#[derive(Args, Debug)]
pub struct SweepArgs {
    #[command(flatten)]
    pub run: RunArgs,

    #[arg(long, default_value_t = 0.0)]
    pub from: f32,

    #[arg(long, default_value_t = 0.5)]
    pub to: f32,

    #[arg(long, default_value_t = 0.05)]
    pub step: f32,
}

/// Convert CLI flags into the application-layer EvalConfig.
/// The application layer never sees clap types.
impl From<&EvaluateArgs> for EvalConfig {
    fn from(a: &EvaluateArgs) -> Self {
        EvalConfig { epsilon: a.epsilon, ..EvalConfig::from(&a.run) }
    }
}

impl From<&RunArgs> for EvalConfig {
    fn from(a: &RunArgs) -> Self {
        EvalConfig {
            device:       a.device,
            batch_size:   a.batch_size,
            epsilon:      0.0,
            label_policy: if a.reset_labels { LabelPolicy::Reset } else { LabelPolicy::Merge },
            output_dir:   a.output_dir.clone(),
        }
    }
}

impl From<&RunArgs> for EvalInputs {
    fn from(a: &RunArgs) -> Self {
        EvalInputs {
            model:   a.model.clone(),
            dataset: a.dataset.clone(),
            labels:  a.labels.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_evaluate_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "fgsm-lab", "evaluate", "--model", "m.fgsm", "--dataset", "d.csv",
            "--epsilon", "0.2", "--device", "wgpu", "--reset-labels",
        ])
        .unwrap();
        let Commands::Evaluate(args) = cli.command else { panic!("expected evaluate") };
        let cfg = EvalConfig::from(&args);
        assert_eq!(cfg.epsilon, 0.2);
        assert_eq!(cfg.device, DeviceKind::Wgpu);
        assert_eq!(cfg.label_policy, LabelPolicy::Reset);
        assert_eq!(cfg.batch_size, 256);
    }

    #[test]
    fn test_sweep_defaults() {
        let cli = Cli::try_parse_from(["fgsm-lab", "sweep", "--model", "m", "--dataset", "d"]).unwrap();
        let Commands::Sweep(args) = cli.command else { panic!("expected sweep") };
        assert_eq!((args.from, args.to, args.step), (0.0, 0.5, 0.05));
        assert_eq!(args.run.output_dir, "reports");
    }

    #[test]
    fn test_init_model_arch_flag() {
        let cli = Cli::try_parse_from(["fgsm-lab", "init-model", "--out", "x", "--arch", "cnn", "--frozen"]).unwrap();
        let Commands::InitModel(args) = cli.command else { panic!("expected init-model") };
        assert_eq!(args.arch, Arch::Cnn);
        assert!(args.frozen);
        assert_eq!(args.classes, 10);
    }
}
