// ============================================================
// Layer 2 — SweepUseCase
// ============================================================
// Robustness curve: accuracy of one classifier on one dataset as ε
// walks a grid, e.g. 0.00, 0.05, ..., 0.50. The baseline is computed
// once; every grid point is an independent FGSM run, so any single
// row can be reproduced on its own with `evaluate --epsilon`.

use anyhow::{ensure, Result};
use burn::tensor::backend::AutodiffBackend;
use std::path::Path;

use crate::application::evaluate_use_case::{open_session, EvalConfig, EvalInputs};
use crate::infra::metrics::{MetricsLogger, SweepMetrics};
use crate::ml::attack::MAX_EPSILON;
use crate::ml::context::{DeviceKind, ExecutionContext};

/// Most points a single sweep may run; each one is a full FGSM pass.
pub const MAX_GRID_POINTS: usize = 1_000;

/// Inclusive grid from..=to in steps of `step`. The last point is
/// kept when it lands within 1e-6 of `to`.
pub fn epsilon_grid(from: f32, to: f32, step: f32) -> Result<Vec<f32>> {
    ensure!(step > 0.0 && step.is_finite(), "step must be positive, got {step}");
    ensure!(
        (0.0..=MAX_EPSILON).contains(&from) && (0.0..=MAX_EPSILON).contains(&to),
        "epsilon range must lie within [0, {MAX_EPSILON}], got {from}..{to}"
    );
    ensure!(from <= to, "sweep start {from} is after its end {to}");

    let (from, to, step) = (from as f64, to as f64, step as f64);
    let points = ((to - from + 1e-6) / step).floor() + 1.0;
    ensure!(
        points <= MAX_GRID_POINTS as f64,
        "step {step} gives {points} grid points, at most {MAX_GRID_POINTS} are allowed"
    );

    let grid = (0..points as usize)
        .map(|k| from + k as f64 * step)
        // Round away accumulated float noise (0.15000000000000002)
        .map(|eps| ((eps.min(to) * 1e6).round() / 1e6) as f32)
        .collect();
    Ok(grid)
}

pub struct SweepUseCase {
    config: EvalConfig,
    inputs: EvalInputs,
    grid:   Vec<f32>,
}

impl SweepUseCase {
    pub fn new(config: EvalConfig, inputs: EvalInputs, grid: Vec<f32>) -> Self {
        Self { config, inputs, grid }
    }

    pub fn execute(&self) -> Result<Vec<SweepMetrics>> {
        let bs = self.config.batch_size;
        match self.config.device {
            DeviceKind::Cpu => self.execute_on(ExecutionContext::cpu(bs)),
            DeviceKind::Wgpu => self.execute_on(ExecutionContext::wgpu(bs)),
        }
    }

    pub fn execute_on<B: AutodiffBackend>(&self, ctx: ExecutionContext<B>) -> Result<Vec<SweepMetrics>> {
        let session = open_session(ctx, self.config.label_policy, &self.inputs)?;
        let rows = session.sweep(&self.grid)?;

        let logger = MetricsLogger::new(Path::new(&self.config.output_dir))?;
        for row in &rows {
            logger.log(row)?;
        }
        tracing::info!("Logged {} sweep rows to '{}'", rows.len(), logger.csv_path().display());
        Ok(rows)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::artifact::save_artifact;
    use crate::ml::context::CpuBackend;
    use crate::ml::fixtures::{region_csv, region_net, region_spec};
    use std::fs;

    #[test]
    fn test_default_grid_has_eleven_points() {
        let grid = epsilon_grid(0.0, 0.5, 0.05).unwrap();
        assert_eq!(grid.len(), 11);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[3], 0.15);
        assert_eq!(grid[10], 0.5);
    }

    #[test]
    fn test_grid_rejects_bad_ranges() {
        assert!(epsilon_grid(0.0, 0.5, 0.0).is_err());
        assert!(epsilon_grid(0.3, 0.1, 0.05).is_err());
        assert!(epsilon_grid(0.0, 0.8, 0.1).is_err());
        assert_eq!(epsilon_grid(0.2, 0.2, 0.1).unwrap(), vec![0.2]);
    }

    #[test]
    fn test_grid_caps_point_count() {
        let err = epsilon_grid(0.0, 0.5, 1e-12).unwrap_err();
        assert!(err.to_string().contains("grid points"));
        assert_eq!(epsilon_grid(0.0, 0.5, 0.001).unwrap().len(), 501);
    }

    #[test]
    fn test_sweep_logs_one_row_per_epsilon() {
        let dir = std::env::temp_dir().join(format!("fgsm-sweep-uc-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        let model = dir.join("model.fgsm");
        save_artifact(&model, &region_spec(10), &region_net::<CpuBackend>(10, &Default::default())).unwrap();
        let dataset = dir.join("data.csv");
        fs::write(&dataset, region_csv(1, 10)).unwrap();

        let cfg = EvalConfig { output_dir: dir.join("out").to_string_lossy().into_owned(), ..Default::default() };
        let inputs = EvalInputs { model, dataset, labels: None };
        let rows = SweepUseCase::new(cfg, inputs, vec![0.0, 0.25, 0.5]).execute().unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.baseline_acc == 1.0));
        let csv = fs::read_to_string(dir.join("out").join("sweep.csv")).unwrap();
        assert_eq!(csv.lines().count(), 4);
        fs::remove_dir_all(&dir).ok();
    }
}
