// ============================================================
// Layer 6 — Sweep Metrics Logger
// ============================================================
// Records one row per epsilon of a robustness sweep to a CSV file.
//
// Output file: <output_dir>/sweep.csv
//
// Example CSV output:
//   epsilon,baseline_acc,attacked_acc,macro_f1
//   0.000000,0.981000,0.981000,0.980912
//   0.050000,0.981000,0.734000,0.731554
//   ...
//
// The header is written only when the file is new, so repeated sweeps
// over different models append to the same log.

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

pub const CSV_HEADER: &str = "epsilon,baseline_acc,attacked_acc,macro_f1";

/// One row of a sweep: accuracy before and after FGSM at one epsilon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepMetrics {
    pub epsilon: f32,

    /// Accuracy on the clean images
    pub baseline_acc: f64,

    /// Accuracy on the perturbed images
    pub attacked_acc: f64,

    /// Macro-averaged F1 on the perturbed images
    pub macro_f1: f64,
}

impl SweepMetrics {
    /// Accuracy points lost to the attack.
    pub fn accuracy_drop(&self) -> f64 {
        self.baseline_acc - self.attacked_acc
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("sweep.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{CSV_HEADER}")?;
            tracing::debug!("Created sweep CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &SweepMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;

        writeln!(
            f,
            "{:.6},{:.6},{:.6},{:.6}",
            m.epsilon, m.baseline_acc, m.attacked_acc, m.macro_f1,
        )?;

        tracing::debug!(
            "Logged epsilon {:.3}: baseline={:.4}, attacked={:.4}",
            m.epsilon,
            m.baseline_acc,
            m.attacked_acc,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_drop() {
        let m = SweepMetrics { epsilon: 0.1, baseline_acc: 0.9, attacked_acc: 0.4, macro_f1: 0.35 };
        assert!((m.accuracy_drop() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let dir = std::env::temp_dir().join(format!("fgsm-sweep-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();

        let row = SweepMetrics { epsilon: 0.05, baseline_acc: 1.0, attacked_acc: 0.5, macro_f1: 0.25 };
        MetricsLogger::new(&dir).unwrap().log(&row).unwrap();
        MetricsLogger::new(&dir).unwrap().log(&row).unwrap();

        let text = fs::read_to_string(dir.join("sweep.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "0.050000,1.000000,0.500000,0.250000");
        fs::remove_dir_all(&dir).ok();
    }
}
