// ============================================================
// Report — Confusion Matrix and Per-Class Metrics
// ============================================================
// Given aligned true and predicted labels over the N classes of the
// loaded classifier:
//
//   matrix[i][j] = #{ k : truth[k] = i and pred[k] = j }
//
//   precision_c = TP / (TP + FP)     0 when nothing was predicted as c
//   recall_c    = TP / (TP + FN)     0 when c never occurs in truth
//   f1_c        = 2PR / (P + R)      0 when P + R = 0
//
// The macro average runs over the classes that occur in either the
// truth or the predictions. The weighted average weights each class
// by its support (row sum).

use serde::Serialize;

use crate::domain::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    pub fn compute(truth: &[usize], predicted: &[usize], classes: usize) -> PipelineResult<Self> {
        if truth.len() != predicted.len() {
            return Err(PipelineError::LengthMismatch {
                true_len: truth.len(),
                pred_len: predicted.len(),
            });
        }

        // The width is fixed by the caller; a label outside it is an
        // input error, never a reason to allocate a larger matrix
        if let Some(&label) = truth.iter().chain(predicted).find(|&&l| l >= classes) {
            return Err(PipelineError::LabelOutOfRange { label, classes });
        }

        let mut counts = vec![vec![0u64; classes]; classes];
        for (&t, &p) in truth.iter().zip(predicted) {
            counts[t][p] += 1;
        }
        Ok(Self { counts })
    }

    pub fn size(&self) -> usize {
        self.counts.len()
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u64 {
        self.counts[truth][predicted]
    }

    pub fn rows(&self) -> &[Vec<u64>] {
        &self.counts
    }

    /// Support of class `c`.
    pub fn row_sum(&self, c: usize) -> u64 {
        self.counts[c].iter().sum()
    }

    /// How often `c` was predicted.
    pub fn col_sum(&self, c: usize) -> u64 {
        self.counts.iter().map(|row| row[c]).sum()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn max_count(&self) -> u64 {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }

    pub fn trace(&self) -> u64 {
        (0..self.size()).map(|i| self.counts[i][i]).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub class:     usize,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub support:   u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Average {
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub support:   u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes:      Vec<ClassMetrics>,
    pub accuracy:     f64,
    pub total:        u64,
    pub macro_avg:    Average,
    pub weighted_avg: Average,
}

impl ClassificationReport {
    pub fn from_matrix(matrix: &ConfusionMatrix) -> Self {
        let total = matrix.total();

        let classes: Vec<ClassMetrics> = (0..matrix.size())
            .map(|c| {
                let tp = matrix.get(c, c) as f64;
                let predicted = matrix.col_sum(c);
                let support   = matrix.row_sum(c);
                let precision = ratio(tp, predicted as f64);
                let recall    = ratio(tp, support as f64);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics { class: c, precision, recall, f1, support }
            })
            .collect();

        let present: Vec<&ClassMetrics> = classes
            .iter()
            .filter(|m| m.support > 0 || matrix.col_sum(m.class) > 0)
            .collect();
        let k = present.len() as f64;
        let macro_avg = Average {
            precision: ratio(present.iter().map(|m| m.precision).sum(), k),
            recall:    ratio(present.iter().map(|m| m.recall).sum(), k),
            f1:        ratio(present.iter().map(|m| m.f1).sum(), k),
            support:   total,
        };

        let weight = |f: fn(&ClassMetrics) -> f64| {
            ratio(classes.iter().map(|m| f(m) * m.support as f64).sum(), total as f64)
        };
        let weighted_avg = Average {
            precision: weight(|m| m.precision),
            recall:    weight(|m| m.recall),
            f1:        weight(|m| m.f1),
            support:   total,
        };

        Self {
            accuracy: ratio(matrix.trace() as f64, total as f64),
            total,
            classes,
            macro_avg,
            weighted_avg,
        }
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn report(truth: &[usize], pred: &[usize], n: usize) -> (ConfusionMatrix, ClassificationReport) {
        let m = ConfusionMatrix::compute(truth, pred, n).unwrap();
        let r = ClassificationReport::from_matrix(&m);
        (m, r)
    }

    #[test]
    fn test_row_sums_equal_support() {
        let truth = [0, 0, 1, 2, 2, 2];
        let pred  = [0, 1, 1, 2, 0, 2];
        let (m, r) = report(&truth, &pred, 3);
        assert_eq!(m.total(), 6);
        for c in 0..3 {
            let expected = truth.iter().filter(|&&t| t == c).count() as u64;
            assert_eq!(m.row_sum(c), expected);
            assert_eq!(r.classes[c].support, expected);
        }
    }

    #[test]
    fn test_perfect_predictions_score_one_everywhere() {
        let truth: Vec<usize> = (0..100).map(|i| i % 10).collect();
        let (m, r) = report(&truth, &truth, 10);
        for i in 0..10 {
            for j in 0..10 {
                assert_eq!(m.get(i, j), if i == j { 10 } else { 0 });
            }
        }
        assert_eq!(r.accuracy, 1.0);
        for c in &r.classes {
            assert_eq!((c.precision, c.recall, c.f1, c.support), (1.0, 1.0, 1.0, 10));
        }
        assert_eq!(r.macro_avg.f1, 1.0);
        assert_eq!(r.weighted_avg.f1, 1.0);
        assert_eq!(r.macro_avg.support, 100);
    }

    #[test]
    fn test_metrics_in_unit_interval_and_zero_when_undefined() {
        let truth = [0, 0, 1, 1, 3];
        let pred  = [1, 1, 0, 0, 3];
        let (_, r) = report(&truth, &pred, 5);
        for c in &r.classes {
            assert!((0.0..=1.0).contains(&c.precision));
            assert!((0.0..=1.0).contains(&c.recall));
            assert!((0.0..=1.0).contains(&c.f1));
        }
        // Class 0: never predicted correctly → P = R = F1 = 0
        assert_eq!((r.classes[0].precision, r.classes[0].recall, r.classes[0].f1), (0.0, 0.0, 0.0));
        // Class 2 and 4 never appear anywhere
        assert_eq!(r.classes[2].support, 0);
        assert_eq!(r.classes[4].f1, 0.0);
    }

    #[test]
    fn test_macro_average_skips_absent_classes() {
        // Classes 0 and 1 appear; 2..9 exist only in the registry
        let (_, r) = report(&[0, 1], &[0, 0], 10);
        // P0 = 0.5, R0 = 1, F0 = 2/3; class 1 all zero
        assert!((r.macro_avg.precision - 0.25).abs() < 1e-12);
        assert!((r.macro_avg.recall - 0.5).abs() < 1e-12);
        assert!((r.macro_avg.f1 - 1.0 / 3.0).abs() < 1e-12);
        assert!((r.weighted_avg.recall - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let err = ConfusionMatrix::compute(&[0, 1], &[0], 2).unwrap_err();
        assert!(matches!(err, PipelineError::LengthMismatch { true_len: 2, pred_len: 1 }));
    }

    #[test]
    fn test_labels_beyond_width_are_rejected() {
        let err = ConfusionMatrix::compute(&[0, 4], &[0, 1], 2).unwrap_err();
        assert!(matches!(err, PipelineError::LabelOutOfRange { label: 4, classes: 2 }));

        let err = ConfusionMatrix::compute(&[0, usize::MAX], &[0, 0], 10).unwrap_err();
        assert!(matches!(err, PipelineError::LabelOutOfRange { label: usize::MAX, .. }));
    }
}
