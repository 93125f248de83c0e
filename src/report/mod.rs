// ============================================================
// Report Layer
// ============================================================
// Turns aligned (truth, prediction) label vectors into what a user
// looks at: a confusion-matrix heatmap and a classification table.
//
//   metrics.rs — confusion matrix, per-class precision / recall / F1,
//                accuracy and the macro / weighted averages
//   table.rs   — tabular rows with emphasised aggregate rows
//   heatmap.rs — PNG heatmap (plotters) with count annotations and
//                tick labels
//
// Class names come from the session's LabelRegistry at render time,
// so an edited label shows up on the next render without recomputing
// any predictions.

pub mod heatmap;
pub mod metrics;
pub mod table;

use serde::Serialize;

use crate::domain::error::PipelineResult;
use crate::domain::labels::LabelRegistry;
use metrics::{ClassificationReport, ConfusionMatrix};
use table::ReportTable;

pub const HEATMAP_TITLE: &str = "Confusion Matrix";

/// One rendered evaluation: heatmap plus table.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationView {
    pub accuracy: f64,
    pub matrix:   ConfusionMatrix,
    pub report:   ClassificationReport,
    pub table:    ReportTable,
    /// "data:image/png;base64,..."
    pub heatmap:  String,
    #[serde(skip)]
    pub heatmap_png: Vec<u8>,
    /// Registry version the tick labels were drawn with
    pub label_version: u64,
}

/// Score `predicted` against `truth` over `classes` classes and
/// render both views. Registry entries beyond `classes` are not drawn.
pub fn evaluate(
    truth:     &[usize],
    predicted: &[usize],
    classes:   usize,
    registry:  &LabelRegistry,
) -> PipelineResult<EvaluationView> {
    let matrix = ConfusionMatrix::compute(truth, predicted, classes)?;
    let report = ClassificationReport::from_matrix(&matrix);

    let names = registry.display_names(matrix.size());
    let table = ReportTable::build(&report, &names);
    let heatmap_png = heatmap::render_heatmap(&matrix, &names, HEATMAP_TITLE)?;
    let heatmap = crate::data::decoder::encode_data_url("image/png", &heatmap_png);

    tracing::debug!(
        "Rendered {}x{} report for session {} (accuracy {:.4})",
        matrix.size(),
        matrix.size(),
        registry.session(),
        report.accuracy
    );

    Ok(EvaluationView {
        accuracy: report.accuracy,
        matrix,
        report,
        table,
        heatmap,
        heatmap_png,
        label_version: registry.version(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::PipelineError;
    use crate::domain::labels::SessionId;

    #[test]
    fn test_matrix_width_follows_classifier() {
        let mut registry = LabelRegistry::new(SessionId(1));
        registry.ensure_capacity(10);
        registry.set(40, "stale");
        let view = evaluate(&[0, 1, 1], &[0, 1, 0], 10, &registry).unwrap();
        assert_eq!(view.matrix.size(), 10);
        assert_eq!(view.table.class_rows().count(), 10);
        assert!(view.heatmap.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_edited_label_shows_in_next_render() {
        let mut registry = LabelRegistry::new(SessionId(1));
        registry.ensure_capacity(2);
        let before = evaluate(&[0, 1], &[0, 1], 2, &registry).unwrap();
        assert_eq!(before.table.rows[1].class, "1");

        registry.set(1, "one");
        let after = evaluate(&[0, 1], &[0, 1], 2, &registry).unwrap();
        assert_eq!(after.table.rows[1].class, "one");
        assert!(after.label_version > before.label_version);
    }

    #[test]
    fn test_misaligned_vectors_fail() {
        let registry = LabelRegistry::new(SessionId(1));
        let err = evaluate(&[0, 1], &[0], 2, &registry).unwrap_err();
        assert!(matches!(err, PipelineError::LengthMismatch { .. }));
    }
}
