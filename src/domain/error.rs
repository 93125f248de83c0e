// ============================================================
// Layer 3 — Pipeline Error Taxonomy
// ============================================================
// Every stage of the evaluation pipeline fails with one of these
// variants. The application layer catches them at the top of each
// triggered action and turns them into a textual placeholder, so none
// of them is fatal to a session.
//
// Reference: Rust Book §9 (Recoverable Errors with Result)
//            thiserror crate documentation

use thiserror::Error;

/// Errors raised by the decoder, normalizer, engines and reporter.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Malformed base64 payload or a data URL without a comma separator
    #[error("decode error: {0}")]
    Decode(String),

    /// Unrecognised artifact format or a graph that cannot be rebuilt
    #[error("model load error: {0}")]
    ModelLoad(String),

    /// Inconsistent column count, non-integer label, bad pixel value
    #[error("dataset format error: {0}")]
    DatasetFormat(String),

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("length mismatch: {true_len} true labels vs {pred_len} predictions")]
    LengthMismatch { true_len: usize, pred_len: usize },

    /// The classifier graph is frozen or produced no input gradient
    #[error("gradient unavailable: {0}")]
    GradientUnavailable(String),

    #[error("epsilon {0} is outside the supported range [0, 0.5]")]
    InvalidEpsilon(f32),

    #[error("label {label} is outside the classifier's {classes} output classes")]
    LabelOutOfRange { label: usize, classes: usize },

    #[error("render error: {0}")]
    Render(String),
}

impl PipelineError {
    /// Shorthand used by the normalizer and inference engine.
    pub fn shape(expected: impl ToString, actual: impl ToString) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_string(),
            actual:   actual.to_string(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_message_names_both_sides() {
        let err = PipelineError::shape("784 pixels", "783 pixels");
        let msg = err.to_string();
        assert!(msg.contains("784 pixels"));
        assert!(msg.contains("783 pixels"));
    }
}
