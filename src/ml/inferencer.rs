// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Runs the classifier forward over a NormalizedBatch and returns the
// arg-max class per image plus the raw logits. The forward pass runs
// on the inner (non-autodiff) backend, so no gradient graph is built.
use burn::data::dataset::Dataset;
use burn::tensor::backend::AutodiffBackend;

use crate::data::{
    batcher::ImageBatcher,
    dataset::ImageDataset,
};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::NormalizedBatch;
use crate::ml::context::ExecutionContext;
use crate::ml::model::Classifier;

/// Per-image predictions, index-aligned with the input batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    pub classes: Vec<usize>,
    /// Row-major [images, classes] logits
    pub logits:  Vec<Vec<f32>>,
}

pub struct Inferencer<'a, B: AutodiffBackend> {
    classifier: &'a Classifier<B>,
    ctx:        &'a ExecutionContext<B>,
}

impl<'a, B: AutodiffBackend> Inferencer<'a, B> {
    pub fn new(classifier: &'a Classifier<B>, ctx: &'a ExecutionContext<B>) -> Self {
        Self { classifier, ctx }
    }

    pub fn predict(&self, batch: &NormalizedBatch) -> PipelineResult<Predictions> {
        check_input_shape(self.classifier, batch)?;

        let dataset = ImageDataset::unlabelled(batch);
        let batcher = ImageBatcher::new(dataset.shape());
        let classes_per_row = self.classifier.num_classes();

        let mut classes = Vec::with_capacity(dataset.len());
        let mut logits  = Vec::with_capacity(dataset.len());

        for start in (0..dataset.len()).step_by(self.ctx.batch_size) {
            let end   = (start + self.ctx.batch_size).min(dataset.len());
            let items = (start..end).filter_map(|i| dataset.get(i)).collect();
            let chunk = batcher.stack::<B::InnerBackend>(items, &self.ctx.device);

            let out = self.classifier.forward_untracked(chunk.images)?;

            // argmax(1) returns [batch, 1]; flatten to [batch]
            let predicted = out.clone().argmax(1).flatten::<1>(0, 1).into_data();
            classes.extend(predicted.iter::<i64>().map(|c| c as usize));

            let values: Vec<f32> = out.into_data().iter::<f32>().collect();
            logits.extend(values.chunks(classes_per_row).map(<[f32]>::to_vec));
        }

        tracing::debug!("Predicted {} images", classes.len());
        Ok(Predictions { classes, logits })
    }
}

/// Batch images must match the classifier's declared (C,H,W).
pub fn check_input_shape<B: AutodiffBackend>(
    classifier: &Classifier<B>,
    batch:      &NormalizedBatch,
) -> PipelineResult<()> {
    if batch.shape() != classifier.input_shape() {
        return Err(PipelineError::shape(
            format!("images of shape {:?}", classifier.input_shape()),
            format!("images of shape {:?}", batch.shape()),
        ));
    }
    Ok(())
}

/// Fraction of positions where prediction equals the true label.
pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    correct as f64 / truth.len() as f64
}
