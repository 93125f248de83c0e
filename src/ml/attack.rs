// ============================================================
// Layer 5 — FGSM Perturbation Engine
// ============================================================
// One-step untargeted Fast Gradient Sign Method:
//
//   loss  = CrossEntropy(f(x), y)
//   x_adv = clamp(x + ε · sign(∂loss/∂x), 0, 1)
//
// Every pixel moves by exactly ε (or 0 where the gradient is 0) in
// the direction that increases the loss, then is clipped back into
// the valid range. ε = 0 returns the input unchanged.
//
// The forward pass here runs on the autodiff backend with gradient
// tracking switched on for the input tensor. A classifier whose graph
// is declared frozen, or whose backward pass yields no input
// gradient, fails with GradientUnavailable.
//
// Reference: Goodfellow et al. (2015) Explaining and Harnessing
//            Adversarial Examples

use burn::{
    data::dataset::Dataset,
    nn::loss::CrossEntropyLossConfig,
    tensor::backend::AutodiffBackend,
};

use crate::data::{batcher::ImageBatcher, dataset::ImageDataset};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::NormalizedBatch;
use crate::ml::context::ExecutionContext;
use crate::ml::inferencer::check_input_shape;
use crate::ml::model::Classifier;

/// Largest perturbation magnitude the engine accepts.
pub const MAX_EPSILON: f32 = 0.5;

pub fn validate_epsilon(epsilon: f32) -> PipelineResult<f32> {
    if !epsilon.is_finite() || !(0.0..=MAX_EPSILON).contains(&epsilon) {
        return Err(PipelineError::InvalidEpsilon(epsilon));
    }
    Ok(epsilon)
}

pub struct FgsmAttack<'a, B: AutodiffBackend> {
    classifier: &'a Classifier<B>,
    ctx:        &'a ExecutionContext<B>,
}

impl<'a, B: AutodiffBackend> FgsmAttack<'a, B> {
    pub fn new(classifier: &'a Classifier<B>, ctx: &'a ExecutionContext<B>) -> Self {
        Self { classifier, ctx }
    }

    /// Perturb every image of `batch` against its true label.
    pub fn perturb(
        &self,
        batch:   &NormalizedBatch,
        labels:  &[usize],
        epsilon: f32,
    ) -> PipelineResult<NormalizedBatch> {
        let epsilon = validate_epsilon(epsilon)?;
        check_input_shape(self.classifier, batch)?;

        if !self.classifier.differentiable() {
            return Err(PipelineError::GradientUnavailable(format!(
                "classifier '{}' is a frozen graph without autograd support",
                self.classifier.name()
            )));
        }

        let classes = self.classifier.num_classes();
        if let Some(&label) = labels.iter().find(|&&l| l >= classes) {
            return Err(PipelineError::LabelOutOfRange { label, classes });
        }

        // Errors with LengthMismatch when labels and images disagree
        let dataset = ImageDataset::labelled(batch, labels)?;
        let batcher = ImageBatcher::new(dataset.shape());
        let loss_fn = CrossEntropyLossConfig::new().init(&self.ctx.device);

        let mut perturbed: Vec<f32> = Vec::with_capacity(batch.as_flat().len());

        for start in (0..dataset.len()).step_by(self.ctx.batch_size) {
            let end   = (start + self.ctx.batch_size).min(dataset.len());
            let items = (start..end).filter_map(|i| dataset.get(i)).collect();
            let chunk = batcher.stack::<B>(items, &self.ctx.device);

            let targets = chunk.targets.ok_or(PipelineError::LengthMismatch {
                true_len: labels.len(),
                pred_len: batch.len(),
            })?;

            let images = chunk.images.require_grad();
            let logits = self.classifier.forward(images.clone())?;
            let loss   = loss_fn.forward(logits, targets);

            let grads = loss.backward();
            let grad  = images.grad(&grads).ok_or_else(|| {
                PipelineError::GradientUnavailable(
                    "backward pass produced no gradient for the input images".into(),
                )
            })?;

            let adversarial = (images.inner() + grad.sign().mul_scalar(epsilon)).clamp(0.0, 1.0);
            perturbed.extend(adversarial.into_data().iter::<f32>());
        }

        tracing::debug!("FGSM perturbed {} images at epsilon={:.3}", batch.len(), epsilon);
        NormalizedBatch::from_flat(batch.shape(), perturbed)
    }
}
