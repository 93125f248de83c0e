use burn::data::dataset::Dataset;

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::NormalizedBatch;

/// One normalized image, optionally paired with its true label.
/// Inference needs no labels; the attack needs them for the loss.
#[derive(Debug, Clone)]
pub struct ImageItem {
    pub pixels: Vec<f32>,
    pub label:  Option<usize>,
}

pub struct ImageDataset {
    shape: [usize; 3],
    items: Vec<ImageItem>,
}

impl ImageDataset {
    /// Unlabelled view over a batch, for plain inference.
    pub fn unlabelled(batch: &NormalizedBatch) -> Self {
        let items = (0..batch.len())
            .map(|i| ImageItem { pixels: batch.image(i).to_vec(), label: None })
            .collect();
        Self { shape: batch.shape(), items }
    }

    /// Labelled view; `labels` must be index-aligned with the batch.
    pub fn labelled(batch: &NormalizedBatch, labels: &[usize]) -> PipelineResult<Self> {
        if labels.len() != batch.len() {
            return Err(PipelineError::LengthMismatch {
                true_len: labels.len(),
                pred_len: batch.len(),
            });
        }
        let items = labels
            .iter()
            .enumerate()
            .map(|(i, &label)| ImageItem { pixels: batch.image(i).to_vec(), label: Some(label) })
            .collect();
        Ok(Self { shape: batch.shape(), items })
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }
}

impl Dataset<ImageItem> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
