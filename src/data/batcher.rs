// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to stack ImageItems into tensors.
//
//   Input:  Vec of N items, each C*H*W pixels
//   Output: images  [N, C, H, W]
//           targets [N]          (only when every item is labelled)
//
// The pixels are flattened into one Vec and reshaped, exactly like
// a row-major NCHW buffer.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ImageItem;

#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Shape: [batch_size, channels, height, width]
    pub images: Tensor<B, 4>,

    /// True labels, shape [batch_size]
    pub targets: Option<Tensor<B, 1, Int>>,
}

#[derive(Clone, Debug)]
pub struct ImageBatcher {
    /// Per-image shape (C, H, W)
    pub shape: [usize; 3],
}

impl ImageBatcher {
    pub fn new(shape: [usize; 3]) -> Self {
        Self { shape }
    }

    /// Batch `items` on backend `B`, naming the backend explicitly.
    pub fn stack<B: Backend>(&self, items: Vec<ImageItem>, device: &B::Device) -> ImageBatch<B> {
        <Self as Batcher<B, ImageItem, ImageBatch<B>>>::batch(self, items, device)
    }
}

impl<B: Backend> Batcher<B, ImageItem, ImageBatch<B>> for ImageBatcher {
    fn batch(&self, items: Vec<ImageItem>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();
        let [c, h, w] = self.shape;

        let flat: Vec<f32> = items
            .iter()
            .flat_map(|item| item.pixels.iter().copied())
            .collect();
        let images = Tensor::<B, 4>::from_data(
            TensorData::new(flat, [batch_size, c, h, w]),
            device,
        );

        let labels: Option<Vec<i32>> = items
            .iter()
            .map(|item| item.label.map(|l| l as i32))
            .collect();
        let targets = labels
            .map(|l| Tensor::<B, 1, Int>::from_ints(l.as_slice(), device));

        ImageBatch { images, targets }
    }
}
