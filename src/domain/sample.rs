// ============================================================
// Layer 3 — Dataset and NormalizedBatch
// ============================================================
// Plain containers for what flows between the decoder, the
// normalizer and the engines. No tensors here: the ml layer turns
// a NormalizedBatch into a burn tensor when it needs one.

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, PipelineResult};

/// One parsed CSV row: integer label + flat pixel intensities (0..=255).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRow {
    pub label:  usize,
    pub pixels: Vec<f32>,
}

/// Ordered rows of one uploaded CSV. Replaced wholesale on re-upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    rows: Vec<LabeledRow>,
}

impl Dataset {
    pub fn new(rows: Vec<LabeledRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[LabeledRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn labels(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.label).collect()
    }
}

/// Single-channel images in [0,1], all of one (C,H,W) shape, index
/// aligned with the Dataset rows they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    shape:  [usize; 3],
    pixels: Vec<f32>,
}

impl NormalizedBatch {
    /// Build from per-image flat buffers. Every buffer must hold
    /// exactly C*H*W values.
    pub fn from_images(shape: [usize; 3], images: Vec<Vec<f32>>) -> PipelineResult<Self> {
        let per_image = shape.iter().product::<usize>();
        let mut pixels = Vec::with_capacity(per_image * images.len());
        for (i, image) in images.into_iter().enumerate() {
            if image.len() != per_image {
                return Err(PipelineError::shape(
                    format!("{per_image} values per image"),
                    format!("{} values in image {i}", image.len()),
                ));
            }
            pixels.extend(image);
        }
        Ok(Self { shape, pixels })
    }

    /// Build from one contiguous N*C*H*W buffer.
    pub fn from_flat(shape: [usize; 3], pixels: Vec<f32>) -> PipelineResult<Self> {
        let per_image = shape.iter().product::<usize>();
        if per_image == 0 || pixels.len() % per_image != 0 {
            return Err(PipelineError::shape(
                format!("a multiple of {per_image} values"),
                format!("{} values", pixels.len()),
            ));
        }
        Ok(Self { shape, pixels })
    }

    /// Per-image shape as (channels, height, width).
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn len(&self) -> usize {
        let per_image = self.shape.iter().product::<usize>();
        if per_image == 0 { 0 } else { self.pixels.len() / per_image }
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn image(&self, index: usize) -> &[f32] {
        let per_image = self.shape.iter().product::<usize>();
        &self.pixels[index * per_image..(index + 1) * per_image]
    }

    pub fn as_flat(&self) -> &[f32] {
        &self.pixels
    }

    /// Contiguous sub-batch of images `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> NormalizedBatch {
        let per_image = self.shape.iter().product::<usize>();
        Self {
            shape:  self.shape,
            pixels: self.pixels[start * per_image..end * per_image].to_vec(),
        }
    }
}
