// ============================================================
// Layer 4 — Image Normalizer
// ============================================================
// Turns raw pixel data into the single-channel [0,1] images the
// classifier consumes. Steps, in order:
//
//   1. Grayscale  — luma of RGB(A) input, no-op for one channel
//   2. Scale      — byte intensities are divided by 255
//   3. Resize     — bilinear (Triangle filter) to the target size,
//                   skipped when the size already matches
//   4. Clamp      — every value ends in [0,1]
//
// Deterministic and side-effect free: the same input always gives
// bit-identical output, and an already normalized image of the target
// size passes through unchanged.

use image::{imageops::FilterType, ImageBuffer, Luma};

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::{Dataset, LabeledRow, NormalizedBatch};

/// How raw pixel values are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelScale {
    /// 0..=255 intensities, as found in the dataset CSV
    Byte,
    /// Already in [0,1]
    Unit,
}

/// Interleaved (HWC) pixel data of arbitrary size and channel count.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub width:    usize,
    pub height:   usize,
    pub channels: usize,
    pub scale:    PixelScale,
    pub pixels:   Vec<f32>,
}

#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    height: usize,
    width:  usize,
}

impl Normalizer {
    /// Normalizer producing `height` x `width` single-channel images.
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Normalizer matching a classifier input shape (C,H,W).
    pub fn for_input_shape(shape: [usize; 3]) -> Self {
        Self::new(shape[1], shape[2])
    }

    pub fn output_shape(&self) -> [usize; 3] {
        [1, self.height, self.width]
    }

    /// Normalize one dataset row. The row must carry exactly H*W
    /// single-channel pixels.
    pub fn normalize_row(&self, row: &LabeledRow) -> PipelineResult<Vec<f32>> {
        let expected = self.height * self.width;
        if row.pixels.len() != expected {
            return Err(PipelineError::shape(
                format!("{expected} pixels ({}x{})", self.height, self.width),
                format!("{} pixels", row.pixels.len()),
            ));
        }
        self.normalize(&RawImage {
            width:    self.width,
            height:   self.height,
            channels: 1,
            scale:    PixelScale::Byte,
            pixels:   row.pixels.clone(),
        })
    }

    /// Normalize every row of a dataset, preserving order.
    pub fn normalize_dataset(&self, dataset: &Dataset) -> PipelineResult<NormalizedBatch> {
        let images = dataset
            .rows()
            .iter()
            .map(|row| self.normalize_row(row))
            .collect::<PipelineResult<Vec<_>>>()?;
        NormalizedBatch::from_images(self.output_shape(), images)
    }

    pub fn normalize(&self, raw: &RawImage) -> PipelineResult<Vec<f32>> {
        let expected = raw.width * raw.height * raw.channels;
        if raw.width == 0 || raw.height == 0 || raw.pixels.len() != expected {
            return Err(PipelineError::shape(
                format!("{}x{}x{} values", raw.height, raw.width, raw.channels),
                format!("{} values", raw.pixels.len()),
            ));
        }

        let gray = to_grayscale(raw)?;
        let unit: Vec<f32> = match raw.scale {
            PixelScale::Byte => gray.iter().map(|v| v / 255.0).collect(),
            PixelScale::Unit => gray,
        };

        let resized = if raw.width == self.width && raw.height == self.height {
            unit
        } else {
            self.resize(raw.width, raw.height, unit)?
        };

        Ok(resized.into_iter().map(|v| v.clamp(0.0, 1.0)).collect())
    }

    fn resize(&self, width: usize, height: usize, data: Vec<f32>) -> PipelineResult<Vec<f32>> {
        let buffer: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_raw(width as u32, height as u32, data).ok_or_else(|| {
                PipelineError::shape(format!("{width}x{height} buffer"), "short buffer")
            })?;
        let out = image::imageops::resize(
            &buffer,
            self.width as u32,
            self.height as u32,
            FilterType::Triangle,
        );
        Ok(out.into_raw())
    }
}

/// ITU-R 601-2 luma, the same weights PIL uses for mode "L".
fn to_grayscale(raw: &RawImage) -> PipelineResult<Vec<f32>> {
    match raw.channels {
        1 => Ok(raw.pixels.clone()),
        3 | 4 => Ok(raw
            .pixels
            .chunks_exact(raw.channels)
            .map(|p| p[0] * 0.299 + p[1] * 0.587 + p[2] * 0.114)
            .collect()),
        n => Err(PipelineError::shape("1, 3 or 4 channels", format!("{n} channels"))),
    }
}
