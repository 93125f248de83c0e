// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from an uploaded data URL to tensor batches:
//
//   data URL (upload or FileArtifact)
//       │
//       ▼
//   decoder       → base64 payload → raw bytes
//       │
//       ▼
//   csv_reader    → labelled pixel rows (Dataset)
//       │
//       ▼
//   normalizer    → single-channel [0,1] images (NormalizedBatch)
//       │
//       ▼
//   ImageDataset  → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher  → stacks items into [N,C,H,W] tensors
//
// Model artifacts leave this pipeline after the decoder and are
// rebuilt by infra::artifact.
//
// Reference: Burn Book §4 (Datasets and Batchers)

/// Reads artifacts from disk as data URLs
pub mod loader;

/// Data URL splitting and base64 decoding
pub mod decoder;

/// CSV → labelled pixel rows
pub mod csv_reader;

/// Grayscale, resize and [0,1] scaling
pub mod normalizer;

/// Implements Burn's Dataset trait for normalized images
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
