// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits describing what the pipeline
// works on: parsed datasets, normalized image batches, the per-session
// label registry and the error taxonomy every stage reports with.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Error taxonomy shared by every pipeline stage
pub mod error;

// Per-session class index → display name mapping
pub mod labels;

// Parsed CSV rows and normalized image batches
pub mod sample;

// Core abstractions (traits) that other layers implement
pub mod traits;
