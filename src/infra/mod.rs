// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence that more than one use case needs:
//
//   artifact.rs     — Classifier artifacts
//                     JSON graph header + Burn named-MessagePack
//                     weights in one blob. Used by init-model to
//                     write and by every model upload to read.
//
//   labels_store.rs — Class-name files
//                     Flat JSON object of index → name, applied
//                     to a session's LabelRegistry.
//
//   metrics.rs      — Sweep metrics logging
//                     One CSV row per epsilon of a robustness
//                     sweep, appended across runs.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Records)

/// Classifier artifact encoding and decoding
pub mod artifact;

/// Label JSON loading and saving
pub mod labels_store;

/// Sweep metrics CSV logger
pub mod metrics;
