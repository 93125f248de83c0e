// ============================================================
// Layer 5 — ML Layer (Burn)
// ============================================================
// Everything that touches Burn modules and autodiff lives here.
//
//   context.rs    — Execution context
//                   Concrete backends and the device + mini-batch
//                   size chosen once per session
//
//   model.rs      — Sequential classifier
//                   Declarative graph (conv / pool / linear /
//                   activations), static shape inference, and the
//                   loaded Classifier with tracked and untracked
//                   forward passes
//
//   inferencer.rs — Inference engine
//                   Arg-max predictions and logits, no gradients
//
//   attack.rs     — FGSM perturbation engine
//                   Cross-entropy gradient w.r.t. the input pixels,
//                   one signed step of size ε, clamp to [0,1]
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §4 (Autodiff)
//            Goodfellow et al. (2015)

/// Backend aliases and the per-session execution context
pub mod context;

/// Sequential classifier graph and module
pub mod model;

/// Inference engine — arg-max predictions
pub mod inferencer;

/// FGSM perturbation engine
pub mod attack;

#[cfg(test)]
pub mod fixtures;
