// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers; owns no ML math, no file formats
// and no printing.
//
//   session.rs           — one user's state plus the commands and
//                          queries a UI (or the CLI) triggers
//   evaluate_use_case.rs — baseline + attack at one epsilon, written
//                          to an output directory
//   sweep_use_case.rs    — attack over an epsilon grid, logged to CSV
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

/// Session state, commands and queries
pub mod session;

/// Single-epsilon evaluation workflow and its configuration
pub mod evaluate_use_case;

/// Epsilon sweep workflow
pub mod sweep_use_case;
