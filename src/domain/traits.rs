// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Uploads reach the pipeline as data URLs. Where they come from (a
// browser upload widget, a file on disk, a test fixture) is hidden
// behind ArtifactSource so the application layer only ever sees the
// "<mime>;base64,<payload>" string.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

// ─── ArtifactSource ───────────────────────────────────────────────────────────
/// Anything that can hand over an uploaded artifact as a data URL.
///
/// The CLI implements it with FileArtifact, which reads a file from
/// disk and base64-encodes it.
pub trait ArtifactSource {
    /// Human-readable origin, used in log lines.
    fn describe(&self) -> String;

    /// Produce the upload as a data URL.
    fn data_url(&self) -> Result<String>;
}
