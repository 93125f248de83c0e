// ============================================================
// Layer 3 — Label Registry
// ============================================================
// Maps class indices to human-readable names for one session.
//
// The registry is an explicit value owned by a Session and passed to
// the reporter, never a process-wide global. Each accepted edit bumps
// a version counter so callers can tell whether a rendered report is
// stale with respect to the labels it was drawn with.
//
// Edits may name indices the classifier does not have. They are
// stored but never drawn: reports only read names for 0..n-1 of the
// loaded classifier, so those classes keep their default labels.
//
// Re-uploading a classifier with a different class count goes through
// `reconcile`, which either merges (keeps every existing entry, even
// stale ones beyond the new width) or resets (drops everything and
// allocates 0..n-1 afresh).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies the session a registry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// What happens to existing entries when a classifier of a different
/// width is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPolicy {
    /// Keep every existing name and only add missing indices
    #[default]
    Merge,
    /// Drop all names and allocate exactly 0..n-1
    Reset,
}

#[derive(Debug, Clone)]
pub struct LabelRegistry {
    session: SessionId,
    version: u64,
    labels:  BTreeMap<usize, String>,
}

impl LabelRegistry {
    pub fn new(session: SessionId) -> Self {
        Self { session, version: 0, labels: BTreeMap::new() }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Incremented on every edit that changes a stored name.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Stored name for `index`, or the empty string when unset.
    pub fn get(&self, index: usize) -> &str {
        self.labels.get(&index).map(String::as_str).unwrap_or("")
    }

    /// Last write wins; writing the current value again is a no-op.
    pub fn set(&mut self, index: usize, name: impl Into<String>) {
        let name = name.into();
        if self.labels.get(&index) != Some(&name) {
            tracing::debug!("Label {} set to '{}'", index, name);
            self.labels.insert(index, name);
            self.version += 1;
        }
    }

    /// Make sure indices 0..n-1 exist without touching stored names.
    pub fn ensure_capacity(&mut self, n: usize) {
        let mut grew = false;
        for index in 0..n {
            if !self.labels.contains_key(&index) {
                self.labels.insert(index, String::new());
                grew = true;
            }
        }
        if grew {
            self.version += 1;
        }
    }

    /// Bring the registry in line with a newly loaded classifier width.
    pub fn reconcile(&mut self, n: usize, policy: LabelPolicy) {
        match policy {
            LabelPolicy::Merge => {
                if self.class_count() > n {
                    tracing::warn!(
                        "Label registry keeps {} stale entries beyond the new width {}",
                        self.class_count() - n,
                        n
                    );
                }
                self.ensure_capacity(n);
            }
            LabelPolicy::Reset => {
                self.labels.clear();
                self.version += 1;
                self.ensure_capacity(n);
            }
        }
    }

    /// Apply a batch of edits keyed by stringified index. Keys that are
    /// not non-negative integers are ignored, so the affected classes
    /// keep their default labels.
    pub fn apply_edits<'a, I>(&mut self, edits: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut applied = 0;
        for (key, name) in edits {
            match key.trim().parse::<usize>() {
                Ok(index) => {
                    self.set(index, name);
                    applied += 1;
                }
                Err(_) => tracing::debug!("Ignoring label edit with key '{}'", key),
            }
        }
        applied
    }

    /// Highest known index + 1. An edit at usize::MAX saturates.
    pub fn class_count(&self) -> usize {
        self.labels.keys().next_back().map(|i| i.saturating_add(1)).unwrap_or(0)
    }

    /// Name to draw for `index`: the stored name, or the index itself
    /// when the name is empty.
    pub fn display_name(&self, index: usize) -> String {
        let name = self.get(index).trim();
        if name.is_empty() {
            index.to_string()
        } else {
            name.to_string()
        }
    }

    /// Display names for classes 0..n-1.
    pub fn display_names(&self, n: usize) -> Vec<String> {
        (0..n).map(|i| self.display_name(i)).collect()
    }

    pub fn snapshot(&self) -> BTreeMap<usize, String> {
        self.labels.clone()
    }
}
