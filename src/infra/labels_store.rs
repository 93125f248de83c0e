// ============================================================
// Layer 6 — Label Store
// ============================================================
// Loads and saves class names as a flat JSON object keyed by the
// stringified class index:
//
//   { "0": "zero", "1": "one", "7": "seven" }
//
// Keys that are not non-negative integers are skipped with a debug
// line, exactly as interactive edits are.

use anyhow::{Context, Result};
use std::{collections::BTreeMap, fs, path::Path};

use crate::domain::labels::LabelRegistry;

/// Read a labels file into `registry`. Returns the number of accepted edits.
pub fn load_labels(path: &Path, registry: &mut LabelRegistry) -> Result<usize> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read labels from '{}'", path.display()))?;
    let edits: BTreeMap<String, String> = serde_json::from_str(&json)
        .with_context(|| format!("'{}' is not a JSON object of index → name", path.display()))?;

    let applied = registry.apply_edits(edits.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    tracing::info!("Loaded {} of {} labels from '{}'", applied, edits.len(), path.display());
    Ok(applied)
}

pub fn save_labels(path: &Path, registry: &LabelRegistry) -> Result<()> {
    let map: BTreeMap<String, String> = registry
        .snapshot()
        .into_iter()
        .map(|(index, name)| (index.to_string(), name))
        .collect();
    let json = serde_json::to_string_pretty(&map)?;
    fs::write(path, json)
        .with_context(|| format!("Cannot write labels to '{}'", path.display()))?;
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::labels::SessionId;

    #[test]
    fn test_labels_round_trip_through_disk() {
        let dir = std::env::temp_dir().join(format!("fgsm-labels-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("labels.json");

        let mut original = LabelRegistry::new(SessionId(1));
        original.ensure_capacity(3);
        original.set(2, "bird");
        save_labels(&path, &original).unwrap();

        let mut loaded = LabelRegistry::new(SessionId(2));
        assert_eq!(load_labels(&path, &mut loaded).unwrap(), 3);
        assert_eq!(loaded.get(2), "bird");
        assert_eq!(loaded.display_name(0), "0");
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_non_integer_keys_are_skipped() {
        let dir = std::env::temp_dir().join(format!("fgsm-labels-bad-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("labels.json");
        fs::write(&path, r#"{"1": "cat", "dog": "x", "-3": "y"}"#).unwrap();

        let mut registry = LabelRegistry::new(SessionId(3));
        assert_eq!(load_labels(&path, &mut registry).unwrap(), 1);
        assert_eq!(registry.get(1), "cat");
        fs::remove_dir_all(&dir).ok();
    }
}
