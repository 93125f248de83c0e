// ============================================================
// Layer 4 — File Artifact Loader
// ============================================================
// Reads a model or dataset file from disk and presents it as the
// same base64 data URL a browser upload would produce, so the CLI
// goes through exactly the same decode path as an upload.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::data::decoder::encode_data_url;
use crate::domain::traits::ArtifactSource;

/// An artifact stored as a file on disk.
pub struct FileArtifact {
    path: PathBuf,
}

impl FileArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn mime(&self) -> &'static str {
        match self.path.extension().and_then(|e| e.to_str()) {
            Some("csv") => "text/csv",
            Some("json") => "application/json",
            _ => "application/octet-stream",
        }
    }
}

impl ArtifactSource for FileArtifact {
    fn describe(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }

    fn data_url(&self) -> Result<String> {
        let bytes = fs::read(&self.path)
            .with_context(|| format!("Cannot read '{}'", self.path.display()))?;
        tracing::debug!("Read {} ({} bytes)", self.path.display(), bytes.len());
        Ok(encode_data_url(self.mime(), &bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::decoder::decode_data_url;

    #[test]
    fn test_file_round_trips_through_data_url() {
        let dir = std::env::temp_dir().join(format!("fgsm-lab-loader-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tiny.csv");
        fs::write(&path, "1,2,3\n").unwrap();

        let artifact = FileArtifact::new(&path);
        assert_eq!(artifact.describe(), "tiny.csv");
        let decoded = decode_data_url(&artifact.data_url().unwrap()).unwrap();
        assert_eq!(decoded.mime(), "text/csv");
        assert_eq!(decoded.bytes, b"1,2,3\n");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let artifact = FileArtifact::new("/definitely/not/here.csv");
        assert!(artifact.data_url().is_err());
    }
}
