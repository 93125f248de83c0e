// ============================================================
// Layer 4 — Data URL Decoder
// ============================================================
// Uploads arrive as "data:<mime>;base64,<payload>". The part before
// the first comma is kept as the header (it only carries the mime
// type); the part after it is base64-decoded into raw bytes.
//
// A missing comma or an invalid base64 payload is a DecodeError. The
// header is not validated: a browser may report an empty or generic
// mime type for .pt / .csv files and the payload is what matters.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::domain::error::{PipelineError, PipelineResult};

/// A decoded upload.
#[derive(Debug, Clone)]
pub struct DataUrl {
    /// Everything before the comma, e.g. "data:text/csv;base64"
    pub header: String,
    pub bytes:  Vec<u8>,
}

impl DataUrl {
    /// The mime type between "data:" and ";base64", if present.
    pub fn mime(&self) -> &str {
        let h = self.header.strip_prefix("data:").unwrap_or(&self.header);
        h.split(';').next().unwrap_or("")
    }
}

pub fn decode_data_url(url: &str) -> PipelineResult<DataUrl> {
    let (header, payload) = url
        .split_once(',')
        .ok_or_else(|| PipelineError::Decode("missing ',' separator in data URL".into()))?;

    // Browsers may wrap long payloads; whitespace is never valid base64.
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| PipelineError::Decode(format!("invalid base64 payload: {e}")))?;

    tracing::debug!("Decoded data URL '{}' ({} bytes)", header, bytes.len());
    Ok(DataUrl { header: header.to_string(), bytes })
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_payload_and_mime() {
        let url = encode_data_url("text/csv", b"1,2,3\n");
        let decoded = decode_data_url(&url).unwrap();
        assert_eq!(decoded.bytes, b"1,2,3\n");
        assert_eq!(decoded.mime(), "text/csv");
    }

    #[test]
    fn test_missing_comma_is_decode_error() {
        let err = decode_data_url("data:text/csv;base64").unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn test_bad_base64_is_decode_error() {
        let err = decode_data_url("data:text/csv;base64,@@not base64@@").unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn test_wrapped_payload_is_accepted() {
        let url = "data:application/octet-stream;base64,aGVs\nbG8=";
        assert_eq!(decode_data_url(url).unwrap().bytes, b"hello");
    }
}
