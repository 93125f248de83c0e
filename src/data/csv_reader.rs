// ============================================================
// Layer 4 — Dataset CSV Reader
// ============================================================
// Parses the uploaded CSV into labelled pixel rows:
//
//   label,p0,p1,...,p783
//   7,0,0,...,0
//   2,0,0,...,0
//
// Rules:
//   - first column is an integer class label (>= 0)
//   - remaining columns are pixel intensities, clamped to [0,255]
//   - every row must have the same number of columns
//   - blank lines are skipped
//   - a leading column-name row is skipped when its first field is
//     not an integer and at least one other field is not a number
//
// The row length is NOT checked against the classifier here: that
// is the normalizer's job, which knows the expected spatial size.

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::{Dataset, LabeledRow};

pub fn parse_dataset(bytes: &[u8]) -> PipelineResult<Dataset> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| PipelineError::DatasetFormat(format!("CSV is not valid UTF-8: {e}")))?;

    let mut rows: Vec<LabeledRow> = Vec::new();
    let mut expected_cols: Option<usize> = None;
    let mut seen_first = false;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();

        if !seen_first {
            seen_first = true;
            if looks_like_header(&fields) {
                tracing::debug!("Skipping CSV header row ({} columns)", fields.len());
                continue;
            }
        }

        match expected_cols {
            None => expected_cols = Some(fields.len()),
            Some(n) if n != fields.len() => {
                return Err(PipelineError::DatasetFormat(format!(
                    "line {} has {} columns, expected {}",
                    line_no + 1,
                    fields.len(),
                    n
                )));
            }
            Some(_) => {}
        }

        rows.push(parse_row(&fields, line_no + 1)?);
    }

    if rows.is_empty() {
        return Err(PipelineError::DatasetFormat("CSV contains no data rows".into()));
    }

    tracing::info!(
        "Parsed {} dataset rows with {} pixel columns",
        rows.len(),
        expected_cols.unwrap_or(1) - 1
    );
    Ok(Dataset::new(rows))
}

fn parse_row(fields: &[&str], line_no: usize) -> PipelineResult<LabeledRow> {
    let label_field = fields[0];
    let label = label_field.parse::<i64>().map_err(|_| {
        PipelineError::DatasetFormat(format!(
            "line {line_no}: label '{label_field}' is not an integer"
        ))
    })?;
    let label = usize::try_from(label).map_err(|_| {
        PipelineError::DatasetFormat(format!("line {line_no}: label {label} is negative"))
    })?;

    let pixels = fields[1..]
        .iter()
        .enumerate()
        .map(|(col, field)| match field.parse::<f32>() {
            Ok(v) if v.is_finite() => Ok(v.clamp(0.0, 255.0)),
            _ => Err(PipelineError::DatasetFormat(format!(
                "line {line_no}, column {}: '{field}' is not a pixel value",
                col + 2
            ))),
        })
        .collect::<PipelineResult<Vec<f32>>>()?;

    Ok(LabeledRow { label, pixels })
}

fn looks_like_header(fields: &[&str]) -> bool {
    let label_is_int = fields[0].parse::<i64>().is_ok();
    let any_text = fields[1..].iter().any(|f| f.parse::<f64>().is_err());
    !label_is_int && any_text
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_headerless_rows() {
        let ds = parse_dataset(b"3,0,255\n1,128,64\n").unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[0].label, 3);
        assert_eq!(ds.rows()[1].pixels, vec![128.0, 64.0]);
    }

    #[test]
    fn test_skips_header_and_blank_lines() {
        let ds = parse_dataset(b"label,pixel0,pixel1\n\n0,1,2\r\n").unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.labels(), vec![0]);
    }

    #[test]
    fn test_inconsistent_columns_rejected() {
        let err = parse_dataset(b"0,1,2\n1,2\n").unwrap_err();
        assert!(matches!(err, PipelineError::DatasetFormat(_)));
    }

    #[test]
    fn test_non_integer_label_rejected() {
        let err = parse_dataset(b"0,1,2\n1.5,2,3\n").unwrap_err();
        assert!(matches!(err, PipelineError::DatasetFormat(_)));
    }

    #[test]
    fn test_negative_label_rejected() {
        let err = parse_dataset(b"-1,2,3\n").unwrap_err();
        assert!(matches!(err, PipelineError::DatasetFormat(_)));
    }

    #[test]
    fn test_out_of_range_pixels_are_clamped() {
        let ds = parse_dataset(b"0,-4,300\n").unwrap();
        assert_eq!(ds.rows()[0].pixels, vec![0.0, 255.0]);
    }

    #[test]
    fn test_empty_csv_rejected() {
        assert!(parse_dataset(b"\n\n").is_err());
    }
}
