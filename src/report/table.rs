// ============================================================
// Report — Classification Table
// ============================================================
// Flattens a ClassificationReport into display rows:
//
//   Class | Precision | Recall | F1-Score | Support
//   ------+-----------+--------+----------+--------
//   zero  |   1.00    |  0.90  |   0.95   |   10       one row per class
//   ...
//   accuracy          |        |   0.93   |  100       emphasised
//   macro avg         |  ...                           emphasised
//   weighted avg      |  ...                           emphasised
//
// Values are kept at full precision; Display rounds to 2 decimals.

use std::fmt;

use serde::Serialize;

use crate::report::metrics::ClassificationReport;

pub const COLUMNS: [&str; 5] = ["Class", "Precision", "Recall", "F1-Score", "Support"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    #[serde(rename = "Class")]
    pub class: String,
    /// None on the accuracy row, which only has a score and a support
    #[serde(rename = "Precision")]
    pub precision: Option<f64>,
    #[serde(rename = "Recall")]
    pub recall: Option<f64>,
    #[serde(rename = "F1-Score")]
    pub f1_score: f64,
    #[serde(rename = "Support")]
    pub support: u64,
    /// Aggregate rows are drawn emphasised
    pub emphasis: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTable {
    pub columns: [&'static str; 5],
    pub rows:    Vec<TableRow>,
}

impl ReportTable {
    /// `names[c]` is the display name of class c.
    pub fn build(report: &ClassificationReport, names: &[String]) -> Self {
        let mut rows: Vec<TableRow> = report
            .classes
            .iter()
            .map(|m| TableRow {
                class:     names.get(m.class).cloned().unwrap_or_else(|| m.class.to_string()),
                precision: Some(m.precision),
                recall:    Some(m.recall),
                f1_score:  m.f1,
                support:   m.support,
                emphasis:  false,
            })
            .collect();

        rows.push(TableRow {
            class:     "accuracy".into(),
            precision: None,
            recall:    None,
            f1_score:  report.accuracy,
            support:   report.total,
            emphasis:  true,
        });
        for (label, avg) in [("macro avg", &report.macro_avg), ("weighted avg", &report.weighted_avg)] {
            rows.push(TableRow {
                class:     label.into(),
                precision: Some(avg.precision),
                recall:    Some(avg.recall),
                f1_score:  avg.f1,
                support:   avg.support,
                emphasis:  true,
            });
        }

        Self { columns: COLUMNS, rows }
    }

    pub fn class_rows(&self) -> impl Iterator<Item = &TableRow> {
        self.rows.iter().filter(|r| !r.emphasis)
    }

    pub fn aggregate_rows(&self) -> impl Iterator<Item = &TableRow> {
        self.rows.iter().filter(|r| r.emphasis)
    }
}

impl fmt::Display for ReportTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .map(|r| r.class.chars().count())
            .chain(std::iter::once(COLUMNS[0].len()))
            .max()
            .unwrap_or(5);

        let cell = |v: Option<f64>| v.map(|x| format!("{x:.2}")).unwrap_or_default();

        writeln!(
            f,
            "{:<width$} {:>9} {:>9} {:>9} {:>9}",
            COLUMNS[0], COLUMNS[1], COLUMNS[2], COLUMNS[3], COLUMNS[4]
        )?;
        writeln!(f, "{}", "-".repeat(width + 40))?;

        let mut separated = false;
        for row in &self.rows {
            if row.emphasis && !separated {
                writeln!(f)?;
                separated = true;
            }
            let name = if row.emphasis { row.class.to_uppercase() } else { row.class.clone() };
            writeln!(
                f,
                "{:<width$} {:>9} {:>9} {:>9.2} {:>9}",
                name,
                cell(row.precision),
                cell(row.recall),
                row.f1_score,
                row.support
            )?;
        }
        Ok(())
    }
}
