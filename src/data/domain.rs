//! Tabular data and the records produced by the ingestion and validation stages.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::common::error::{PipelineError, PipelineResult};

/// Cell values treated as missing.
pub const MISSING_MARKERS: [&str; 5] = ["", "na", "NA", "NaN", "nan"];

pub fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell.trim())
}

/// In-memory table: one header row and string cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, checking that headers are unique and rows match the header width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> PipelineResult<Self> {
        let mut seen = HashSet::new();
        for c in &columns {
            if !seen.insert(c.as_str()) {
                return Err(PipelineError::invalid(format!("duplicate column: {c}")));
            }
        }
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(PipelineError::invalid(format!(
                "row {} has {} cells, expected {}",
                idx + 1,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, idx: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |r| r[idx].as_str())
    }

    /// Share of missing cells in a column; `0.0` for an empty table.
    pub fn missing_ratio(&self, idx: usize) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let missing = self.column(idx).filter(|c| is_missing(c)).count();
        missing as f64 / self.rows.len() as f64
    }

    /// Copy of the table without the named columns. Unknown names are skipped.
    pub fn without_columns(&self, names: &[String]) -> Table {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !names.contains(&self.columns[i]))
            .collect();
        Table {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| keep.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        }
    }

    /// Copy of the table holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

/// Output of the ingestion stage.
#[derive(Clone, Debug, Serialize)]
pub struct DataIngestionArtifact {
    pub feature_store_file_path: PathBuf,
    pub train_file_path: PathBuf,
    pub test_file_path: PathBuf,
    pub rows: usize,
}

/// Output of the validation stage.
#[derive(Clone, Debug, Serialize)]
pub struct DataValidationArtifact {
    pub report_file_path: PathBuf,
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
    pub dropped_columns: Vec<String>,
}

/// JSON report written by the validation stage.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub status: String,
    pub target_column: String,
    pub dropped_columns: Vec<String>,
    pub missing_columns: BTreeMap<String, Vec<String>>,
    /// Missing ratio per column, keyed by split (`train`, `test`).
    pub missing_ratios: BTreeMap<String, BTreeMap<String, f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn ragged_rows_and_duplicate_headers_are_rejected() {
        assert!(Table::new(s(&["a", "b"]), vec![s(&["1"])]).is_err());
        assert!(Table::new(s(&["a", "a"]), vec![]).is_err());
    }

    #[test]
    fn missing_ratio_counts_all_markers() {
        let t = Table::new(
            s(&["a"]),
            vec![s(&["1"]), s(&["na"]), s(&[""]), s(&["NaN"])],
        )
        .unwrap();
        assert_eq!(t.missing_ratio(0), 0.75);
    }

    #[test]
    fn column_and_row_selection() {
        let t = Table::new(
            s(&["a", "b", "c"]),
            vec![s(&["1", "2", "3"]), s(&["4", "5", "6"])],
        )
        .unwrap();
        let dropped = t.without_columns(&s(&["b", "zzz"]));
        assert_eq!(dropped.columns, s(&["a", "c"]));
        assert_eq!(dropped.rows[1], s(&["4", "6"]));

        let picked = t.select_rows(&[1]);
        assert_eq!(picked.rows, vec![s(&["4", "5", "6"])]);
    }
}
