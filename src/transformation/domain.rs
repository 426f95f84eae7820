//! Fitted preprocessing objects: the feature transformer and the target encoder.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::common::codec::Artifact;
use crate::common::error::{PipelineError, PipelineResult};
use crate::data::domain::{is_missing, Table};

/// Linear-interpolated quantile of an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn parse_cell(column: &str, row: usize, cell: &str) -> PipelineResult<Option<f64>> {
    if is_missing(cell) {
        return Ok(None);
    }
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| {
            PipelineError::invalid(format!(
                "column {column}, row {}: {cell:?} is not numeric",
                row + 1
            ))
        })
}

/// Median imputation and robust scaling parameters of one feature column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnScaler {
    pub name: String,
    pub median: f64,
    /// Interquartile range, `1.0` when the range is zero.
    pub scale: f64,
}

impl ColumnScaler {
    pub fn apply(&self, value: Option<f64>) -> f64 {
        (value.unwrap_or(self.median) - self.median) / self.scale
    }
}

/// Per-column imputer + robust scaler fitted on the training split.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transformer {
    pub columns: Vec<ColumnScaler>,
}

impl Artifact for Transformer {
    const KIND: &'static str = "transformer";
}

impl Transformer {
    /// Fit on every column of `table` except `target`.
    pub fn fit(table: &Table, target: &str) -> PipelineResult<Self> {
        let mut columns = Vec::new();
        for (idx, name) in table.columns.iter().enumerate() {
            if name == target {
                continue;
            }
            let mut values = Vec::with_capacity(table.len());
            for (row, cell) in table.column(idx).enumerate() {
                if let Some(v) = parse_cell(name, row, cell)? {
                    values.push(v);
                }
            }
            let scaler = if values.is_empty() {
                ColumnScaler {
                    name: name.clone(),
                    median: 0.0,
                    scale: 1.0,
                }
            } else {
                values.sort_by(f64::total_cmp);
                let iqr = quantile(&values, 0.75) - quantile(&values, 0.25);
                ColumnScaler {
                    name: name.clone(),
                    median: quantile(&values, 0.5),
                    scale: if iqr > 0.0 { iqr } else { 1.0 },
                }
            };
            columns.push(scaler);
        }
        if columns.is_empty() {
            return Err(PipelineError::invalid("no feature columns besides the target"));
        }
        Ok(Self { columns })
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Impute and scale the fitted columns of `table`, in fitted order.
    pub fn transform(&self, table: &Table) -> PipelineResult<Vec<Vec<f64>>> {
        let indices = self
            .columns
            .iter()
            .map(|c| {
                table.column_index(&c.name).ok_or_else(|| {
                    PipelineError::invalid(format!("missing feature column {}", c.name))
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        table
            .rows
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                self.columns
                    .iter()
                    .zip(&indices)
                    .map(|(scaler, &idx)| {
                        parse_cell(&scaler.name, row, &cells[idx]).map(|v| scaler.apply(v))
                    })
                    .collect::<PipelineResult<Vec<f64>>>()
            })
            .collect()
    }
}

/// Label encoder mapping class names to dense indices in sorted order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetEncoder {
    pub classes: Vec<String>,
}

impl Artifact for TargetEncoder {
    const KIND: &'static str = "target_encoder";
}

impl TargetEncoder {
    pub fn fit<'a>(labels: impl IntoIterator<Item = &'a str>) -> PipelineResult<Self> {
        let mut classes = BTreeSet::new();
        for label in labels {
            if is_missing(label) {
                return Err(PipelineError::invalid("target column has missing labels"));
            }
            classes.insert(label.trim().to_string());
        }
        if classes.is_empty() {
            return Err(PipelineError::invalid("no target labels to encode"));
        }
        Ok(Self {
            classes: classes.into_iter().collect(),
        })
    }

    pub fn encode(&self, label: &str) -> PipelineResult<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label.trim()))
            .map_err(|_| PipelineError::invalid(format!("unknown target label {label:?}")))
    }

    pub fn decode(&self, index: usize) -> PipelineResult<&str> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| PipelineError::invalid(format!("class index {index} out of range")))
    }

    /// Encode the `target` column of `table`.
    pub fn encode_column(&self, table: &Table, target: &str) -> PipelineResult<Vec<usize>> {
        let idx = table
            .column_index(target)
            .ok_or_else(|| PipelineError::invalid(format!("missing target column {target}")))?;
        table.column(idx).map(|label| self.encode(label)).collect()
    }
}

/// Transformed features and encoded targets of one split.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub features: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<usize>,
}

impl Artifact for FeatureMatrix {
    const KIND: &'static str = "feature_matrix";
}

/// Output of the transformation stage.
#[derive(Clone, Debug, Serialize)]
pub struct DataTransformationArtifact {
    pub transform_object_path: PathBuf,
    pub transformed_train_path: PathBuf,
    pub transformed_test_path: PathBuf,
    pub target_encoder_path: PathBuf,
}
