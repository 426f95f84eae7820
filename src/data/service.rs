//! Ingestion and validation of the source dataset.

use std::collections::BTreeMap;
use std::fs;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::common::config::{DataIngestionConfig, DataValidationConfig};
use crate::common::error::{PipelineError, PipelineResult};
use crate::common::time;

use super::domain::{
    is_missing, DataIngestionArtifact, DataValidationArtifact, Table, ValidationReport,
};
use super::repo_fs::{read_table, write_table};

/// Row counts for a split of `n` rows: `(train, test)`, each side non-empty.
fn split_sizes(n: usize, test_size: f64) -> (usize, usize) {
    let test = ((n as f64) * test_size).round() as usize;
    let test = test.clamp(1, n - 1);
    (n - test, test)
}

/// Copy the source into the feature store and split it into train/test files.
pub fn ingest(cfg: &DataIngestionConfig) -> PipelineResult<DataIngestionArtifact> {
    let start = time::now_ms();
    if !(cfg.test_size > 0.0 && cfg.test_size < 1.0) {
        return Err(PipelineError::config(format!(
            "test_size must be in (0, 1), got {}",
            cfg.test_size
        )));
    }

    info!(source = %cfg.source_path.display(), "reading source dataset");
    let mut table = read_table(&cfg.source_path)?.without_columns(&cfg.drop_columns);
    if table.len() < 2 {
        return Err(PipelineError::invalid(format!(
            "{}: need at least 2 rows to split, found {}",
            cfg.source_path.display(),
            table.len()
        )));
    }
    for cell in table.rows.iter_mut().flatten() {
        if is_missing(cell) {
            cell.clear();
        }
    }
    write_table(&cfg.feature_store_file_path, &table)?;

    let mut order: Vec<usize> = (0..table.len()).collect();
    order.shuffle(&mut StdRng::seed_from_u64(cfg.seed));
    let (_, n_test) = split_sizes(table.len(), cfg.test_size);
    let (test_idx, train_idx) = order.split_at(n_test);

    write_table(&cfg.train_file_path, &table.select_rows(train_idx))?;
    write_table(&cfg.test_file_path, &table.select_rows(test_idx))?;

    info!(
        rows = table.len(),
        train = train_idx.len(),
        test = test_idx.len(),
        dur_ms = time::now_ms().saturating_sub(start) as u64,
        "data ingestion finished"
    );
    Ok(DataIngestionArtifact {
        feature_store_file_path: cfg.feature_store_file_path.clone(),
        train_file_path: cfg.train_file_path.clone(),
        test_file_path: cfg.test_file_path.clone(),
        rows: table.len(),
    })
}

fn absent_columns(required: &[String], table: &Table) -> Vec<String> {
    required
        .iter()
        .filter(|c| table.column_index(c).is_none())
        .cloned()
        .collect()
}

/// Drop sparse columns and check both splits still carry every required column.
///
/// The report is written before any failure is returned.
pub fn validate(
    cfg: &DataValidationConfig,
    ingestion: &DataIngestionArtifact,
) -> PipelineResult<DataValidationArtifact> {
    let start = time::now_ms();
    let base = read_table(&ingestion.feature_store_file_path)?;
    let train = read_table(&ingestion.train_file_path)?;
    let test = read_table(&ingestion.test_file_path)?;

    let mut report = ValidationReport {
        target_column: cfg.target_column.clone(),
        ..ValidationReport::default()
    };

    for (split, table) in [("train", &train), ("test", &test)] {
        let ratios = table
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), table.missing_ratio(idx)))
            .collect();
        report.missing_ratios.insert(split.to_string(), ratios);
    }
    for (idx, name) in train.columns.iter().enumerate() {
        if train.missing_ratio(idx) > cfg.missing_threshold && *name != cfg.target_column {
            report.dropped_columns.push(name.clone());
        }
    }
    if !report.dropped_columns.is_empty() {
        warn!(
            columns = ?report.dropped_columns,
            threshold = cfg.missing_threshold,
            "dropping sparse columns"
        );
    }

    let mut required: Vec<String> = base
        .columns
        .iter()
        .filter(|c| !report.dropped_columns.contains(c))
        .cloned()
        .collect();
    if !required.contains(&cfg.target_column) {
        required.push(cfg.target_column.clone());
    }

    let mut missing = BTreeMap::new();
    for (split, table) in [("train", &train), ("test", &test)] {
        let absent = absent_columns(&required, table);
        if !absent.is_empty() {
            missing.insert(split.to_string(), absent);
        }
    }
    report.missing_columns = missing;
    report.status = if report.missing_columns.is_empty() {
        "ok".to_string()
    } else {
        "failed".to_string()
    };

    if let Some(parent) = cfg.report_file_path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let body = serde_json::to_vec_pretty(&report)
        .map_err(|e| PipelineError::serialization(&cfg.report_file_path, e))?;
    fs::write(&cfg.report_file_path, body)
        .map_err(|e| PipelineError::io(&cfg.report_file_path, e))?;

    if !report.missing_columns.is_empty() {
        return Err(PipelineError::invalid(format!(
            "required columns missing: {:?}",
            report.missing_columns
        )));
    }

    write_table(
        &cfg.valid_train_file_path,
        &train.without_columns(&report.dropped_columns),
    )?;
    write_table(
        &cfg.valid_test_file_path,
        &test.without_columns(&report.dropped_columns),
    )?;

    info!(
        report = %cfg.report_file_path.display(),
        dropped = report.dropped_columns.len(),
        dur_ms = time::now_ms().saturating_sub(start) as u64,
        "data validation finished"
    );
    Ok(DataValidationArtifact {
        report_file_path: cfg.report_file_path.clone(),
        valid_train_file_path: cfg.valid_train_file_path.clone(),
        valid_test_file_path: cfg.valid_test_file_path.clone(),
        dropped_columns: report.dropped_columns,
    })
}
