//! Fit the transformer and target encoder, then persist the transformed splits.

use tracing::info;

use crate::common::codec::save_object;
use crate::common::config::DataTransformationConfig;
use crate::common::error::{PipelineError, PipelineResult};
use crate::common::time;
use crate::data::domain::{DataValidationArtifact, Table};
use crate::data::repo_fs::read_table;

use super::domain::{DataTransformationArtifact, FeatureMatrix, TargetEncoder, Transformer};

/// Build the feature matrix of `table` with already fitted objects.
pub fn to_matrix(
    transformer: &Transformer,
    encoder: &TargetEncoder,
    table: &Table,
    target: &str,
) -> PipelineResult<FeatureMatrix> {
    Ok(FeatureMatrix {
        features: transformer.feature_names(),
        rows: transformer.transform(table)?,
        targets: encoder.encode_column(table, target)?,
    })
}

pub fn transform(
    cfg: &DataTransformationConfig,
    validation: &DataValidationArtifact,
) -> PipelineResult<DataTransformationArtifact> {
    let start = time::now_ms();
    let train = read_table(&validation.valid_train_file_path)?;
    let test = read_table(&validation.valid_test_file_path)?;

    let transformer = Transformer::fit(&train, &cfg.target_column)?;
    let target_idx = train
        .column_index(&cfg.target_column)
        .ok_or_else(|| {
            PipelineError::invalid(format!("missing target column {}", cfg.target_column))
        })?;
    let encoder = TargetEncoder::fit(train.column(target_idx))?;
    info!(
        features = transformer.columns.len(),
        classes = encoder.classes.len(),
        "transformer and target encoder fitted"
    );

    let train_matrix = to_matrix(&transformer, &encoder, &train, &cfg.target_column)?;
    let test_matrix = to_matrix(&transformer, &encoder, &test, &cfg.target_column)?;

    save_object(&cfg.transform_object_path, &transformer)?;
    save_object(&cfg.target_encoder_path, &encoder)?;
    save_object(&cfg.transformed_train_path, &train_matrix)?;
    save_object(&cfg.transformed_test_path, &test_matrix)?;

    info!(
        train_rows = train_matrix.rows.len(),
        test_rows = test_matrix.rows.len(),
        dur_ms = time::now_ms().saturating_sub(start) as u64,
        "data transformation finished"
    );
    Ok(DataTransformationArtifact {
        transform_object_path: cfg.transform_object_path.clone(),
        transformed_train_path: cfg.transformed_train_path.clone(),
        transformed_test_path: cfg.transformed_test_path.clone(),
        target_encoder_path: cfg.target_encoder_path.clone(),
    })
}
