//! Score the new model against the latest registry version on the current test split.

use tracing::{info, warn};

use crate::common::codec::load_object;
use crate::common::config::ModelEvaluationConfig;
use crate::common::error::{PipelineError, PipelineResult};
use crate::common::time;
use crate::data::domain::{DataValidationArtifact, Table};
use crate::data::repo_fs::read_table;
use crate::registry::resolver::ModelResolver;
use crate::training::domain::{f1_macro, Model, ModelTrainerArtifact};
use crate::transformation::domain::{DataTransformationArtifact, TargetEncoder, Transformer};

use super::domain::ModelEvaluationArtifact;

/// Encoded index used for predictions the reference encoder does not know.
const UNKNOWN_CLASS: usize = usize::MAX;

/// Predicted labels of one (transformer, model, encoder) triple.
fn predict_labels(
    transformer: &Transformer,
    model: &Model,
    encoder: &TargetEncoder,
    table: &Table,
) -> PipelineResult<Vec<String>> {
    let rows = transformer.transform(table)?;
    model
        .predict(&rows)?
        .into_iter()
        .map(|c| encoder.decode(c).map(str::to_string))
        .collect()
}

/// F1 of `labels` against the test targets, both expressed in `reference` encoding.
fn score(reference: &TargetEncoder, truth: &[usize], labels: &[String]) -> f64 {
    let pred: Vec<usize> = labels
        .iter()
        .map(|l| reference.encode(l).unwrap_or(UNKNOWN_CLASS))
        .collect();
    f1_macro(truth, &pred)
}

pub fn evaluate(
    cfg: &ModelEvaluationConfig,
    validation: &DataValidationArtifact,
    transformation: &DataTransformationArtifact,
    trainer: &ModelTrainerArtifact,
) -> PipelineResult<ModelEvaluationArtifact> {
    let start = time::now_ms();
    let resolver = ModelResolver::new(&cfg.saved_model_dir);

    let Some(previous_version) = resolver.get_latest_version_number() else {
        info!(registry = %cfg.saved_model_dir.display(), "no previous model, accepting");
        return Ok(ModelEvaluationArtifact {
            is_model_accepted: true,
            current_score: trainer.f1_test_score,
            previous_score: None,
            previous_version: None,
            improved_score: trainer.f1_test_score,
        });
    };

    let test = read_table(&validation.valid_test_file_path)?;

    let transformer: Transformer = load_object(&transformation.transform_object_path)?;
    let encoder: TargetEncoder = load_object(&transformation.target_encoder_path)?;
    let model: Model = load_object(&trainer.model_path)?;
    let truth = encoder.encode_column(&test, &cfg.target_column)?;

    let prev_transformer: Transformer = load_object(&resolver.get_latest_transformer_path()?)?;
    let prev_encoder: TargetEncoder = load_object(&resolver.get_latest_target_encoder_path()?)?;
    let prev_model: Model = load_object(&resolver.get_latest_model_path()?)?;

    let current_score = score(
        &encoder,
        &truth,
        &predict_labels(&transformer, &model, &encoder, &test)?,
    );
    let previous_score = score(
        &encoder,
        &truth,
        &predict_labels(&prev_transformer, &prev_model, &prev_encoder, &test)?,
    );
    let improved_score = current_score - previous_score;
    info!(previous_version, previous_score, current_score, improved_score, "models compared");

    if previous_score - current_score > cfg.change_threshold {
        warn!(
            previous_score,
            current_score,
            "trained model is worse than the latest registry model"
        );
        return Err(PipelineError::Rejected(format!(
            "current f1 {current_score:.4} is worse than version {previous_version} \
             ({previous_score:.4})"
        )));
    }

    info!(
        dur_ms = time::now_ms().saturating_sub(start) as u64,
        "model evaluation finished"
    );
    Ok(ModelEvaluationArtifact {
        is_model_accepted: true,
        current_score,
        previous_score: Some(previous_score),
        previous_version: Some(previous_version),
        improved_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::codec::save_object;
    use crate::common::error::ErrorCode;
    use crate::registry::resolver::{
        MODEL_FILE_NAME, TARGET_ENCODER_FILE_NAME, TRANSFORMER_FILE_NAME,
    };
    use crate::transformation::domain::ColumnScaler;
    use std::fs;
    use std::path::Path;

    fn transformer() -> Transformer {
        Transformer {
            columns: vec![ColumnScaler {
                name: "x".into(),
                median: 0.0,
                scale: 1.0,
            }],
        }
    }

    fn encoder() -> TargetEncoder {
        TargetEncoder {
            classes: vec!["early".into(), "late".into()],
        }
    }

    fn good_model() -> Model {
        Model {
            features: vec!["x".into()],
            centroids: vec![vec![-1.0], vec![1.0]],
        }
    }

    fn inverted_model() -> Model {
        Model {
            features: vec!["x".into()],
            centroids: vec![vec![1.0], vec![-1.0]],
        }
    }

    struct Setup {
        _dir: tempfile::TempDir,
        cfg: ModelEvaluationConfig,
        validation: DataValidationArtifact,
        transformation: DataTransformationArtifact,
        trainer: ModelTrainerArtifact,
    }

    fn setup(current: &Model) -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path();
        fs::write(p.join("test.csv"), "x,target\n-2,early\n-1,early\n1,late\n2,late\n").unwrap();
        let transformation = DataTransformationArtifact {
            transform_object_path: p.join("w/transformer.json"),
            transformed_train_path: p.join("w/train.json"),
            transformed_test_path: p.join("w/test.json"),
            target_encoder_path: p.join("w/target_encoder.json"),
        };
        save_object(&transformation.transform_object_path, &transformer()).unwrap();
        save_object(&transformation.target_encoder_path, &encoder()).unwrap();
        let trainer = ModelTrainerArtifact {
            model_path: p.join("w/model.json"),
            f1_train_score: 1.0,
            f1_test_score: 1.0,
        };
        save_object(&trainer.model_path, current).unwrap();
        Setup {
            cfg: ModelEvaluationConfig {
                saved_model_dir: p.join("saved_models"),
                change_threshold: 0.01,
                target_column: "target".into(),
            },
            validation: DataValidationArtifact {
                report_file_path: p.join("report.json"),
                valid_train_file_path: p.join("train.csv"),
                valid_test_file_path: p.join("test.csv"),
                dropped_columns: vec![],
            },
            transformation,
            trainer,
            _dir: dir,
        }
    }

    fn register(root: &Path, version: u64, model: &Model) {
        let dir = root.join(version.to_string());
        save_object(&dir.join(TRANSFORMER_FILE_NAME), &transformer()).unwrap();
        save_object(&dir.join(TARGET_ENCODER_FILE_NAME), &encoder()).unwrap();
        save_object(&dir.join(MODEL_FILE_NAME), model).unwrap();
    }

    fn run(s: &Setup) -> PipelineResult<ModelEvaluationArtifact> {
        evaluate(&s.cfg, &s.validation, &s.transformation, &s.trainer)
    }

    #[test]
    fn empty_registry_accepts() {
        let s = setup(&good_model());
        let art = run(&s).unwrap();
        assert!(art.is_model_accepted);
        assert_eq!(art.previous_version, None);
    }

    #[test]
    fn better_or_equal_model_is_accepted() {
        let s = setup(&good_model());
        register(&s.cfg.saved_model_dir, 0, &inverted_model());
        let art = run(&s).unwrap();
        assert_eq!(art.previous_version, Some(0));
        assert_eq!(art.current_score, 1.0);
        assert_eq!(art.previous_score, Some(0.0));

        register(&s.cfg.saved_model_dir, 1, &good_model());
        let art = run(&s).unwrap();
        assert_eq!(art.previous_version, Some(1));
        assert_eq!(art.improved_score, 0.0);
    }

    #[test]
    fn worse_model_is_rejected() {
        let s = setup(&inverted_model());
        register(&s.cfg.saved_model_dir, 0, &good_model());
        let err = run(&s).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Rejected);
    }
}
