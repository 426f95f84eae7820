//! Service layer fitting the model and enforcing the score gates.

use tracing::{info, warn};

use crate::common::codec::{load_object, save_object};
use crate::common::config::ModelTrainerConfig;
use crate::common::error::{PipelineError, PipelineResult};
use crate::common::time;
use crate::transformation::domain::{DataTransformationArtifact, FeatureMatrix};

use super::domain::{f1_macro, ModelTrainerArtifact, NearestCentroidTrainer, Trainer};

/// Train with the default trainer.
pub fn train(
    cfg: &ModelTrainerConfig,
    transformation: &DataTransformationArtifact,
) -> PipelineResult<ModelTrainerArtifact> {
    train_with(&NearestCentroidTrainer, cfg, transformation)
}

/// Fit, score on both splits, reject weak or overfitted models, then save.
pub fn train_with(
    trainer: &dyn Trainer,
    cfg: &ModelTrainerConfig,
    transformation: &DataTransformationArtifact,
) -> PipelineResult<ModelTrainerArtifact> {
    let start = time::now_ms();
    let train: FeatureMatrix = load_object(&transformation.transformed_train_path)?;
    let test: FeatureMatrix = load_object(&transformation.transformed_test_path)?;

    let model = trainer.fit(&train)?;
    let f1_train_score = f1_macro(&train.targets, &model.predict(&train.rows)?);
    let f1_test_score = f1_macro(&test.targets, &model.predict(&test.rows)?);
    info!(f1_train_score, f1_test_score, "model scored");

    if f1_test_score < cfg.expected_score {
        warn!(f1_test_score, expected = cfg.expected_score, "model below expected score");
        return Err(PipelineError::Rejected(format!(
            "test f1 {f1_test_score:.4} below expected {:.4}",
            cfg.expected_score
        )));
    }
    let diff = (f1_train_score - f1_test_score).abs();
    if diff > cfg.overfitting_threshold {
        warn!(diff, threshold = cfg.overfitting_threshold, "model overfits");
        return Err(PipelineError::Rejected(format!(
            "train/test f1 gap {diff:.4} above threshold {:.4}",
            cfg.overfitting_threshold
        )));
    }

    save_object(&cfg.model_path, &model)?;
    info!(
        model = %cfg.model_path.display(),
        dur_ms = time::now_ms().saturating_sub(start) as u64,
        "model training finished"
    );
    Ok(ModelTrainerArtifact {
        model_path: cfg.model_path.clone(),
        f1_train_score,
        f1_test_score,
    })
}
