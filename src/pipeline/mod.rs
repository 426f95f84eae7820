//! End-to-end training pipeline: one run from the source CSV to a new registry version.
//!
//! Each stage receives the artifacts of the stages before it explicitly and
//! writes under its own directory of `<artifact_root>/<run id>`. Nothing is
//! shared through globals, so two runners with different run ids do not meet
//! on disk apart from the registry.

use serde::Serialize;
use tracing::{info, info_span};

use crate::common::config::{PipelineCfg, TrainingPipelineConfig};
use crate::common::error::{PipelineResult, Stage};
use crate::common::time;
use crate::data::domain::{DataIngestionArtifact, DataValidationArtifact};
use crate::data::service as data_service;
use crate::evaluation::domain::ModelEvaluationArtifact;
use crate::evaluation::service as evaluation_service;
use crate::registry::pusher::{ModelPusher, ModelPusherArtifact};
use crate::training::domain::ModelTrainerArtifact;
use crate::training::service as training_service;
use crate::transformation::domain::DataTransformationArtifact;
use crate::transformation::service as transformation_service;

/// Every artifact produced by a successful run.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineOutcome {
    pub run_id: String,
    pub data_ingestion: DataIngestionArtifact,
    pub data_validation: DataValidationArtifact,
    pub data_transformation: DataTransformationArtifact,
    pub model_trainer: ModelTrainerArtifact,
    pub model_evaluation: ModelEvaluationArtifact,
    pub model_pusher: ModelPusherArtifact,
}

pub struct PipelineRunner {
    run_id: String,
    config: TrainingPipelineConfig,
}

impl PipelineRunner {
    /// Runner whose working directory is named after the current time.
    pub fn new(cfg: PipelineCfg) -> Self {
        Self::with_run_id(cfg, time::run_id())
    }

    pub fn with_run_id(cfg: PipelineCfg, run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        let config = TrainingPipelineConfig::new(cfg, &run_id);
        Self { run_id, config }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn config(&self) -> &TrainingPipelineConfig {
        &self.config
    }

    /// Run all six stages in order. The first failure aborts the run and is
    /// returned wrapped with the stage it came from.
    pub fn run(&self) -> PipelineResult<PipelineOutcome> {
        let _span = info_span!("pipeline", run_id = %self.run_id).entered();
        let start = time::now_ms();
        let c = &self.config;

        let data_ingestion = stage(Stage::Ingestion, || {
            data_service::ingest(&c.data_ingestion())
        })?;
        let data_validation = stage(Stage::Validation, || {
            data_service::validate(&c.data_validation(), &data_ingestion)
        })?;
        let data_transformation = stage(Stage::Transformation, || {
            transformation_service::transform(&c.data_transformation(), &data_validation)
        })?;
        let model_trainer = stage(Stage::Training, || {
            training_service::train(&c.model_trainer(), &data_transformation)
        })?;
        let model_evaluation = stage(Stage::Evaluation, || {
            evaluation_service::evaluate(
                &c.model_evaluation(),
                &data_validation,
                &data_transformation,
                &model_trainer,
            )
        })?;
        let model_pusher = stage(Stage::Pushing, || {
            ModelPusher::new(c.model_pusher(), &data_transformation, &model_trainer)
                .initiate_model_pusher()
        })?;

        info!(
            version = model_pusher.version,
            dur_ms = time::now_ms().saturating_sub(start) as u64,
            "pipeline finished"
        );
        Ok(PipelineOutcome {
            run_id: self.run_id.clone(),
            data_ingestion,
            data_validation,
            data_transformation,
            model_trainer,
            model_evaluation,
            model_pusher,
        })
    }
}

fn stage<T>(which: Stage, f: impl FnOnce() -> PipelineResult<T>) -> PipelineResult<T> {
    let _span = info_span!("stage", stage = which.as_str()).entered();
    info!("stage started");
    f().map_err(|e| e.in_stage(which))
}
