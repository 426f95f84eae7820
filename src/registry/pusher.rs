//! Promotion of trained artifacts into the pusher directory and the registry.
//!
//! The pusher directory is overwritten on every run. The registry only grows:
//! each push lands in a new version directory. Registry writes go to a hidden
//! staging directory first and are renamed into place once all three files
//! are on disk, so a failed push never leaves an integer-named partial version.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::common::codec::{load_object, save_object};
use crate::common::config::ModelPusherConfig;
use crate::common::error::{PipelineError, PipelineResult};
use crate::common::time;
use crate::training::domain::{Model, ModelTrainerArtifact};
use crate::transformation::domain::{DataTransformationArtifact, TargetEncoder, Transformer};

use super::resolver::{
    ModelResolver, MODEL_FILE_NAME, TARGET_ENCODER_FILE_NAME, TRANSFORMER_FILE_NAME,
};

/// Result record of a successful push.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelPusherArtifact {
    pub pusher_model_dir: PathBuf,
    pub saved_model_dir: PathBuf,
    /// Registry version created by this push.
    pub version: u64,
}

/// Name of the staging directory used while `version` is written.
pub fn staging_dir(root: &Path, version: u64) -> PathBuf {
    root.join(format!(".staging-{version}"))
}

pub struct ModelPusher {
    config: ModelPusherConfig,
    transformer_path: PathBuf,
    model_path: PathBuf,
    target_encoder_path: PathBuf,
    resolver: ModelResolver,
}

impl ModelPusher {
    pub fn new(
        config: ModelPusherConfig,
        transformation: &DataTransformationArtifact,
        trainer: &ModelTrainerArtifact,
    ) -> Self {
        let resolver = ModelResolver::new(&config.saved_model_dir);
        Self {
            transformer_path: transformation.transform_object_path.clone(),
            model_path: trainer.model_path.clone(),
            target_encoder_path: transformation.target_encoder_path.clone(),
            config,
            resolver,
        }
    }

    pub fn initiate_model_pusher(&self) -> PipelineResult<ModelPusherArtifact> {
        let start = time::now_ms();

        info!("loading transformer, model and target encoder");
        let transformer: Transformer = load_object(&self.transformer_path)?;
        let model: Model = load_object(&self.model_path)?;
        let target_encoder: TargetEncoder = load_object(&self.target_encoder_path)?;

        info!(dir = %self.config.pusher_model_dir.display(), "saving into model pusher directory");
        save_object(&self.config.pusher_transformer_path, &transformer)?;
        save_object(&self.config.pusher_model_path, &model)?;
        save_object(&self.config.pusher_target_encoder_path, &target_encoder)?;

        let version = self.resolver.next_version()?;
        self.write_version(version, &transformer, &model, &target_encoder)?;

        let artifact = ModelPusherArtifact {
            pusher_model_dir: self.config.pusher_model_dir.clone(),
            saved_model_dir: self.config.saved_model_dir.clone(),
            version,
        };
        info!(
            ?artifact,
            dur_ms = time::now_ms().saturating_sub(start) as u64,
            "model pusher finished"
        );
        Ok(artifact)
    }

    /// Stage the three artifacts and rename them into `<root>/<version>`.
    /// The staging directory never outlives a failure.
    fn write_version(
        &self,
        version: u64,
        transformer: &Transformer,
        model: &Model,
        target_encoder: &TargetEncoder,
    ) -> PipelineResult<()> {
        let target_dir = self.resolver.root().join(version.to_string());
        info!(version, dir = %target_dir.display(), "saving into saved model directory");

        let staging = staging_dir(self.resolver.root(), version);
        if staging.exists() {
            warn!(dir = %staging.display(), "removing stale staging directory");
            fs::remove_dir_all(&staging).map_err(|e| PipelineError::io(&staging, e))?;
        }
        let staged = save_object(&staging.join(TRANSFORMER_FILE_NAME), transformer)
            .and_then(|_| save_object(&staging.join(MODEL_FILE_NAME), model))
            .and_then(|_| save_object(&staging.join(TARGET_ENCODER_FILE_NAME), target_encoder))
            .and_then(|_| publish(&staging, &target_dir));
        if let Err(err) = staged {
            let _ = fs::remove_dir_all(&staging);
            return Err(err);
        }
        Ok(())
    }
}

fn publish(staging: &Path, target_dir: &Path) -> PipelineResult<()> {
    if fs::symlink_metadata(target_dir).is_ok() {
        return Err(PipelineError::io(
            target_dir,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "registry version already exists",
            ),
        ));
    }
    fs::rename(staging, target_dir).map_err(|e| PipelineError::io(target_dir, e))
}
