//! Loaded registry version ready to label new shipments.

use std::path::Path;

use tracing::info;

use crate::common::codec::load_object;
use crate::common::error::{PipelineError, PipelineResult};
use crate::data::domain::Table;
use crate::registry::resolver::ModelResolver;
use crate::training::domain::Model;
use crate::transformation::domain::{TargetEncoder, Transformer};

/// The three artifacts of one registry version, held in memory.
#[derive(Clone, Debug)]
pub struct Predictor {
    pub version: u64,
    transformer: Transformer,
    model: Model,
    target_encoder: TargetEncoder,
}

impl Predictor {
    pub fn new(
        version: u64,
        transformer: Transformer,
        model: Model,
        target_encoder: TargetEncoder,
    ) -> Self {
        Self {
            version,
            transformer,
            model,
            target_encoder,
        }
    }

    /// Load the latest version under `root`; `NoVersion` when the registry is empty.
    pub fn from_registry(root: &Path) -> PipelineResult<Self> {
        let resolver = ModelResolver::new(root);
        let version = resolver
            .get_latest_version_number()
            .ok_or_else(|| PipelineError::NoVersion(root.to_path_buf()))?;
        info!(version, registry = %root.display(), "loading predictor");
        Ok(Self::new(
            version,
            load_object(&resolver.get_latest_transformer_path()?)?,
            load_object(&resolver.get_latest_model_path()?)?,
            load_object(&resolver.get_latest_target_encoder_path()?)?,
        ))
    }

    /// One decoded label per row. Extra columns, including the target, are ignored.
    pub fn predict(&self, table: &Table) -> PipelineResult<Vec<String>> {
        let rows = self.transformer.transform(table)?;
        self.model
            .predict(&rows)?
            .into_iter()
            .map(|c| self.target_encoder.decode(c).map(str::to_string))
            .collect()
    }
}
