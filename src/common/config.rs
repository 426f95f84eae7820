//! Runtime configuration loaded from an optional JSON file and the environment.
//!
//! Precedence: built-in defaults, then the file, then `SHIPMENT_*` variables.
//! [`TrainingPipelineConfig`] derives every per-stage path from one run id so
//! stages never build paths on their own.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::common::error::{PipelineError, PipelineResult};
use crate::registry::resolver::{MODEL_FILE_NAME, TARGET_ENCODER_FILE_NAME, TRANSFORMER_FILE_NAME};

/// Snapshot of configuration values consumed by the pipeline.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineCfg {
    /// CSV file the ingestion stage reads.
    pub source_path: PathBuf,
    /// Parent of the per-run working directories.
    pub artifact_root: PathBuf,
    /// Registry root holding versioned snapshots.
    pub saved_model_dir: PathBuf,
    pub target_column: String,
    pub drop_columns: Vec<String>,
    pub test_size: f64,
    pub seed: u64,
    pub missing_threshold: f64,
    pub expected_score: f64,
    pub overfitting_threshold: f64,
    pub change_threshold: f64,
    pub log_json: bool,
}

impl Default for PipelineCfg {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("data/shipment.csv"),
            artifact_root: PathBuf::from("artifact"),
            saved_model_dir: PathBuf::from("saved_models"),
            target_column: "target".to_string(),
            drop_columns: Vec::new(),
            test_size: 0.2,
            seed: 42,
            missing_threshold: 0.2,
            expected_score: 0.7,
            overfitting_threshold: 0.1,
            change_threshold: 0.01,
            log_json: false,
        }
    }
}

impl PipelineCfg {
    /// Load defaults, merge the optional file, apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> PipelineResult<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        if !path.exists() {
            return Err(PipelineError::MissingInput(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        serde_json::from_str(&raw)
            .map_err(|e| PipelineError::config(format!("{}: {e}", path.display())))
    }

    fn apply_env(&mut self) {
        fn env_path(key: &str) -> Option<PathBuf> {
            env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from)
        }

        if let Some(p) = env_path("SHIPMENT_SOURCE") {
            self.source_path = p;
        }
        if let Some(p) = env_path("SHIPMENT_ARTIFACT_ROOT") {
            self.artifact_root = p;
        }
        if let Some(p) = env_path("SHIPMENT_SAVED_MODEL_DIR") {
            self.saved_model_dir = p;
        }
        if let Ok(target) = env::var("SHIPMENT_TARGET") {
            if !target.is_empty() {
                self.target_column = target;
            }
        }
        if let Ok(flag) = env::var("SHIPMENT_JSON_LOG") {
            self.log_json = flag == "1" || flag.eq_ignore_ascii_case("true");
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.target_column.trim().is_empty() {
            return Err(PipelineError::config("target_column must not be empty"));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PipelineError::config(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        let unit = [
            ("missing_threshold", self.missing_threshold),
            ("expected_score", self.expected_score),
            ("overfitting_threshold", self.overfitting_threshold),
            ("change_threshold", self.change_threshold),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::config(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if self.drop_columns.iter().any(|c| c == &self.target_column) {
            return Err(PipelineError::config("target_column cannot be dropped"));
        }
        Ok(())
    }
}

/// Root of one pipeline run: `<artifact_root>/<run id>`.
#[derive(Clone, Debug)]
pub struct TrainingPipelineConfig {
    pub artifact_dir: PathBuf,
    pub cfg: PipelineCfg,
}

impl TrainingPipelineConfig {
    pub fn new(cfg: PipelineCfg, run_id: &str) -> Self {
        Self {
            artifact_dir: cfg.artifact_root.join(run_id),
            cfg,
        }
    }

    fn stage_dir(&self, name: &str) -> PathBuf {
        self.artifact_dir.join(name)
    }

    pub fn data_ingestion(&self) -> DataIngestionConfig {
        let dir = self.stage_dir("data_ingestion");
        let file_name = self
            .cfg
            .source_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "source.csv".into());
        DataIngestionConfig {
            source_path: self.cfg.source_path.clone(),
            feature_store_file_path: dir.join("feature_store").join(file_name),
            train_file_path: dir.join("dataset").join("train.csv"),
            test_file_path: dir.join("dataset").join("test.csv"),
            drop_columns: self.cfg.drop_columns.clone(),
            test_size: self.cfg.test_size,
            seed: self.cfg.seed,
        }
    }

    pub fn data_validation(&self) -> DataValidationConfig {
        let dir = self.stage_dir("data_validation");
        DataValidationConfig {
            report_file_path: dir.join("report.json"),
            valid_train_file_path: dir.join("validated").join("train.csv"),
            valid_test_file_path: dir.join("validated").join("test.csv"),
            missing_threshold: self.cfg.missing_threshold,
            target_column: self.cfg.target_column.clone(),
        }
    }

    pub fn data_transformation(&self) -> DataTransformationConfig {
        let dir = self.stage_dir("data_transformation");
        DataTransformationConfig {
            transform_object_path: dir.join("transformer").join(TRANSFORMER_FILE_NAME),
            transformed_train_path: dir.join("transformed").join("train.json"),
            transformed_test_path: dir.join("transformed").join("test.json"),
            target_encoder_path: dir.join("target_encoder").join(TARGET_ENCODER_FILE_NAME),
            target_column: self.cfg.target_column.clone(),
        }
    }

    pub fn model_trainer(&self) -> ModelTrainerConfig {
        ModelTrainerConfig {
            model_path: self
                .stage_dir("model_trainer")
                .join("model")
                .join(MODEL_FILE_NAME),
            expected_score: self.cfg.expected_score,
            overfitting_threshold: self.cfg.overfitting_threshold,
        }
    }

    pub fn model_evaluation(&self) -> ModelEvaluationConfig {
        ModelEvaluationConfig {
            saved_model_dir: self.cfg.saved_model_dir.clone(),
            change_threshold: self.cfg.change_threshold,
            target_column: self.cfg.target_column.clone(),
        }
    }

    pub fn model_pusher(&self) -> ModelPusherConfig {
        ModelPusherConfig::new(
            self.stage_dir("model_pusher").join("saved_models"),
            self.cfg.saved_model_dir.clone(),
        )
    }
}

#[derive(Clone, Debug)]
pub struct DataIngestionConfig {
    pub source_path: PathBuf,
    pub feature_store_file_path: PathBuf,
    pub train_file_path: PathBuf,
    pub test_file_path: PathBuf,
    pub drop_columns: Vec<String>,
    pub test_size: f64,
    pub seed: u64,
}

#[derive(Clone, Debug)]
pub struct DataValidationConfig {
    pub report_file_path: PathBuf,
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
    pub missing_threshold: f64,
    pub target_column: String,
}

#[derive(Clone, Debug)]
pub struct DataTransformationConfig {
    pub transform_object_path: PathBuf,
    pub transformed_train_path: PathBuf,
    pub transformed_test_path: PathBuf,
    pub target_encoder_path: PathBuf,
    pub target_column: String,
}

#[derive(Clone, Debug)]
pub struct ModelTrainerConfig {
    pub model_path: PathBuf,
    pub expected_score: f64,
    pub overfitting_threshold: f64,
}

#[derive(Clone, Debug)]
pub struct ModelEvaluationConfig {
    pub saved_model_dir: PathBuf,
    pub change_threshold: f64,
    pub target_column: String,
}

/// Fixed pusher location plus the registry root.
#[derive(Clone, Debug)]
pub struct ModelPusherConfig {
    pub pusher_model_dir: PathBuf,
    pub saved_model_dir: PathBuf,
    pub pusher_transformer_path: PathBuf,
    pub pusher_model_path: PathBuf,
    pub pusher_target_encoder_path: PathBuf,
}

impl ModelPusherConfig {
    pub fn new(pusher_model_dir: PathBuf, saved_model_dir: PathBuf) -> Self {
        Self {
            pusher_transformer_path: pusher_model_dir.join(TRANSFORMER_FILE_NAME),
            pusher_model_path: pusher_model_dir.join(MODEL_FILE_NAME),
            pusher_target_encoder_path: pusher_model_dir.join(TARGET_ENCODER_FILE_NAME),
            pusher_model_dir,
            saved_model_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_paths_hang_off_the_run_dir() {
        let cfg = PipelineCfg {
            source_path: PathBuf::from("in/ships.csv"),
            artifact_root: PathBuf::from("artifact"),
            ..PipelineCfg::default()
        };
        let tp = TrainingPipelineConfig::new(cfg, "01022026__101010");
        let run = PathBuf::from("artifact/01022026__101010");

        let ingest = tp.data_ingestion();
        assert_eq!(
            ingest.feature_store_file_path,
            run.join("data_ingestion/feature_store/ships.csv")
        );
        assert_eq!(ingest.train_file_path, run.join("data_ingestion/dataset/train.csv"));

        let pusher = tp.model_pusher();
        assert_eq!(pusher.pusher_model_dir, run.join("model_pusher/saved_models"));
        assert_eq!(
            pusher.pusher_model_path,
            run.join("model_pusher/saved_models").join(MODEL_FILE_NAME)
        );
        assert_eq!(pusher.saved_model_dir, PathBuf::from("saved_models"));
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let bad_split = PipelineCfg {
            test_size: 1.0,
            ..PipelineCfg::default()
        };
        assert!(matches!(bad_split.validate(), Err(PipelineError::Config(_))));

        let bad_threshold = PipelineCfg {
            expected_score: 1.5,
            ..PipelineCfg::default()
        };
        assert!(bad_threshold.validate().is_err());

        let dropped_target = PipelineCfg {
            drop_columns: vec!["target".to_string()],
            ..PipelineCfg::default()
        };
        assert!(dropped_target.validate().is_err());

        assert!(PipelineCfg::default().validate().is_ok());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{"target_column":"label","test_size":0.25}"#).unwrap();

        let cfg = PipelineCfg::from_file(&path).unwrap();
        assert_eq!(cfg.target_column, "label");
        assert_eq!(cfg.test_size, 0.25);
        assert_eq!(cfg.seed, 42);
    }

    #[test]
    fn missing_or_malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            PipelineCfg::from_file(&missing),
            Err(PipelineError::MissingInput(_))
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{not json").unwrap();
        assert!(matches!(
            PipelineCfg::from_file(&broken),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn misspelled_key_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{"target_colum":"label"}"#).unwrap();

        let err = PipelineCfg::from_file(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(err.to_string().contains("target_colum"));
    }
}
