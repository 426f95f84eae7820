//! Error handling primitives shared across the pipeline.
//!
//! Every stage returns [`PipelineResult`]. The runner wraps stage failures in
//! [`PipelineError::Stage`] so callers see which stage aborted the run while
//! the original cause stays reachable through `source()`.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Stable error codes that cross the FFI boundary.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Configuration could not be loaded or failed validation.
    Config = 1,
    /// A file a stage depends on does not exist.
    MissingInput = 2,
    /// Filesystem read/write failure.
    Io = 3,
    /// Artifact encoding or decoding failed.
    Serialization = 4,
    /// Input data failed validation.
    InvalidData = 5,
    /// A quality gate refused the trained model.
    Rejected = 6,
    /// The registry holds no version to read from.
    NoVersion = 7,
}

/// Pipeline stage names used for error context and log fields.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Stage {
    Ingestion,
    Validation,
    Transformation,
    Training,
    Evaluation,
    Pushing,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ingestion => "data_ingestion",
            Stage::Validation => "data_validation",
            Stage::Transformation => "data_transformation",
            Stage::Training => "model_trainer",
            Stage::Evaluation => "model_evaluation",
            Stage::Pushing => "model_pusher",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("missing input: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("serialization error at {}: {reason}", .path.display())]
    Serialization { path: PathBuf, reason: String },
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("model rejected: {0}")]
    Rejected(String),
    #[error("no model version found under {}", .0.display())]
    NoVersion(PathBuf),
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<PipelineError>,
    },
}

/// Result alias used throughout the crate.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// IO helper keeping the offending path in the error.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn serialization(path: impl AsRef<Path>, reason: impl fmt::Display) -> Self {
        Self::Serialization {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Attach the failing stage. Already wrapped errors are left untouched.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            wrapped @ Self::Stage { .. } => wrapped,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Machine parsable code. Stage wrappers report the code of their cause.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Config(_) => ErrorCode::Config,
            Self::MissingInput(_) => ErrorCode::MissingInput,
            Self::Io { .. } => ErrorCode::Io,
            Self::Serialization { .. } => ErrorCode::Serialization,
            Self::InvalidData(_) => ErrorCode::InvalidData,
            Self::Rejected(_) => ErrorCode::Rejected,
            Self::NoVersion(_) => ErrorCode::NoVersion,
            Self::Stage { source, .. } => source.code(),
        }
    }

    /// Stage that failed, when the error went through the runner.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
