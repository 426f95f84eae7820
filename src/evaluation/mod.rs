//! Evaluation of a trained model against the registry's latest version.

pub mod domain;
pub mod service;

pub use domain::ModelEvaluationArtifact;
