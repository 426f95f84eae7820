//! Outcome of comparing a freshly trained model with the registry's latest.

use serde::Serialize;

/// Output of the evaluation stage.
#[derive(Clone, Debug, Serialize)]
pub struct ModelEvaluationArtifact {
    pub is_model_accepted: bool,
    pub current_score: f64,
    /// Score of the latest registry model on the same test split, if one exists.
    pub previous_score: Option<f64>,
    pub previous_version: Option<u64>,
    /// `current - previous`, or the current score when there is nothing to beat.
    pub improved_score: f64,
}
