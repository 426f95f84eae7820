//! Domain types for model training and scoring.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::common::codec::Artifact;
use crate::common::error::{PipelineError, PipelineResult};
use crate::transformation::domain::FeatureMatrix;

/// Nearest-centroid classifier over transformed features.
///
/// `centroids[c]` is the mean feature vector of encoded class `c`; an empty
/// vector marks a class that had no training rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub features: Vec<String>,
    pub centroids: Vec<Vec<f64>>,
}

impl Artifact for Model {
    const KIND: &'static str = "model";
}

impl Model {
    /// Closest class by squared Euclidean distance; ties go to the lowest index.
    pub fn predict_row(&self, row: &[f64]) -> PipelineResult<usize> {
        if row.len() != self.features.len() {
            return Err(PipelineError::invalid(format!(
                "expected {} features, got {}",
                self.features.len(),
                row.len()
            )));
        }
        self.centroids
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .map(|(class, c)| {
                let dist: f64 = c.iter().zip(row).map(|(a, b)| (a - b) * (a - b)).sum();
                (class, dist)
            })
            .fold(None, |best: Option<(usize, f64)>, (class, dist)| match best {
                Some((_, d)) if d <= dist => best,
                _ => Some((class, dist)),
            })
            .map(|(class, _)| class)
            .ok_or_else(|| PipelineError::invalid("model has no fitted classes"))
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> PipelineResult<Vec<usize>> {
        rows.iter().map(|r| self.predict_row(r)).collect()
    }
}

/// Interface for components that can fit a [`Model`].
pub trait Trainer {
    fn fit(&self, train: &FeatureMatrix) -> PipelineResult<Model>;
}

/// Mean-per-class trainer.
#[derive(Default)]
pub struct NearestCentroidTrainer;

impl Trainer for NearestCentroidTrainer {
    fn fit(&self, train: &FeatureMatrix) -> PipelineResult<Model> {
        if train.rows.is_empty() || train.rows.len() != train.targets.len() {
            return Err(PipelineError::invalid(format!(
                "training matrix has {} rows and {} targets",
                train.rows.len(),
                train.targets.len()
            )));
        }
        let width = train.features.len();
        let n_classes = train.targets.iter().max().map_or(0, |m| m + 1);
        let mut sums = vec![vec![0.0; width]; n_classes];
        let mut counts = vec![0usize; n_classes];

        for (row, &class) in train.rows.iter().zip(&train.targets) {
            if row.len() != width {
                return Err(PipelineError::invalid("ragged training matrix"));
            }
            counts[class] += 1;
            for (acc, v) in sums[class].iter_mut().zip(row) {
                *acc += v;
            }
        }

        let centroids = sums
            .into_iter()
            .zip(counts)
            .map(|(sum, n)| {
                if n == 0 {
                    Vec::new()
                } else {
                    sum.into_iter().map(|s| s / n as f64).collect()
                }
            })
            .collect();

        Ok(Model {
            features: train.features.clone(),
            centroids,
        })
    }
}

/// Macro-averaged F1 over every class seen in either `truth` or `pred`.
pub fn f1_macro(truth: &[usize], pred: &[usize]) -> f64 {
    let classes: BTreeSet<usize> = truth.iter().chain(pred).copied().collect();
    if classes.is_empty() {
        return 0.0;
    }
    let total: f64 = classes
        .iter()
        .map(|&c| {
            let pairs = truth.iter().zip(pred);
            let tp = pairs.clone().filter(|(t, p)| **t == c && **p == c).count() as f64;
            let fp = pairs.clone().filter(|(t, p)| **t != c && **p == c).count() as f64;
            let fn_ = pairs.filter(|(t, p)| **t == c && **p != c).count() as f64;
            if tp == 0.0 {
                return 0.0;
            }
            let precision = tp / (tp + fp);
            let recall = tp / (tp + fn_);
            2.0 * precision * recall / (precision + recall)
        })
        .sum();
    total / classes.len() as f64
}

/// Output of the training stage.
#[derive(Clone, Debug, Serialize)]
pub struct ModelTrainerArtifact {
    pub model_path: PathBuf,
    pub f1_train_score: f64,
    pub f1_test_score: f64,
}
