//! Training domain: model fitting and score gates.

pub mod domain;
pub mod service;

pub use domain::{Model, ModelTrainerArtifact, Trainer};
