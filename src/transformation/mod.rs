//! Transformation domain: feature scaling and target encoding.

pub mod domain;
pub mod service;

pub use domain::{DataTransformationArtifact, FeatureMatrix, TargetEncoder, Transformer};
