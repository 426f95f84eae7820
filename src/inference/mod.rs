//! Batch prediction with the latest registry version.

pub mod domain;
pub mod service;

pub use domain::Predictor;
