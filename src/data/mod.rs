//! Data domain: ingestion, validation and CSV persistence of datasets.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{DataIngestionArtifact, DataValidationArtifact, Table, ValidationReport};
