//! Training pipeline for shipment delay classification with a versioned model registry.
pub mod common;
pub mod data;
pub mod transformation;
pub mod training;
pub mod evaluation;
pub mod registry;
pub mod inference;
pub mod pipeline;
pub mod api;

pub use api::ffi::{shipment_api_version, shipment_latest_version, shipment_run_pipeline};
pub use common::{ErrorCode, PipelineError, PipelineResult, Stage};
pub use pipeline::{PipelineOutcome, PipelineRunner};
