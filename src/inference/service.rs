//! File-level prediction entry points used by the CLI and the C ABI.

use std::path::Path;

use tracing::info;

use crate::common::error::PipelineResult;
use crate::common::time;
use crate::data::repo_fs::read_table;

use super::domain::Predictor;

/// Label every row of the CSV at `input` with the latest model under `root`.
pub fn predict_file(root: &Path, input: &Path) -> PipelineResult<Vec<String>> {
    let start = time::now_ms();
    let predictor = Predictor::from_registry(root)?;
    let table = read_table(input)?;
    let labels = predictor.predict(&table)?;
    info!(
        version = predictor.version,
        rows = labels.len(),
        dur_ms = time::now_ms().saturating_sub(start) as u64,
        "prediction finished"
    );
    Ok(labels)
}
