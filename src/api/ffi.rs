//! C-compatible API for hosts that drive the pipeline in-process.
//!
//! Strings are borrowed, NUL-terminated UTF-8 paths owned by the caller.
//! Failures are reported through [`ErrorCode`] values; details go to the log.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::PathBuf;

use tracing::error;

use crate::common::config::PipelineCfg;
use crate::common::error::ErrorCode;
use crate::pipeline::PipelineRunner;
use crate::registry::resolver::ModelResolver;

/// ABI version to coordinate with the host.
#[no_mangle]
pub extern "C" fn shipment_api_version() -> u32 {
    1
}

/// Run one full pipeline. `config_path` may be null to use defaults and the
/// environment. Returns `0` on success, otherwise an [`ErrorCode`].
#[no_mangle]
pub extern "C" fn shipment_run_pipeline(config_path: *const c_char) -> u32 {
    let path = if config_path.is_null() {
        None
    } else {
        match path_from_raw(config_path) {
            Some(p) => Some(p),
            None => return ErrorCode::Config as u32,
        }
    };

    let result = PipelineCfg::load(path.as_deref())
        .and_then(|cfg| PipelineRunner::new(cfg).run());
    match result {
        Ok(_) => ErrorCode::Ok as u32,
        Err(err) => {
            error!(error = %err, "pipeline run failed");
            err.code() as u32
        }
    }
}

/// Latest registry version under `root`, or `-1` when there is none or the
/// path is unusable.
#[no_mangle]
pub extern "C" fn shipment_latest_version(root: *const c_char) -> i64 {
    if root.is_null() {
        return -1;
    }
    path_from_raw(root)
        .and_then(|p| ModelResolver::new(p).get_latest_version_number())
        .and_then(|v| i64::try_from(v).ok())
        .unwrap_or(-1)
}

fn path_from_raw(ptr: *const c_char) -> Option<PathBuf> {
    // SAFETY: callers pass a valid NUL-terminated string that outlives this call.
    let raw = unsafe { CStr::from_ptr(ptr) };
    raw.to_str().ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}
