//! Versioned on-disk format for pipeline artifacts.
//!
//! Every artifact file is a JSON envelope:
//!
//! ```text
//! {"magic":"SHIPMENT-ARTIFACT","format_version":1,"kind":"model",
//!  "checksum":"<sha256 hex of payload bytes>","payload":{...}}
//! ```
//!
//! The payload bytes are kept verbatim so the checksum can be verified
//! without re-serialising, which makes truncated or edited files detectable.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::common::error::{PipelineError, PipelineResult};

pub const MAGIC: &str = "SHIPMENT-ARTIFACT";
pub const FORMAT_VERSION: u32 = 1;

/// Types that can be persisted with [`save_object`] and read back with [`load_object`].
pub trait Artifact: Serialize + DeserializeOwned {
    /// Tag stored in the envelope; loading a file of another kind fails.
    const KIND: &'static str;
}

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    magic: &'a str,
    format_version: u32,
    kind: &'a str,
    checksum: String,
    payload: &'a RawValue,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    magic: String,
    format_version: u32,
    kind: String,
    checksum: String,
    payload: Box<RawValue>,
}

fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Serialise `obj` into `path`, creating parent directories as needed.
pub fn save_object<T: Artifact>(path: &Path, obj: &T) -> PipelineResult<()> {
    let payload =
        serde_json::value::to_raw_value(obj).map_err(|e| PipelineError::serialization(path, e))?;
    let envelope = EnvelopeOut {
        magic: MAGIC,
        format_version: FORMAT_VERSION,
        kind: T::KIND,
        checksum: checksum(payload.get().as_bytes()),
        payload: &payload,
    };
    let bytes =
        serde_json::to_vec_pretty(&envelope).map_err(|e| PipelineError::serialization(path, e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| PipelineError::io(path, e))?;
    debug!(kind = T::KIND, path = %path.display(), "artifact saved");
    Ok(())
}

/// Read and verify an artifact previously written by [`save_object`].
pub fn load_object<T: Artifact>(path: &Path) -> PipelineResult<T> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|e| PipelineError::io(path, e))?;
    let envelope: EnvelopeIn =
        serde_json::from_slice(&bytes).map_err(|e| PipelineError::serialization(path, e))?;

    if envelope.magic != MAGIC {
        return Err(PipelineError::serialization(path, "not a shipment artifact"));
    }
    if envelope.format_version != FORMAT_VERSION {
        return Err(PipelineError::serialization(
            path,
            format!("unsupported format version {}", envelope.format_version),
        ));
    }
    if envelope.kind != T::KIND {
        return Err(PipelineError::serialization(
            path,
            format!("expected {} artifact, found {}", T::KIND, envelope.kind),
        ));
    }
    let raw = envelope.payload.get();
    if checksum(raw.as_bytes()) != envelope.checksum {
        return Err(PipelineError::serialization(path, "checksum mismatch"));
    }
    let obj = serde_json::from_str(raw).map_err(|e| PipelineError::serialization(path, e))?;
    debug!(kind = T::KIND, path = %path.display(), "artifact loaded");
    Ok(obj)
}
