//! Saved-model registry: versioned path resolution and the model pusher.
//!
//! A registry root holds one directory per version (`0`, `1`, ...). Versions
//! are append-only; "latest" is always computed from a directory scan.

pub mod pusher;
pub mod resolver;

pub use pusher::{ModelPusher, ModelPusherArtifact};
pub use resolver::ModelResolver;
