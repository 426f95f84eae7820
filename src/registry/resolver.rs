//! Resolution of versioned paths inside the saved-model registry.
//!
//! Layout: `<root>/<version>/{transformer,model,target_encoder}.json`, where
//! `<version>` is a non-negative integer in canonical decimal form. Anything
//! else under the root (`tmp`, `.staging-4`, `007`) is ignored.
//!
//! Reads only see integer-named directories. Writes skip past every
//! integer-named entry, so a stray file called `3` never blocks a push. The
//! resolver never creates or modifies anything.

use std::fs;
use std::path::{Path, PathBuf};

use crate::common::error::{PipelineError, PipelineResult};

pub const TRANSFORMER_FILE_NAME: &str = "transformer.json";
pub const MODEL_FILE_NAME: &str = "model.json";
pub const TARGET_ENCODER_FILE_NAME: &str = "target_encoder.json";

/// Parse a directory name as a registry version.
fn parse_version(name: &str) -> Option<u64> {
    let v: u64 = name.parse().ok()?;
    (v.to_string() == name).then_some(v)
}

/// Read and write path resolution for one registry root.
#[derive(Clone, Debug)]
pub struct ModelResolver {
    model_registry: PathBuf,
}

impl ModelResolver {
    pub fn new(model_registry: impl Into<PathBuf>) -> Self {
        Self {
            model_registry: model_registry.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.model_registry
    }

    /// Canonical version names under the root, ascending. `dirs_only` keeps
    /// only real directories; otherwise any entry (file, dangling symlink)
    /// counts.
    fn scan(&self, dirs_only: bool) -> Vec<u64> {
        let entries = match fs::read_dir(&self.model_registry) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let mut versions: Vec<u64> = entries
            .filter_map(Result::ok)
            .filter(|e| !dirs_only || e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().and_then(parse_version))
            .collect();
        versions.sort_unstable();
        versions
    }

    /// All versions present under the root, ascending. Missing root yields an empty list.
    pub fn list_versions(&self) -> Vec<u64> {
        self.scan(true)
    }

    /// Highest existing version, or `None` for a missing or empty root.
    pub fn get_latest_version_number(&self) -> Option<u64> {
        self.list_versions().last().copied()
    }

    /// Directory of the latest existing version.
    pub fn get_latest_dir(&self) -> Option<PathBuf> {
        self.get_latest_version_number()
            .map(|v| self.model_registry.join(v.to_string()))
    }

    fn latest_file(&self, file_name: &str) -> PipelineResult<PathBuf> {
        self.get_latest_dir()
            .map(|dir| dir.join(file_name))
            .ok_or_else(|| PipelineError::NoVersion(self.model_registry.clone()))
    }

    pub fn get_latest_transformer_path(&self) -> PipelineResult<PathBuf> {
        self.latest_file(TRANSFORMER_FILE_NAME)
    }

    pub fn get_latest_model_path(&self) -> PipelineResult<PathBuf> {
        self.latest_file(MODEL_FILE_NAME)
    }

    pub fn get_latest_target_encoder_path(&self) -> PipelineResult<PathBuf> {
        self.latest_file(TARGET_ENCODER_FILE_NAME)
    }

    /// Version the next push writes: one past the highest integer-named
    /// entry of any kind, `0` for an empty registry.
    pub fn next_version(&self) -> PipelineResult<u64> {
        match self.scan(false).last() {
            None => Ok(0),
            Some(&v) => v.checked_add(1).ok_or_else(|| {
                PipelineError::invalid(format!(
                    "{}: no version left after {v}",
                    self.model_registry.display()
                ))
            }),
        }
    }

    /// Directory the next push writes into. Never an existing entry.
    pub fn get_latest_save_dir(&self) -> PipelineResult<PathBuf> {
        Ok(self.model_registry.join(self.next_version()?.to_string()))
    }

    pub fn get_latest_save_transformer_path(&self) -> PipelineResult<PathBuf> {
        Ok(self.get_latest_save_dir()?.join(TRANSFORMER_FILE_NAME))
    }

    pub fn get_latest_save_model_path(&self) -> PipelineResult<PathBuf> {
        Ok(self.get_latest_save_dir()?.join(MODEL_FILE_NAME))
    }

    pub fn get_latest_save_target_encoder_path(&self) -> PipelineResult<PathBuf> {
        Ok(self.get_latest_save_dir()?.join(TARGET_ENCODER_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::ErrorCode;

    fn mkdirs(root: &Path, names: &[&str]) {
        for n in names {
            fs::create_dir_all(root.join(n)).unwrap();
        }
    }

    #[test]
    fn missing_root_has_no_version() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("does-not-exist");
        let resolver = ModelResolver::new(&root);

        assert_eq!(resolver.get_latest_version_number(), None);
        assert_eq!(resolver.get_latest_save_dir().unwrap(), root.join("0"));
        assert!(!root.exists(), "resolution must not touch the filesystem");
    }

    #[test]
    fn empty_root_saves_into_zero() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ModelResolver::new(dir.path());
        assert_eq!(resolver.get_latest_version_number(), None);
        assert_eq!(resolver.get_latest_dir(), None);
        assert_eq!(resolver.get_latest_save_dir().unwrap(), dir.path().join("0"));
        assert_eq!(
            resolver.get_latest_save_model_path().unwrap(),
            dir.path().join("0").join(MODEL_FILE_NAME)
        );
    }

    #[test]
    fn next_version_ignores_creation_order() {
        for order in [["0", "1", "2"], ["2", "0", "1"], ["1", "2", "0"]] {
            let dir = tempfile::tempdir().unwrap();
            mkdirs(dir.path(), &order);
            let resolver = ModelResolver::new(dir.path());
            assert_eq!(resolver.get_latest_version_number(), Some(2));
            assert_eq!(resolver.get_latest_save_dir().unwrap(), dir.path().join("3"));
        }
    }

    #[test]
    fn numeric_order_not_lexical() {
        let dir = tempfile::tempdir().unwrap();
        mkdirs(dir.path(), &["2", "10", "9"]);
        let resolver = ModelResolver::new(dir.path());
        assert_eq!(resolver.get_latest_version_number(), Some(10));
        assert_eq!(resolver.list_versions(), vec![2, 9, 10]);
    }

    #[test]
    fn non_version_entries_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        mkdirs(dir.path(), &["tmp", ".staging-5", "007", "-1", "+4", "1"]);
        fs::write(dir.path().join("8"), b"a file, not a version").unwrap();

        let resolver = ModelResolver::new(dir.path());
        assert_eq!(resolver.list_versions(), vec![1]);
        assert_eq!(resolver.get_latest_version_number(), Some(1));
        // The file named 8 is not readable as a version but its name is taken.
        assert_eq!(resolver.get_latest_save_dir().unwrap(), dir.path().join("9"));
    }

    #[test]
    fn stray_integer_file_is_skipped_by_next_version() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("0"), b"stray").unwrap();
        let resolver = ModelResolver::new(dir.path());

        assert_eq!(resolver.get_latest_version_number(), None);
        assert_eq!(resolver.next_version().unwrap(), 1);
        assert_eq!(
            resolver.get_latest_save_target_encoder_path().unwrap(),
            dir.path().join("1").join(TARGET_ENCODER_FILE_NAME)
        );
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_name_is_taken() {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("3")).unwrap();
        let resolver = ModelResolver::new(dir.path());

        assert_eq!(resolver.list_versions(), Vec::<u64>::new());
        assert_eq!(resolver.next_version().unwrap(), 4);
    }

    #[test]
    fn exhausted_version_space_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let max = u64::MAX.to_string();
        mkdirs(dir.path(), &[max.as_str()]);
        let resolver = ModelResolver::new(dir.path());

        assert_eq!(resolver.get_latest_version_number(), Some(u64::MAX));
        let err = resolver.get_latest_save_dir().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidData);
        assert_eq!(
            resolver.get_latest_save_transformer_path().unwrap_err().code(),
            ErrorCode::InvalidData
        );
    }

    #[test]
    fn read_paths_need_an_existing_version() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ModelResolver::new(dir.path());
        let err = resolver.get_latest_model_path().unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoVersion);

        mkdirs(dir.path(), &["0", "1"]);
        assert_eq!(
            resolver.get_latest_transformer_path().unwrap(),
            dir.path().join("1").join(TRANSFORMER_FILE_NAME)
        );
        assert_eq!(
            resolver.get_latest_target_encoder_path().unwrap(),
            dir.path().join("1").join(TARGET_ENCODER_FILE_NAME)
        );
    }
}
