#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use shipment_core::common::config::PipelineCfg;
use tempfile::TempDir;

/// Isolated directory with a separable shipment dataset.
pub struct TestEnv {
    _tmp: TempDir,
    pub dir: PathBuf,
    pub source: PathBuf,
    pub registry: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let dir = tmp.path().to_path_buf();
        let source = dir.join("shipments.csv");
        fs::write(&source, shipments_csv()).expect("write source csv");
        Self {
            registry: dir.join("saved_models"),
            source,
            dir,
            _tmp: tmp,
        }
    }

    pub fn cfg(&self) -> PipelineCfg {
        PipelineCfg {
            source_path: self.source.clone(),
            artifact_root: self.dir.join("artifact"),
            saved_model_dir: self.registry.clone(),
            target_column: "status".to_string(),
            drop_columns: vec!["shipment_id".to_string()],
            ..PipelineCfg::default()
        }
    }

    /// Write `cfg()` as a JSON config file and return its path.
    pub fn config_file(&self) -> PathBuf {
        let path = self.dir.join("shipment.json");
        fs::write(&path, serde_json::to_vec_pretty(&self.cfg()).expect("encode cfg"))
            .expect("write config");
        path
    }

    pub fn write(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.join(name);
        fs::write(&path, body).expect("write file");
        path
    }
}

/// Short hauls arrive on time, long hauls are late. `customs_hold` is mostly
/// empty and gets dropped by validation.
pub fn shipments_csv() -> String {
    let mut out = String::from("shipment_id,distance,weight,customs_hold,status\n");
    for i in 0..20 {
        let hold = if i % 10 == 0 { "1" } else { "" };
        out.push_str(&format!("s{i},{},{},{hold},on_time\n", 100 + 10 * i, 10 + i % 5));
        out.push_str(&format!("l{i},{},{},NA,late\n", 700 + 10 * i, 10 + i % 5));
    }
    out
}

pub fn version_dir(root: &Path, version: u64) -> PathBuf {
    root.join(version.to_string())
}
