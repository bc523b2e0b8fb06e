//! Run storage API.
//!
//! Layout: `<root>/<run_id>/manifest.json` plus `<root>/<run_id>/tables/<table_id>`.

use crate::table::ResultTable;
use crate::types::RunManifest;
use crate::{ResultsError, ResultsResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// The store kept under a solver working directory.
    pub fn for_work_dir(work_dir: &Path) -> ResultsResult<Self> {
        Self::new(work_dir.join("runs"))
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    fn tables_dir(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join("tables")
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join("manifest.json").exists()
    }

    /// Write the manifest and copy each stage table into the run directory.
    pub fn save_run(&self, manifest: &RunManifest, tables: &[PathBuf]) -> ResultsResult<()> {
        let tables_dir = self.tables_dir(&manifest.run_id);
        fs::create_dir_all(&tables_dir)?;

        for source in tables {
            if let Some(name) = source.file_name() {
                fs::copy(source, tables_dir.join(name))?;
            }
        }

        let manifest_path = self.run_dir(&manifest.run_id).join("manifest.json");
        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(manifest_path, manifest_json)?;

        debug!(run_id = %manifest.run_id, tables = tables.len(), "Saved run");
        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let manifest_path = self.run_dir(run_id).join("manifest.json");

        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        let manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    pub fn load_table(&self, run_id: &str, table_id: &str) -> ResultsResult<ResultTable> {
        if !self.has_run(run_id) {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        ResultTable::from_file(&self.tables_dir(run_id).join(table_id))
    }

    /// Run ids may be abbreviated to any unique prefix.
    pub fn resolve_id(&self, prefix: &str) -> ResultsResult<String> {
        if self.has_run(prefix) {
            return Ok(prefix.to_string());
        }
        let matches: Vec<String> = self
            .list_runs()?
            .into_iter()
            .map(|m| m.run_id)
            .filter(|id| id.starts_with(prefix))
            .collect();
        match matches.as_slice() {
            [only] => Ok(only.clone()),
            _ => Err(ResultsError::RunNotFound {
                run_id: prefix.to_string(),
            }),
        }
    }

    /// All stored runs, newest first.
    pub fn list_runs(&self) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id) {
                    runs.push(manifest);
                }
            }
        }

        runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}
