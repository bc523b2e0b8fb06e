//! PHREEQC as an external process.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::backend::SolverBackend;
use crate::error::{PhreeqcError, PhreeqcResult};
use crate::script::Script;

/// Databases tried by [`PhreeqcProcess::discover`], in order.
pub const DATABASE_CANDIDATES: [&str; 4] = ["phreeqc.dat", "pitzer.dat", "minteq.v4.dat", "llnl.dat"];

const STDERR_TAIL_LINES: usize = 20;

/// Runs `phreeqc <input> <output> <database>` in a private working directory.
#[derive(Debug, Clone)]
pub struct PhreeqcProcess {
    bin: PathBuf,
    database: PathBuf,
    work_dir: PathBuf,
    output_dir: PathBuf,
}

impl PhreeqcProcess {
    /// Fails with a configuration error when the binary or database is missing.
    /// Creates `work_dir/output`.
    pub fn new(bin: &Path, database: &Path, work_dir: &Path) -> PhreeqcResult<Self> {
        if !bin.is_file() {
            return Err(PhreeqcError::MissingPath {
                what: "PHREEQC binary",
                path: bin.to_path_buf(),
            });
        }
        if !database.is_file() {
            return Err(PhreeqcError::MissingPath {
                what: "PHREEQC database",
                path: database.to_path_buf(),
            });
        }
        let output_dir = work_dir.join("output");
        fs::create_dir_all(&output_dir)?;
        Ok(Self {
            bin: bin.to_path_buf(),
            database: database.to_path_buf(),
            work_dir: work_dir.to_path_buf(),
            output_dir,
        })
    }

    /// Find an installation under `root`: the first `phreeqc*` directory
    /// holding `bin/phreeqc` and one of the known databases.
    pub fn discover(root: &Path, work_dir: &Path) -> PhreeqcResult<Self> {
        let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_dir()
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.to_ascii_lowercase().starts_with("phreeqc"))
            })
            .collect();
        dirs.sort();

        for dir in dirs {
            let bin = dir.join("bin").join("phreeqc");
            if !bin.is_file() {
                continue;
            }
            if let Some(db) = DATABASE_CANDIDATES
                .iter()
                .map(|name| dir.join("database").join(name))
                .find(|p| p.is_file())
            {
                debug!(bin = %bin.display(), database = %db.display(), "Discovered PHREEQC");
                return Self::new(&bin, &db, work_dir);
            }
        }
        Err(PhreeqcError::Config {
            what: format!(
                "no PHREEQC installation under {} (expected phreeqc*/bin/phreeqc and database/*.dat)",
                root.display()
            ),
        })
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    pub fn input_path(&self) -> PathBuf {
        self.work_dir.join("input.in")
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join("output.out")
    }
}

impl SolverBackend for PhreeqcProcess {
    fn name(&self) -> &str {
        "phreeqc"
    }

    fn version(&self) -> String {
        let install = self
            .bin
            .parent()
            .and_then(Path::parent)
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.bin.display().to_string());
        let db = self
            .database
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{install}/{db}")
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn run(&mut self, script: &Script) -> PhreeqcResult<()> {
        let input = self.input_path();
        fs::write(&input, &script.text)?;
        for staged in &script.stages {
            if staged.result_path.exists() {
                fs::remove_file(&staged.result_path)?;
            }
        }

        info!(
            stages = script.stages.len(),
            input = %input.display(),
            "Running PHREEQC"
        );
        let output = Command::new(&self.bin)
            .arg(&input)
            .arg(self.report_path())
            .arg(&self.database)
            .current_dir(&self.work_dir)
            .output()
            .map_err(|e| PhreeqcError::Execution {
                status: None,
                message: format!("failed to start {}: {e}", self.bin.display()),
            })?;

        if !output.status.success() {
            return Err(PhreeqcError::Execution {
                status: output.status.code(),
                message: stderr_tail(&output.stderr),
            });
        }

        if let Some(missing) = script.stages.iter().find(|s| !s.result_path.is_file()) {
            return Err(PhreeqcError::Execution {
                status: output.status.code(),
                message: format!(
                    "stage '{}' produced no table at {}",
                    missing.stage.label,
                    missing.result_path.display()
                ),
            });
        }
        Ok(())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    let tail = lines[start..].join("\n");
    if tail.trim().is_empty() {
        "no diagnostic output".to_string()
    } else {
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sal_phreeqc_process_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_binary_is_config_error() {
        let dir = scratch("missing_bin");
        let db = dir.join("phreeqc.dat");
        fs::write(&db, "").unwrap();
        let err = PhreeqcProcess::new(&dir.join("nope"), &db, &dir.join("work")).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("binary"));
    }

    #[test]
    fn missing_database_is_config_error() {
        let dir = scratch("missing_db");
        let bin = dir.join("phreeqc");
        fs::write(&bin, "").unwrap();
        let err = PhreeqcProcess::new(&bin, &dir.join("none.dat"), &dir.join("work")).unwrap_err();
        assert!(matches!(err, PhreeqcError::MissingPath { what: "PHREEQC database", .. }));
    }

    #[test]
    fn discover_prefers_listed_databases() {
        let root = scratch("discover");
        let install = root.join("phreeqc-3.8.6");
        fs::create_dir_all(install.join("bin")).unwrap();
        fs::create_dir_all(install.join("database")).unwrap();
        fs::write(install.join("bin").join("phreeqc"), "").unwrap();
        fs::write(install.join("database").join("llnl.dat"), "").unwrap();
        fs::write(install.join("database").join("pitzer.dat"), "").unwrap();

        let p = PhreeqcProcess::discover(&root, &root.join("work")).unwrap();
        assert!(p.database().ends_with("pitzer.dat"));
        assert_eq!(p.version(), "phreeqc-3.8.6/pitzer.dat");
        assert!(p.output_dir().is_dir());
    }

    #[test]
    fn discover_without_install_is_config_error() {
        let root = scratch("discover_none");
        let err = PhreeqcProcess::discover(&root, &root.join("work")).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let text: String = (0..30).map(|i| format!("line {i}\n")).collect();
        let tail = stderr_tail(text.as_bytes());
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
        assert_eq!(stderr_tail(b"  \n"), "no diagnostic output");
    }
}
