//! YAML run configuration.
//!
//! ```yaml
//! phreeqc_bin: phreeqc-3.8.6/bin/phreeqc
//! phreeqc_database: phreeqc-3.8.6/database/phreeqc.dat
//! brine_data: inputs/brine.txt
//! ponds_data: inputs/pondsData.txt
//! work_dir: phreeqc_work
//! evaporation_schedule: inputs/evap_diaria.csv
//! params:
//!   nsteps_default_days: 100
//!   max_evap_step_mol_l: 0.35
//! ```
//!
//! Relative paths resolve against the workspace root. `PHREEQC_BIN` and
//! `PHREEQC_DB` override the solver paths.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::model::{SimulationParams, TransferPolicy};
use crate::{PlantError, PlantResult};

pub const ENV_PHREEQC_BIN: &str = "PHREEQC_BIN";
pub const ENV_PHREEQC_DB: &str = "PHREEQC_DB";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    #[serde(default)]
    pub phreeqc_bin: Option<PathBuf>,
    #[serde(default)]
    pub phreeqc_database: Option<PathBuf>,
    pub brine_data: PathBuf,
    pub ponds_data: PathBuf,
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaporation_schedule: Option<PathBuf>,
    #[serde(default)]
    pub params: ParamsOverrides,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pond_areas_m2: BTreeMap<String, f64>,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("phreeqc_work")
}

/// Optional overrides on top of [`SimulationParams::default`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ParamsOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaporation_rate_mol_per_day_l: Option<f64>,
    /// `false` removes the constant-rate fallback entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant_rate_fallback: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_limit_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsteps_default_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub micro_steps_factor: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_evap_step_mol_l: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_total_steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_stages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_policy: Option<TransferPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_pond1_m3: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquid_density_g_per_l: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_mineral: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracked_phases: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracked_totals: Option<Vec<String>>,
}

impl ParamsOverrides {
    pub fn apply(&self, mut params: SimulationParams) -> SimulationParams {
        if let Some(rate) = self.evaporation_rate_mol_per_day_l {
            params.evaporation_rate_mol_per_day_l = Some(rate);
        }
        if self.constant_rate_fallback == Some(false) {
            params.evaporation_rate_mol_per_day_l = None;
        }
        if let Some(v) = self.level_limit_m {
            params.level_limit_m = v;
        }
        if let Some(v) = self.nsteps_default_days {
            params.nsteps_default_days = v;
        }
        if let Some(v) = self.micro_steps_factor {
            params.micro_steps_factor = v;
        }
        if let Some(v) = self.max_evap_step_mol_l {
            params.max_evap_step_mol_l = Some(v);
        }
        if let Some(v) = self.max_total_steps {
            params.max_total_steps = v;
        }
        if let Some(v) = self.max_stages {
            params.max_stages = v;
        }
        if let Some(v) = self.transfer_policy {
            params.transfer_policy = v;
        }
        if let Some(v) = self.initial_pond1_m3 {
            params.initial_pond1_m3 = v;
        }
        if let Some(v) = self.liquid_density_g_per_l {
            params.liquid_density_g_per_l = v;
        }
        if let Some(v) = &self.target_mineral {
            params.target_mineral = v.clone();
        }
        if let Some(v) = &self.tracked_phases {
            params.tracked_phases = v.clone();
        }
        if let Some(v) = &self.tracked_totals {
            params.tracked_totals = v.clone();
        }
        params
    }
}

/// Configuration paths resolved against a workspace root.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPaths {
    pub phreeqc_bin: PathBuf,
    pub phreeqc_database: PathBuf,
    pub brine_data: PathBuf,
    pub ponds_data: PathBuf,
    pub work_dir: PathBuf,
    pub evaporation_schedule: Option<PathBuf>,
}

pub fn resolve_path(path: &Path, workspace_root: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}

impl RunConfig {
    pub fn from_yaml_str(content: &str) -> PlantResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Overlay solver paths from the environment; `lookup` stands in for `std::env::var`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bin) = lookup(ENV_PHREEQC_BIN).filter(|v| !v.trim().is_empty()) {
            self.phreeqc_bin = Some(PathBuf::from(bin));
        }
        if let Some(db) = lookup(ENV_PHREEQC_DB).filter(|v| !v.trim().is_empty()) {
            self.phreeqc_database = Some(PathBuf::from(db));
        }
    }

    /// Resolve every path. Input data files must exist; solver paths are
    /// checked later by the solver backend.
    pub fn resolve_paths(&self, workspace_root: &Path) -> PlantResult<ResolvedPaths> {
        let phreeqc_bin = self
            .phreeqc_bin
            .as_deref()
            .ok_or(PlantError::MissingKey { key: "phreeqc_bin" })?;
        let phreeqc_database = self
            .phreeqc_database
            .as_deref()
            .ok_or(PlantError::MissingKey {
                key: "phreeqc_database",
            })?;

        let brine_data = resolve_path(&self.brine_data, workspace_root);
        if !brine_data.exists() {
            return Err(PlantError::MissingFile { path: brine_data });
        }
        let ponds_data = resolve_path(&self.ponds_data, workspace_root);
        if !ponds_data.exists() {
            return Err(PlantError::MissingFile { path: ponds_data });
        }

        Ok(ResolvedPaths {
            phreeqc_bin: resolve_path(phreeqc_bin, workspace_root),
            phreeqc_database: resolve_path(phreeqc_database, workspace_root),
            brine_data,
            ponds_data,
            work_dir: resolve_path(&self.work_dir, workspace_root),
            evaporation_schedule: self
                .evaporation_schedule
                .as_deref()
                .map(|p| resolve_path(p, workspace_root)),
        })
    }
}

/// Read a YAML run configuration and apply environment overrides.
pub fn load_config(path: &Path) -> PlantResult<RunConfig> {
    if !path.exists() {
        return Err(PlantError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    let mut config = RunConfig::from_yaml_str(&content)?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = "
phreeqc_bin: phreeqc/bin/phreeqc
phreeqc_database: /opt/phreeqc/database/phreeqc.dat
brine_data: inputs/brine.txt
ponds_data: inputs/pondsData.txt
params:
  nsteps_default_days: 80
  transfer_policy: discard_excess
";

    #[test]
    fn parses_minimal_yaml() {
        let config = RunConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.work_dir, PathBuf::from("phreeqc_work"));
        assert!(config.evaporation_schedule.is_none());
        let params = config.params.apply(SimulationParams::default());
        assert_eq!(params.nsteps_default_days, 80);
        assert_eq!(params.max_total_steps, 365);
    }

    #[test]
    fn env_overrides_solver_paths() {
        let mut config = RunConfig::from_yaml_str(YAML).unwrap();
        config.apply_env_overrides(|key| match key {
            ENV_PHREEQC_BIN => Some("/usr/local/bin/phreeqc".to_string()),
            ENV_PHREEQC_DB => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(
            config.phreeqc_bin,
            Some(PathBuf::from("/usr/local/bin/phreeqc"))
        );
        assert_eq!(
            config.phreeqc_database,
            Some(PathBuf::from("/opt/phreeqc/database/phreeqc.dat"))
        );
    }

    #[test]
    fn relative_and_absolute_resolution() {
        let root = Path::new("/work/salina");
        assert_eq!(
            resolve_path(Path::new("inputs/brine.txt"), root),
            PathBuf::from("/work/salina/inputs/brine.txt")
        );
        assert_eq!(
            resolve_path(Path::new("/opt/db.dat"), root),
            PathBuf::from("/opt/db.dat")
        );
    }

    #[test]
    fn fallback_can_be_disabled() {
        let overrides = ParamsOverrides {
            constant_rate_fallback: Some(false),
            ..ParamsOverrides::default()
        };
        let params = overrides.apply(SimulationParams::default());
        assert!(params.evaporation_rate_mol_per_day_l.is_none());
    }

    #[test]
    fn unknown_param_is_rejected() {
        let yaml = "brine_data: b\nponds_data: p\nparams:\n  nsteps: 3\n";
        assert!(RunConfig::from_yaml_str(yaml).is_err());
    }
}
