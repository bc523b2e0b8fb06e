//! Workspace loading and validation.

use std::path::{Path, PathBuf};

use sal_phreeqc::EvaporationSource;
use sal_plant::{PlantInputs, ResolvedPaths, RunConfig, TransferPolicy, load_inputs};
use tracing::info;

use crate::error::{AppError, AppResult};

/// A configured workspace with its inputs loaded.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config_path: PathBuf,
    /// Raw configuration text; part of the run id.
    pub config_text: String,
    pub config: RunConfig,
    pub paths: ResolvedPaths,
    pub inputs: PlantInputs,
}

#[derive(Debug, Clone)]
pub struct PondOverview {
    pub name: String,
    pub area_m2: f64,
    pub capacity_m3: Option<f64>,
}

/// What `validate` reports.
#[derive(Debug, Clone)]
pub struct ProjectSummary {
    pub ponds: Vec<PondOverview>,
    pub schedule_days: Option<usize>,
    pub constant_rate: Option<f64>,
    pub target_mineral: String,
    pub nsteps_default_days: u32,
    pub max_stages: u32,
    pub transfer_policy: TransferPolicy,
}

/// Load a workspace, taking solver path overrides from the process environment.
pub fn load_project(config_path: &Path, workspace: &Path) -> AppResult<Project> {
    load_project_with_env(config_path, workspace, |key| std::env::var(key).ok())
}

/// Load a workspace with an explicit environment lookup.
pub fn load_project_with_env<F>(config_path: &Path, workspace: &Path, lookup: F) -> AppResult<Project>
where
    F: Fn(&str) -> Option<String>,
{
    let config_text = std::fs::read_to_string(config_path).map_err(|e| AppError::ConfigFileRead {
        path: config_path.to_path_buf(),
        source: e,
    })?;
    let mut config = RunConfig::from_yaml_str(&config_text)?;
    config.apply_env_overrides(lookup);
    let paths = config.resolve_paths(workspace)?;
    let inputs = load_inputs(&config, &paths)?;

    info!(
        config = %config_path.display(),
        ponds = inputs.plant.ponds.len(),
        "Loaded workspace"
    );

    Ok(Project {
        root: workspace.to_path_buf(),
        config_path: config_path.to_path_buf(),
        config_text,
        config,
        paths,
        inputs,
    })
}

/// Check that the loaded workspace can run at all.
pub fn validate_project(project: &Project) -> AppResult<ProjectSummary> {
    let params = &project.inputs.params;
    if params.transfer_policy != TransferPolicy::DiscardExcess {
        return Err(AppError::Config(format!(
            "transfer policy '{}' is not implemented",
            params.transfer_policy.label()
        )));
    }
    let source = EvaporationSource::from_params(params)?;

    let ponds = project
        .inputs
        .plant
        .ponds
        .iter()
        .map(|p| PondOverview {
            name: p.name.clone(),
            area_m2: p.area_m2,
            capacity_m3: params.pond_capacities_m3.get(&p.name).copied(),
        })
        .collect();

    Ok(ProjectSummary {
        ponds,
        schedule_days: match &source {
            EvaporationSource::Schedule(s) => Some(s.len()),
            EvaporationSource::Constant(_) => None,
        },
        constant_rate: params.evaporation_rate_mol_per_day_l,
        target_mineral: params.target_mineral.clone(),
        nsteps_default_days: params.nsteps_default_days,
        max_stages: params.max_stages,
        transfer_policy: params.transfer_policy,
    })
}
