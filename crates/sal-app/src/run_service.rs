//! Run execution and caching service.

use std::path::{Path, PathBuf};
use std::time::Instant;

use sal_cascade::{CascadeError, CascadeEvent, CascadeRun, run_cascade};
use sal_phreeqc::{PhreeqcProcess, SolverBackend};
use sal_results::{RunManifest, RunStore, Termination, compute_run_id};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::progress::{RunProgressEvent, RunStage};
use crate::project_service::{self, Project};

/// Options for running a cascade.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    /// Search this directory for a PHREEQC install when the configured
    /// solver paths do not exist.
    pub discover_root: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            discover_root: None,
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub config_path: &'a Path,
    pub workspace: &'a Path,
    pub options: RunOptions,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
    pub elapsed_s: f64,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            message,
        ));
    }
}

/// Build the PHREEQC backend for a project.
pub fn build_backend(project: &Project, options: &RunOptions) -> AppResult<PhreeqcProcess> {
    let paths = &project.paths;
    match PhreeqcProcess::new(&paths.phreeqc_bin, &paths.phreeqc_database, &paths.work_dir) {
        Ok(process) => Ok(process),
        Err(err) if err.is_config() => match &options.discover_root {
            Some(root) => {
                warn!("{err}; searching {} for a PHREEQC install", root.display());
                Ok(PhreeqcProcess::discover(root, &paths.work_dir)?)
            }
            None => Err(err.into()),
        },
        Err(err) => Err(err.into()),
    }
}

/// Execute or load a run based on request.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream progress events.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    emit_progress(
        &mut progress_cb,
        RunStage::LoadingInputs,
        started,
        Some("Loading workspace".to_string()),
    );
    let project = project_service::load_project(request.config_path, request.workspace)?;
    let mut backend = build_backend(&project, &request.options)?;
    ensure_run_with_backend(&project, &mut backend, &request.options, progress_cb)
}

/// Execute or load a run against an already constructed backend.
///
/// A cached run is reused only if it completed. A failed stage still stores
/// the partial run, with a `Failed` termination, before the error is returned.
pub fn ensure_run_with_backend(
    project: &Project,
    backend: &mut dyn SolverBackend,
    options: &RunOptions,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let params = &project.inputs.params;

    emit_progress(
        &mut progress_cb,
        RunStage::CheckingCache,
        started,
        Some("Checking run cache".to_string()),
    );
    let run_id = compute_run_id(
        &project.config_text,
        &project.inputs.plant,
        params,
        &backend.version(),
    );
    let store = RunStore::for_work_dir(&project.paths.work_dir)?;

    if options.use_cache && store.has_run(&run_id) {
        let manifest = store.load_manifest(&run_id)?;
        if !manifest.termination.is_failure() {
            emit_progress(
                &mut progress_cb,
                RunStage::LoadingCachedResult,
                started,
                Some("Loaded cached run".to_string()),
            );
            info!(run_id = %run_id, "Using cached run");
            return Ok(RunResponse {
                run_id,
                manifest,
                loaded_from_cache: true,
                elapsed_s: started.elapsed().as_secs_f64(),
            });
        }
        info!(run_id = %run_id, "Cached run had failed, running again");
    }

    emit_progress(
        &mut progress_cb,
        RunStage::RunningCascade,
        started,
        Some(format!("Running cascade with {}", backend.name())),
    );
    let result = {
        let mut forward = |event: CascadeEvent| {
            if let Some(cb) = progress_cb.as_deref_mut() {
                cb(RunProgressEvent {
                    stage: RunStage::RunningCascade,
                    elapsed_wall_s: started.elapsed().as_secs_f64(),
                    message: None,
                    cascade: Some(event),
                });
            }
        };
        run_cascade(backend, &project.inputs.plant, params, Some(&mut forward))
    };

    let (run, termination, failure) = match result {
        Ok(outcome) => (outcome.run, outcome.termination, None),
        Err(CascadeError::Stage {
            stage,
            source,
            partial,
        }) => {
            let message = source.to_string();
            let termination = Termination::Failed {
                stage: stage.clone(),
                message: message.clone(),
            };
            (*partial, termination, Some((stage, message)))
        }
        Err(err) => return Err(err.into()),
    };

    emit_progress(
        &mut progress_cb,
        RunStage::SavingResults,
        started,
        Some("Saving results".to_string()),
    );
    let manifest = build_manifest(&run_id, project, &backend.version(), &run, termination);
    let tables: Vec<PathBuf> = run.table_paths.values().cloned().collect();
    store.save_run(&manifest, &tables)?;

    if let Some((stage, message)) = failure {
        return Err(AppError::StageFailed {
            stage,
            message,
            run_id,
        });
    }

    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some("Run completed".to_string()),
    );
    Ok(RunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
        elapsed_s: started.elapsed().as_secs_f64(),
    })
}

fn build_manifest(
    run_id: &str,
    project: &Project,
    solver_version: &str,
    run: &CascadeRun,
    termination: Termination,
) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        solver_version: solver_version.to_string(),
        target_mineral: project.inputs.params.target_mineral.clone(),
        tracked_phases: project.inputs.params.tracked_phases.clone(),
        termination,
        stages: run.stages.clone(),
        transfers: run.transfers.clone(),
    }
}

/// Stored runs under a work directory, newest first.
pub fn list_runs(work_dir: &Path) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::for_work_dir(work_dir)?;
    Ok(store.list_runs()?)
}

/// Load a stored run by id or unique id prefix.
pub fn load_run(work_dir: &Path, run_id: &str) -> AppResult<RunManifest> {
    let store = RunStore::for_work_dir(work_dir)?;
    let run_id = store.resolve_id(run_id)?;
    Ok(store.load_manifest(&run_id)?)
}
