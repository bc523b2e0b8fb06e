//! Shared application service layer for the pond cascade.
//!
//! Centralizes loading a configured workspace, building the solver backend,
//! running or reloading a cascade, and querying stored runs, so the CLI stays
//! a thin shell.

pub mod error;
pub mod progress;
pub mod project_service;
pub mod query;
pub mod run_service;

pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage};
pub use project_service::{PondOverview, Project, ProjectSummary, load_project, load_project_with_env, validate_project};
pub use query::{PondSummary, RunSummary, export_timeline, get_run_summary, pond_timeline};
pub use run_service::{
    RunOptions, RunRequest, RunResponse, build_backend, ensure_run, ensure_run_with_backend,
    ensure_run_with_progress, list_runs, load_run,
};
