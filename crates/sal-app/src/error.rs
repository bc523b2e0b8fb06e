//! Error types for the sal-app service layer.

use std::path::PathBuf;

use sal_cascade::CascadeError;
use sal_phreeqc::PhreeqcError;
use sal_plant::PlantError;
use sal_results::ResultsError;

/// Application error type that wraps errors from the backend crates and
/// gives the CLI one error surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read configuration file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Input error: {0}")]
    Inputs(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Cascade error: {0}")]
    Cascade(String),

    /// The partial run was stored under `run_id`.
    #[error("Stage '{stage}' failed (partial run {run_id} saved): {message}")]
    StageFailed {
        stage: String,
        message: String,
        run_id: String,
    },

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sal-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<PlantError> for AppError {
    fn from(err: PlantError) -> Self {
        match err {
            PlantError::MissingKey { .. } => AppError::Config(err.to_string()),
            other => AppError::Inputs(other.to_string()),
        }
    }
}

impl From<PhreeqcError> for AppError {
    fn from(err: PhreeqcError) -> Self {
        if err.is_config() {
            AppError::Config(err.to_string())
        } else {
            AppError::Solver(err.to_string())
        }
    }
}

impl From<CascadeError> for AppError {
    fn from(err: CascadeError) -> Self {
        match err {
            CascadeError::Config { what } => AppError::Config(what),
            other => AppError::Cascade(other.to_string()),
        }
    }
}

impl From<ResultsError> for AppError {
    fn from(err: ResultsError) -> Self {
        match err {
            ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
