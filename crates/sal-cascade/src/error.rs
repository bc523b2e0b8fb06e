//! Cascade errors.

use sal_phreeqc::PhreeqcError;
use sal_results::ResultsError;
use thiserror::Error;

use crate::orchestrator::CascadeRun;

pub type CascadeResult<T> = Result<T, CascadeError>;

/// The dependency a stage failed in.
#[derive(Error, Debug)]
pub enum StageFailure {
    #[error(transparent)]
    Solver(#[from] PhreeqcError),

    #[error(transparent)]
    Table(#[from] ResultsError),
}

#[derive(Error, Debug)]
pub enum CascadeError {
    /// Raised before any stage is submitted, or on an unimplemented policy.
    #[error("Configuration error: {what}")]
    Config { what: String },

    /// A stage failed; `partial` holds every stage completed before it.
    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        source: StageFailure,
        partial: Box<CascadeRun>,
    },
}

impl CascadeError {
    pub fn config(what: impl Into<String>) -> Self {
        CascadeError::Config { what: what.into() }
    }

    pub fn partial(&self) -> Option<&CascadeRun> {
        match self {
            CascadeError::Stage { partial, .. } => Some(partial),
            CascadeError::Config { .. } => None,
        }
    }
}
