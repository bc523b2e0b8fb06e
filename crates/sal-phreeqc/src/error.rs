//! Solver errors.

use std::path::PathBuf;
use thiserror::Error;

pub type PhreeqcResult<T> = Result<T, PhreeqcError>;

#[derive(Error, Debug)]
pub enum PhreeqcError {
    /// The run cannot start: missing binary, missing database, no usable
    /// evaporation source.
    #[error("Configuration error: {what}")]
    Config { what: String },

    /// Missing binary or database file.
    #[error("Configuration error: {what} not found at {}", .path.display())]
    MissingPath { what: &'static str, path: PathBuf },

    /// The solver process failed or produced no result table.
    #[error("Solver execution failed{}: {message}", .status.map(|c| format!(" (exit code {c})")).unwrap_or_default())]
    Execution {
        status: Option<i32>,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PhreeqcError {
    /// Configuration problems abort the whole run.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            PhreeqcError::Config { .. } | PhreeqcError::MissingPath { .. }
        )
    }
}
