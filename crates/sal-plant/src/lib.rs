//! sal-plant: facility model, run configuration and upstream input loading.

pub mod config;
pub mod loaders;
pub mod model;
pub mod reference;
pub mod validate;

pub use config::{ParamsOverrides, ResolvedPaths, RunConfig, load_config};
pub use loaders::{
    PlantInputs, canonical_pond_name, load_brine, load_evaporation_schedule, load_inputs,
    load_pond_table, parse_evaporation_table, parse_pond_table,
};
pub use model::*;
pub use validate::{ValidationError, validate_params, validate_plant};

use std::path::PathBuf;

pub type PlantResult<T> = Result<T, PlantError>;

#[derive(thiserror::Error, Debug)]
pub enum PlantError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("Missing configuration key: {key}")]
    MissingKey { key: &'static str },

    #[error("Input file not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("Parse error in {path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
