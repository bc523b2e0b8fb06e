//! Solver backend abstraction.

use std::path::Path;

use crate::error::PhreeqcResult;
use crate::script::Script;

/// A blocking equilibrium solver.
///
/// `run` must either leave one table per stage of `script` at each stage's
/// `result_path` under `output_dir()`, or return an error. Implementations
/// never retry.
pub trait SolverBackend {
    /// Backend name (for logging).
    fn name(&self) -> &str;

    /// Identifies the solver build and database; feeds the run id.
    fn version(&self) -> String {
        self.name().to_string()
    }

    /// Directory the stage tables are written to.
    fn output_dir(&self) -> &Path;

    /// Submit the script and block until the solver exits.
    fn run(&mut self, script: &Script) -> PhreeqcResult<()>;
}
