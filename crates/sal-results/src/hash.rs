//! Content-based hashing for run IDs.

use sal_plant::{Plant, SimulationParams};
use sha2::{Digest, Sha256};

/// SHA-256 over the configuration text, the loaded plant (brine lines, pond
/// order and areas, minerals), the resolved parameters and the solver version.
pub fn compute_run_id(
    config_text: &str,
    plant: &Plant,
    params: &SimulationParams,
    solver_version: &str,
) -> String {
    let mut hasher = Sha256::new();

    hasher.update(config_text.as_bytes());

    let plant_json = serde_json::to_string(plant).unwrap_or_default();
    hasher.update(plant_json.as_bytes());

    let params_json = serde_json::to_string(params).unwrap_or_default();
    hasher.update(params_json.as_bytes());

    hasher.update(solver_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
