//! Parameter and plant validation.

use std::collections::HashSet;

use sal_core::ensure_non_negative;

use crate::model::{Plant, SimulationParams};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate pond name: {name}")]
    DuplicatePond { name: String },

    #[error("Plant has no ponds")]
    NoPonds,

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    ensure_non_negative(value, "value")
        .map(|_| ())
        .map_err(|e| invalid(field, value, &e.to_string()))
}

pub fn validate_params(params: &SimulationParams) -> Result<(), ValidationError> {
    if params.nsteps_default_days == 0 {
        return Err(invalid("nsteps_default_days", 0, "must be positive"));
    }
    if params.max_total_steps == 0 {
        return Err(invalid("max_total_steps", 0, "must be positive"));
    }
    if let Some(rate) = params.evaporation_rate_mol_per_day_l {
        non_negative("evaporation_rate_mol_per_day_l", rate)?;
    }
    if let Some(cap) = params.max_evap_step_mol_l
        && (!cap.is_finite() || cap <= 0.0)
    {
        return Err(invalid(
            "max_evap_step_mol_l",
            cap,
            "must be finite and positive",
        ));
    }
    if let Some(day) = params
        .evap_schedule_mol_per_day_l
        .as_deref()
        .unwrap_or_default()
        .iter()
        .position(|r| !r.is_finite() || *r < 0.0)
    {
        return Err(invalid(
            "evap_schedule_mol_per_day_l",
            format!("day {day}"),
            "rates must be finite and non-negative",
        ));
    }
    if !(params.liquid_density_g_per_l.is_finite() && params.liquid_density_g_per_l > 0.0) {
        return Err(invalid(
            "liquid_density_g_per_l",
            params.liquid_density_g_per_l,
            "must be positive",
        ));
    }
    non_negative("initial_pond1_m3", params.initial_pond1_m3)?;
    for (pond, capacity) in &params.pond_capacities_m3 {
        non_negative(&format!("pond_capacities_m3[{pond}]"), *capacity)?;
    }
    if !params
        .tracked_phases
        .iter()
        .any(|p| p.eq_ignore_ascii_case(&params.target_mineral))
    {
        return Err(invalid(
            "target_mineral",
            &params.target_mineral,
            "must be one of tracked_phases",
        ));
    }
    Ok(())
}

pub fn validate_plant(plant: &Plant) -> Result<(), ValidationError> {
    if plant.ponds.is_empty() {
        return Err(ValidationError::NoPonds);
    }
    let mut names = HashSet::new();
    for pond in &plant.ponds {
        if !names.insert(pond.name.as_str()) {
            return Err(ValidationError::DuplicatePond {
                name: pond.name.clone(),
            });
        }
        if !(pond.area_m2.is_finite() && pond.area_m2 > 0.0) {
            return Err(invalid(
                &format!("{} area_m2", pond.name),
                pond.area_m2,
                "must be positive",
            ));
        }
    }
    Ok(())
}
