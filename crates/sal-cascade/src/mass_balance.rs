//! Transfer volume from water removal, capped by destination capacity.

use std::collections::BTreeMap;

use sal_core::constants::WATER_MOLAR_MASS_G_PER_MOL;
use sal_core::{as_m3, liters, m3};
use sal_plant::TransferPolicy;
use sal_results::{ResultTable, ResultsError, ResultsResult};
use tracing::{info, warn};

use crate::error::{CascadeError, CascadeResult};

/// Liquid volume [m³] left after the water removed up to `target_day`
/// (in the table's own time units). Uses the first row at or past
/// `target_day`, else the last row. Never negative.
pub fn remaining_volume(
    table: &ResultTable,
    target_day: f64,
    initial_volume_m3: f64,
    density_g_per_l: f64,
) -> ResultsResult<f64> {
    let moles = reaction_at(table, target_day)?;
    let removed = liters(moles * WATER_MOLAR_MASS_G_PER_MOL / density_g_per_l);
    Ok(as_m3(m3(initial_volume_m3) - removed).max(0.0))
}

/// Cumulative water removed [mol] at the first row with time >= `target_day`.
pub fn reaction_at(table: &ResultTable, target_day: f64) -> ResultsResult<f64> {
    if table.is_empty() {
        return Err(ResultsError::EmptyTable {
            table: table.id().to_string(),
        });
    }
    let time = table.time_series()?;
    let reaction = table.reaction_series()?;
    let row = time
        .iter()
        .position(|&t| t >= target_day)
        .unwrap_or(time.len() - 1);
    Ok(reaction[row])
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferCap {
    pub allowed_m3: f64,
    pub discarded_m3: f64,
}

/// `allowed = min(requested, capacity)`, `discarded = requested - allowed`.
/// A destination without a configured capacity takes everything.
pub fn cap_transfer(
    source: &str,
    destination: &str,
    requested_m3: f64,
    capacities: &BTreeMap<String, f64>,
    policy: TransferPolicy,
) -> CascadeResult<TransferCap> {
    if policy != TransferPolicy::DiscardExcess {
        return Err(CascadeError::config(format!(
            "transfer policy '{}' is not implemented",
            policy.label()
        )));
    }

    let requested_m3 = requested_m3.max(0.0);
    let allowed_m3 = match capacities.get(destination) {
        Some(&capacity) => requested_m3.min(capacity.max(0.0)),
        None => requested_m3,
    };
    let discarded_m3 = (requested_m3 - allowed_m3).max(0.0);

    info!(
        source,
        destination,
        requested_m3,
        allowed_m3,
        discarded_m3,
        "Transfer volume"
    );
    if discarded_m3 > 0.0 {
        warn!(
            "{destination} capacity exceeded: {allowed_m3:.2} m³ allowed, {discarded_m3:.2} m³ discarded"
        );
    }

    Ok(TransferCap {
        allowed_m3,
        discarded_m3,
    })
}
