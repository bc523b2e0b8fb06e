//! Evaporative water removal for a stage: constant rate or sliced daily schedule.

use sal_plant::SimulationParams;
use tracing::{debug, warn};

use crate::error::{PhreeqcError, PhreeqcResult};
use crate::stage::ReactionStage;

/// Where daily water-removal rates come from.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaporationSource {
    /// Rates indexed by absolute day; never empty.
    Schedule(Vec<f64>),
    /// One rate for every day [mol H2O / day / L].
    Constant(f64),
}

impl EvaporationSource {
    /// Resolve the source from run parameters. A non-empty schedule wins;
    /// otherwise the constant fallback rate is required.
    pub fn from_params(params: &SimulationParams) -> PhreeqcResult<Self> {
        if let Some(schedule) = params.schedule() {
            return Ok(Self::Schedule(schedule.to_vec()));
        }
        match params.evaporation_rate_mol_per_day_l {
            Some(rate) if rate.is_finite() && rate >= 0.0 => Ok(Self::Constant(rate)),
            Some(rate) => Err(PhreeqcError::Config {
                what: format!("constant evaporation rate {rate} is not a valid rate"),
            }),
            None => Err(PhreeqcError::Config {
                what: "evaporation schedule is empty and no constant fallback rate is configured"
                    .to_string(),
            }),
        }
    }

    /// Water removed over `days` days starting at absolute day `start` [mol/L].
    pub fn moles_over(&self, start: u32, days: u32) -> f64 {
        match self {
            Self::Constant(rate) => rate * f64::from(days),
            Self::Schedule(schedule) => {
                slice_schedule(schedule, start as usize, days as usize)
                    .0
                    .iter()
                    .sum()
            }
        }
    }
}

/// Rates for days `[start, start + len)`. Days past the end of the schedule
/// repeat its last value. Returns the slice and the number of padded days.
///
/// An empty schedule yields an empty slice.
pub fn slice_schedule(schedule: &[f64], start: usize, len: usize) -> (Vec<f64>, usize) {
    let Some(&last) = schedule.last() else {
        return (Vec::new(), 0);
    };
    let begin = start.min(schedule.len());
    let end = start.saturating_add(len).min(schedule.len());
    let mut slice = schedule[begin..end].to_vec();
    let padded = len - slice.len();
    slice.resize(len, last);
    (slice, padded)
}

/// How a stage removes water in the solver input.
#[derive(Debug, Clone, PartialEq)]
pub enum Removal {
    /// One increment per day, one solver step per increment.
    Daily(Vec<f64>),
    /// Total removal spread evenly over `steps` internal steps.
    Aggregate { moles: f64, steps: u32 },
}

impl Removal {
    /// Solver steps this removal produces.
    pub fn steps(&self) -> u32 {
        match self {
            Removal::Daily(rates) => rates.len() as u32,
            Removal::Aggregate { steps, .. } => *steps,
        }
    }
}

/// Resolved removal for one stage plus what had to be adjusted.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalPlan {
    pub removal: Removal,
    /// Simulated days actually covered.
    pub effective_days: u32,
    /// Days filled with the schedule's last value.
    pub padded_days: usize,
    /// Days whose rate was clamped to `max_evap_step_mol_l`.
    pub clamped_days: usize,
    /// Requested length when the step ceiling cut the stage short.
    pub truncated_from: Option<u32>,
}

pub fn plan_removal(
    stage: &ReactionStage,
    source: &EvaporationSource,
    params: &SimulationParams,
) -> RemovalPlan {
    let factor = params.micro_steps_factor.max(1);
    let schedule = match source {
        EvaporationSource::Schedule(schedule) if stage.step_count > 0 => schedule,
        _ => {
            return RemovalPlan {
                removal: Removal::Aggregate {
                    moles: stage.total_moles_removed,
                    steps: stage.step_count.saturating_mul(factor),
                },
                effective_days: stage.step_count,
                padded_days: 0,
                clamped_days: 0,
                truncated_from: None,
            };
        }
    };

    let start = stage.schedule_absolute_start_day.unwrap_or(0) as usize;
    let (mut rates, padded_days) = slice_schedule(schedule, start, stage.step_count as usize);
    if padded_days > 0 {
        debug!(
            stage = %stage.label,
            padded_days,
            "Schedule shorter than stage window [{start}, {}), padding with last rate",
            start + stage.step_count as usize
        );
    }

    let mut clamped_days = 0;
    if let Some(cap) = params.max_evap_step_mol_l {
        for rate in rates.iter_mut().filter(|r| **r > cap) {
            *rate = cap;
            clamped_days += 1;
        }
        if clamped_days > 0 {
            debug!(stage = %stage.label, clamped_days, cap, "Clamped daily rates to ceiling");
        }
    }

    let mut truncated_from = None;
    let ceiling = params.max_total_steps as usize;
    if rates.len() > ceiling {
        warn!(
            stage = %stage.label,
            "Capping {} scheduled days to max_total_steps = {}",
            rates.len(),
            ceiling
        );
        truncated_from = Some(rates.len() as u32);
        rates.truncate(ceiling);
    }

    RemovalPlan {
        effective_days: rates.len() as u32,
        removal: Removal::Daily(rates),
        padded_days,
        clamped_days,
        truncated_from,
    }
}
