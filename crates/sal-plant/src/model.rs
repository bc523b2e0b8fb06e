//! Facility domain model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::{PlantError, PlantResult};

/// Static reference properties of a mineral phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MineralProps {
    pub name: String,
    pub molar_mass_g_per_mol: f64,
    pub density_kg_per_m3: f64,
}

impl MineralProps {
    pub fn new(name: &str, molar_mass_g_per_mol: f64, density_kg_per_m3: f64) -> Self {
        Self {
            name: name.to_string(),
            molar_mass_g_per_mol,
            density_kg_per_m3,
        }
    }

    /// Bulk volume [m³] occupied by `moles` of this mineral.
    pub fn solid_volume_m3(&self, moles: f64) -> f64 {
        if self.density_kg_per_m3 <= 0.0 {
            return 0.0;
        }
        moles.max(0.0) * self.molar_mass_g_per_mol / 1000.0 / self.density_kg_per_m3
    }
}

/// One physical evaporation basin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pond {
    pub name: String,
    pub area_m2: f64,
    pub init_level_m: f64,
    pub max_level_m: f64,
    #[serde(default)]
    pub level_history: Vec<f64>,
    #[serde(default)]
    pub solids_level_history: Vec<f64>,
}

impl Pond {
    pub fn new(name: &str, area_m2: f64, init_level_m: f64, max_level_m: f64) -> Self {
        Self {
            name: name.to_string(),
            area_m2,
            init_level_m,
            max_level_m,
            level_history: Vec::new(),
            solids_level_history: Vec::new(),
        }
    }

    /// Append one observation of liquid and settled-solids level [m].
    pub fn record_levels(&mut self, liquid_level_m: f64, solids_level_m: f64) {
        self.level_history.push(liquid_level_m);
        self.solids_level_history.push(solids_level_m);
    }

    /// Level [m] a volume [m³] reaches in this pond.
    pub fn level_for_volume(&self, volume_m3: f64) -> f64 {
        if self.area_m2 > 0.0 {
            volume_m3 / self.area_m2
        } else {
            0.0
        }
    }
}

/// Feed brine: the literal SOLUTION body consumed verbatim by the solver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Brine {
    pub solution_lines: Vec<String>,
}

impl Brine {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            solution_lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_file(path: &Path) -> PlantResult<Self> {
        if !path.exists() {
            return Err(PlantError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_lines(content.lines()))
    }
}

/// What happens to transfer volume that does not fit the destination pond.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransferPolicy {
    /// Excess is dropped and reported.
    #[default]
    DiscardExcess,
    /// Excess stays in the source pond. Accepted in configuration, not implemented.
    HoldInSource,
    /// Excess overflows into the next pond. Accepted in configuration, not implemented.
    SpillToNext,
}

impl TransferPolicy {
    pub fn label(self) -> &'static str {
        match self {
            TransferPolicy::DiscardExcess => "discard_excess",
            TransferPolicy::HoldInSource => "hold_in_source",
            TransferPolicy::SpillToNext => "spill_to_next",
        }
    }
}

/// Run configuration for one cascade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationParams {
    /// Constant fallback rate [mol H2O / day / L]; `None` means no fallback.
    pub evaporation_rate_mol_per_day_l: Option<f64>,
    pub level_limit_m: f64,
    /// Length of a full stage in days.
    pub nsteps_default_days: u32,
    /// Solver steps per day when no daily schedule is used.
    pub micro_steps_factor: u32,
    /// Daily rates indexed by absolute day.
    pub evap_schedule_mol_per_day_l: Option<Vec<f64>>,
    /// Per-day rate ceiling.
    pub max_evap_step_mol_l: Option<f64>,
    /// Ceiling on scheduled steps in one stage.
    pub max_total_steps: u32,
    /// Ceiling on cascade transfers.
    pub max_stages: u32,
    pub pond_capacities_m3: BTreeMap<String, f64>,
    pub transfer_policy: TransferPolicy,
    pub initial_pond1_m3: f64,
    pub liquid_density_g_per_l: f64,
    /// Mineral whose first precipitation triggers a transfer.
    pub target_mineral: String,
    pub tracked_phases: Vec<String>,
    /// Elements reported as totals in every stage table.
    pub tracked_totals: Vec<String>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            evaporation_rate_mol_per_day_l: Some(0.273),
            level_limit_m: 2.0,
            nsteps_default_days: 100,
            micro_steps_factor: 1,
            evap_schedule_mol_per_day_l: None,
            max_evap_step_mol_l: Some(0.35),
            max_total_steps: 365,
            max_stages: 5,
            pond_capacities_m3: BTreeMap::new(),
            transfer_policy: TransferPolicy::DiscardExcess,
            initial_pond1_m3: 0.0,
            liquid_density_g_per_l: 1000.0,
            target_mineral: "Halite".to_string(),
            tracked_phases: vec![
                "Calcite".to_string(),
                "Gypsum".to_string(),
                "Halite".to_string(),
            ],
            tracked_totals: ["Cl", "Na", "S", "K", "Ca", "Mg"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl SimulationParams {
    /// Daily schedule if one is configured and non-empty.
    pub fn schedule(&self) -> Option<&[f64]> {
        self.evap_schedule_mol_per_day_l
            .as_deref()
            .filter(|s| !s.is_empty())
    }
}

/// The whole facility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plant {
    /// Ordered ponds; the first one is the primary concentrator.
    pub ponds: Vec<Pond>,
    pub brine: Brine,
    pub minerals: BTreeMap<String, MineralProps>,
}

impl Plant {
    pub fn get_pond(&self, name: &str) -> PlantResult<&Pond> {
        self.ponds
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| PlantError::NotFound {
                what: "Pond",
                name: name.to_string(),
            })
    }

    pub fn get_pond_mut(&mut self, name: &str) -> PlantResult<&mut Pond> {
        self.ponds
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| PlantError::NotFound {
                what: "Pond",
                name: name.to_string(),
            })
    }

    pub fn primary_pond(&self) -> Option<&Pond> {
        self.ponds.first()
    }

    /// Receiving pond fed by cascade step `k` (1-based): the `k+1`-th pond.
    pub fn receiving_pond(&self, k: usize) -> Option<&Pond> {
        self.ponds.get(k)
    }

    /// Case-insensitive mineral lookup.
    pub fn mineral(&self, name: &str) -> PlantResult<&MineralProps> {
        self.minerals
            .get(name)
            .or_else(|| {
                self.minerals
                    .values()
                    .find(|m| m.name.eq_ignore_ascii_case(name))
            })
            .ok_or_else(|| PlantError::NotFound {
                what: "Mineral",
                name: name.to_string(),
            })
    }
}
