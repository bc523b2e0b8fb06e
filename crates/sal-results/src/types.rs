//! Run record types.

use sal_core::{PhaseTag, SolutionTag, Tolerances, nearly_equal};
use serde::{Deserialize, Serialize};

pub type RunId = String;

/// What a stage does in the cascade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Primary pond run searching for the next trigger.
    PrimaryRun,
    /// Primary pond re-run up to the trigger day; saves the transferred state.
    Charge,
    /// Receiving pond evolving from the transferred state.
    ReceivingEvolve,
}

impl StageKind {
    pub fn label(self) -> &'static str {
        match self {
            StageKind::PrimaryRun => "primary run",
            StageKind::Charge => "charge",
            StageKind::ReceivingEvolve => "receiving evolve",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageRecord {
    /// Table file name, `results{n}.dat`.
    pub table_id: String,
    pub label: String,
    pub kind: StageKind,
    pub pond: String,
    /// Cascade index `k`; 0 for the initial primary run.
    pub cascade_index: u32,
    pub reaction_id: u32,
    /// Simulated days actually covered.
    pub step_count: u32,
    pub steps_per_day: u32,
    pub absolute_start_day: u32,
    #[serde(default)]
    pub padded_days: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated_from: Option<u32>,
    /// `USE SOLUTION` / `USE EQUILIBRIUM_PHASES` tags; none for the feed brine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumed_solution: Option<SolutionTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumed_phases: Option<PhaseTag>,
    /// `SAVE` tags written by a charge stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_solution: Option<SolutionTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_phases: Option<PhaseTag>,
}

impl StageRecord {
    pub fn absolute_end_day(&self) -> u32 {
        self.absolute_start_day + self.step_count
    }
}

/// Primary vs. charge reaction extent at the trigger day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExtentCheck {
    pub primary_mol: f64,
    pub charge_mol: f64,
    pub consistent: bool,
}

impl ExtentCheck {
    pub const REL_TOLERANCE: f64 = 1e-6;

    pub fn compare(primary_mol: f64, charge_mol: f64) -> Self {
        let tol = Tolerances {
            abs: 1e-12,
            rel: Self::REL_TOLERANCE,
        };
        let consistent = nearly_equal(primary_mol, charge_mol, tol);
        Self {
            primary_mol,
            charge_mol,
            consistent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferRecord {
    /// Cascade index `k` (1-based).
    pub index: u32,
    pub source: String,
    pub destination: String,
    pub absolute_day: u32,
    pub remaining_m3: f64,
    pub allowed_m3: f64,
    pub discarded_m3: f64,
    pub extent_check: ExtentCheck,
}

/// Why the cascade stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Termination {
    /// A primary-run stage never reached saturation of the target mineral.
    NoTrigger { stage: String },
    /// The `max_stages` ceiling was reached.
    MaxStages { stages: u32 },
    /// A trigger fired but the plant has no further receiving pond.
    PondsExhausted { index: u32 },
    /// A stage failed; the run holds what completed before it.
    Failed { stage: String, message: String },
}

impl Termination {
    pub fn is_failure(&self) -> bool {
        matches!(self, Termination::Failed { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            Termination::NoTrigger { stage } => format!("no trigger in {stage}"),
            Termination::MaxStages { stages } => format!("max_stages ({stages}) reached"),
            Termination::PondsExhausted { index } => {
                format!("no receiving pond for transfer {index}")
            }
            Termination::Failed { stage, message } => format!("{stage} failed: {message}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub timestamp: String,
    pub solver_version: String,
    pub target_mineral: String,
    #[serde(default)]
    pub tracked_phases: Vec<String>,
    pub termination: Termination,
    pub stages: Vec<StageRecord>,
    pub transfers: Vec<TransferRecord>,
}

impl RunManifest {
    pub fn stage(&self, table_id: &str) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.table_id == table_id)
    }

    /// Stages that make up a pond's timeline: the primary-run chain for the
    /// primary pond, the evolve stage for a receiving pond.
    pub fn pond_stages(&self, pond: &str) -> Vec<&StageRecord> {
        self.stages
            .iter()
            .filter(|s| s.pond == pond && s.kind != StageKind::Charge)
            .collect()
    }

    /// Ponds in the order they first appear.
    pub fn ponds(&self) -> Vec<&str> {
        let mut ponds: Vec<&str> = Vec::new();
        for s in &self.stages {
            if !ponds.contains(&s.pond.as_str()) {
                ponds.push(&s.pond);
            }
        }
        ponds
    }

    pub fn total_discarded_m3(&self) -> f64 {
        self.transfers.iter().map(|t| t.discarded_m3).sum()
    }
}
