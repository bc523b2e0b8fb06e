//! One bounded reaction stage.

use sal_core::{PhaseTag, SolutionTag};

/// Abstract description of one stage, independent of script syntax.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionStage {
    /// Human-readable name used in logs and errors.
    pub label: String,
    pub reaction_id: u32,
    /// Simulated days.
    pub step_count: u32,
    /// Water removed over the whole stage [mol/L]; used without a daily schedule.
    pub total_moles_removed: f64,
    /// File name of the SELECTED_OUTPUT table inside the solver output dir.
    pub results_table_id: String,
    /// Number of a freshly declared EQUILIBRIUM_PHASES set.
    pub equilibrium_phase_set_id: Option<u32>,
    pub use_solution_tag: Option<SolutionTag>,
    pub use_equilibrium_phase_tag: Option<PhaseTag>,
    pub save_solution_tag: Option<SolutionTag>,
    pub save_equilibrium_phase_tag: Option<PhaseTag>,
    /// Absolute day the daily schedule slice starts at.
    pub schedule_absolute_start_day: Option<u32>,
}

impl ReactionStage {
    /// A fresh-brine stage declaring phase set `reaction_id`.
    pub fn new(label: &str, reaction_id: u32, step_count: u32, results_table_id: &str) -> Self {
        Self {
            label: label.to_string(),
            reaction_id,
            step_count,
            total_moles_removed: 0.0,
            results_table_id: results_table_id.to_string(),
            equilibrium_phase_set_id: Some(reaction_id),
            use_solution_tag: None,
            use_equilibrium_phase_tag: None,
            save_solution_tag: None,
            save_equilibrium_phase_tag: None,
            schedule_absolute_start_day: None,
        }
    }

    pub fn removing(mut self, moles: f64) -> Self {
        self.total_moles_removed = moles;
        self
    }

    pub fn with_phase_set(mut self, id: u32) -> Self {
        self.equilibrium_phase_set_id = Some(id);
        self
    }

    /// Resume a saved solution, and optionally a saved phase assemblage.
    pub fn resume(mut self, solution: SolutionTag, phases: Option<PhaseTag>) -> Self {
        self.use_solution_tag = Some(solution);
        self.use_equilibrium_phase_tag = phases;
        self
    }

    /// Persist the terminal state under the given tags.
    pub fn save(mut self, solution: SolutionTag, phases: PhaseTag) -> Self {
        self.save_solution_tag = Some(solution);
        self.save_equilibrium_phase_tag = Some(phases);
        self
    }

    pub fn anchored_at(mut self, absolute_day: u32) -> Self {
        self.schedule_absolute_start_day = Some(absolute_day);
        self
    }

    /// Whether this stage declares a new EQUILIBRIUM_PHASES set.
    pub fn declares_phases(&self) -> bool {
        self.use_equilibrium_phase_tag.is_none() && self.equilibrium_phase_set_id.is_some()
    }
}
