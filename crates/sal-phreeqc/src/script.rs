//! Solver input generation.
//!
//! A script is a brine header followed by one block per stage. The header
//! defines the feed brine as SOLUTION 1 and a `Water` pseudo-phase used as the
//! evaporation reactant. Each stage block resumes or starts a solution, removes
//! water, equilibrates against the tracked phases and writes its own table.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use sal_core::BRINE_SOLUTION;
use sal_plant::{Brine, SimulationParams};
use tracing::debug;

use crate::error::PhreeqcResult;
use crate::evaporation::{EvaporationSource, Removal, RemovalPlan, plan_removal};
use crate::stage::ReactionStage;

/// A stage as it was rendered into a script.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptStage {
    pub stage: ReactionStage,
    /// Where the solver writes this stage's table.
    pub result_path: PathBuf,
    pub plan: RemovalPlan,
}

impl ScriptStage {
    /// Solver steps emitted per simulated day.
    pub fn steps_per_day(&self) -> u32 {
        match self.plan.removal {
            Removal::Daily(_) => 1,
            Removal::Aggregate { steps, .. } => {
                if self.plan.effective_days == 0 {
                    1
                } else {
                    (steps / self.plan.effective_days).max(1)
                }
            }
        }
    }
}

/// A complete, submittable solver input.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub text: String,
    pub stages: Vec<ScriptStage>,
}

impl Script {
    pub fn last_stage(&self) -> Option<&ScriptStage> {
        self.stages.last()
    }
}

/// Accumulates stages on top of one brine header.
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    params: SimulationParams,
    source: EvaporationSource,
    output_dir: PathBuf,
    text: String,
    stages: Vec<ScriptStage>,
}

impl ScriptBuilder {
    /// Fails with a configuration error when there is neither a usable daily
    /// schedule nor a constant fallback rate.
    pub fn new(brine: &Brine, params: &SimulationParams, output_dir: &Path) -> PhreeqcResult<Self> {
        let source = EvaporationSource::from_params(params)?;
        let mut text = String::new();
        write_header(&mut text, brine);
        Ok(Self {
            params: params.clone(),
            source,
            output_dir: output_dir.to_path_buf(),
            text,
            stages: Vec::new(),
        })
    }

    pub fn evaporation(&self) -> &EvaporationSource {
        &self.source
    }

    pub fn stages(&self) -> &[ScriptStage] {
        &self.stages
    }

    /// Render `stage` and append it to the script.
    pub fn push_stage(&mut self, stage: ReactionStage) -> &ScriptStage {
        let plan = plan_removal(&stage, &self.source, &self.params);
        let result_path = self.output_dir.join(&stage.results_table_id);
        write_stage(&mut self.text, &stage, &plan, &result_path, &self.params);
        debug!(
            stage = %stage.label,
            reaction_id = stage.reaction_id,
            steps = plan.removal.steps(),
            "Appended stage block"
        );
        let index = self.stages.len();
        self.stages.push(ScriptStage {
            stage,
            result_path,
            plan,
        });
        &self.stages[index]
    }

    pub fn build(&self) -> Script {
        Script {
            text: self.text.clone(),
            stages: self.stages.clone(),
        }
    }
}

fn write_header(out: &mut String, brine: &Brine) {
    let _ = writeln!(out, "SOLUTION {BRINE_SOLUTION}");
    for line in &brine.solution_lines {
        let _ = writeln!(out, "    {}", line.trim());
    }
    out.push_str("PHASES\n");
    out.push_str("Water\n");
    out.push_str("    H2O = H2O\n");
    out.push_str("    log_K 100\n");
    let _ = writeln!(out, "SAVE SOLUTION {BRINE_SOLUTION}");
    out.push_str("END\n");
}

fn write_stage(
    out: &mut String,
    stage: &ReactionStage,
    plan: &RemovalPlan,
    result_path: &Path,
    params: &SimulationParams,
) {
    let solution = stage
        .use_solution_tag
        .map_or(BRINE_SOLUTION, |tag| tag.number());
    let _ = writeln!(out, "USE SOLUTION {solution}");
    if let Some(phases) = stage.use_equilibrium_phase_tag {
        let _ = writeln!(out, "USE EQUILIBRIUM_PHASES {}", phases.number());
    }

    let _ = writeln!(out, "REACTION {}", stage.reaction_id);
    out.push_str("    Water\n");
    match &plan.removal {
        Removal::Daily(rates) => {
            let line = rates
                .iter()
                .map(|r| format!("-{r}"))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(out, "    {line}");
        }
        Removal::Aggregate { moles, steps } => {
            let _ = writeln!(out, "    -{moles} mol in {steps} steps");
        }
    }
    out.push_str("INCREMENTAL_REACTIONS true\n");

    if stage.declares_phases()
        && let Some(set) = stage.equilibrium_phase_set_id
    {
        let _ = writeln!(out, "EQUILIBRIUM_PHASES {set}");
        for phase in &params.tracked_phases {
            let _ = writeln!(out, "    {phase} 0.0 0.0");
        }
    }

    out.push_str("SELECTED_OUTPUT\n");
    let _ = writeln!(out, "    -file {}", result_path.display());
    out.push_str("    -selected_out true\n");
    out.push_str("    -step true\n");
    out.push_str("    -ph true\n");
    out.push_str("    -reaction true\n");
    if !params.tracked_phases.is_empty() {
        let _ = writeln!(out, "    -equilibrium_phases {}", params.tracked_phases.join(" "));
    }
    if !params.tracked_totals.is_empty() {
        let _ = writeln!(out, "    -totals {}", params.tracked_totals.join(" "));
    }

    if let Some(tag) = stage.save_solution_tag {
        let _ = writeln!(out, "SAVE SOLUTION {}", tag.number());
    }
    if let Some(tag) = stage.save_equilibrium_phase_tag {
        let _ = writeln!(out, "SAVE EQUILIBRIUM_PHASES {}", tag.number());
    }
    out.push_str("END\n");
}
