#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use sal_phreeqc::{PhreeqcError, PhreeqcResult, Removal, Script, ScriptStage, SolverBackend};
use sal_plant::{Brine, Plant, Pond, SimulationParams, reference};

pub type TriggerFn = Box<dyn Fn(&ScriptStage) -> Option<u32>>;

#[derive(Debug, Clone)]
pub struct Submission {
    pub label: String,
    pub start_day: u32,
    pub removal: Removal,
    pub stages_in_script: usize,
    pub script: String,
}

/// Writes a synthetic table for the newest stage of every script. The
/// trigger closure picks the step at which Halite first appears.
pub struct StubSolver {
    output_dir: PathBuf,
    trigger: TriggerFn,
    fail_on: Option<usize>,
    pub submissions: Vec<Submission>,
}

impl StubSolver {
    pub fn new(name: &str, trigger: TriggerFn) -> Self {
        let output_dir = std::env::temp_dir().join(format!("sal_cascade_{name}"));
        let _ = fs::remove_dir_all(&output_dir);
        fs::create_dir_all(&output_dir).unwrap();
        Self {
            output_dir,
            trigger,
            fail_on: None,
            submissions: Vec::new(),
        }
    }

    /// Fail the `n`-th invocation (0-based).
    pub fn failing_on(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    pub fn labels(&self) -> Vec<(String, u32)> {
        self.submissions
            .iter()
            .map(|s| (s.label.clone(), s.start_day))
            .collect()
    }
}

fn write_table(path: &Path, removal: &Removal, trigger_step: Option<u32>) {
    let increments: Vec<f64> = match removal {
        Removal::Daily(rates) => rates.clone(),
        Removal::Aggregate { moles, steps } => vec![moles / f64::from(*steps); *steps as usize],
    };
    let mut out = String::from("step\tpH\treaction\tCalcite\td_Calcite\tGypsum\td_Gypsum\tHalite\td_Halite\t\n");
    let mut cumulative = 0.0;
    for (i, inc) in increments.iter().enumerate() {
        let step = i as u32 + 1;
        cumulative += inc;
        let halite = match trigger_step {
            Some(t) if step >= t => 0.01 * f64::from(step - t + 1),
            _ => 0.0,
        };
        out.push_str(&format!(
            "{step}\t7.0\t{}\t0.001\t0\t0.002\t0\t{halite}\t0\t\n",
            -cumulative
        ));
    }
    fs::write(path, out).unwrap();
}

impl SolverBackend for StubSolver {
    fn name(&self) -> &str {
        "stub"
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn run(&mut self, script: &Script) -> PhreeqcResult<()> {
        let staged = script.last_stage().ok_or_else(|| PhreeqcError::Execution {
            status: None,
            message: "empty script".into(),
        })?;
        if self.fail_on == Some(self.submissions.len()) {
            return Err(PhreeqcError::Execution {
                status: Some(1),
                message: "ERROR: Numerical method failed".into(),
            });
        }
        self.submissions.push(Submission {
            label: staged.stage.label.clone(),
            start_day: staged.stage.schedule_absolute_start_day.unwrap_or(0),
            removal: staged.plan.removal.clone(),
            stages_in_script: script.stages.len(),
            script: script.text.clone(),
        });
        let trigger = (self.trigger)(staged);
        write_table(&staged.result_path, &staged.plan.removal, trigger);
        Ok(())
    }
}

pub fn plant(ponds: usize) -> Plant {
    let areas = reference::legacy_pond_areas();
    Plant {
        ponds: (1..=ponds)
            .map(|i| {
                let name = format!("Pond {i}");
                Pond::new(&name, areas.get(&name).copied().unwrap_or(1.0), 1.5, 1.5)
            })
            .collect(),
        brine: Brine::from_lines(["temp 25", "pH 7.2", "units mg/l", "Na 10700", "Cl 19300"]),
        minerals: reference::default_minerals(),
    }
}

pub fn constant_params() -> SimulationParams {
    SimulationParams {
        evap_schedule_mol_per_day_l: None,
        evaporation_rate_mol_per_day_l: Some(0.273),
        initial_pond1_m3: 500.0,
        ..SimulationParams::default()
    }
}
