//! Cascade state machine.
//!
//! ```text
//! PRIMARY_RUN(k) -> trigger? -> CHARGE_AND_SAVE(k) -> transfer cap
//!     -> RECEIVING_POND_EVOLVE(k) -> PRIMARY_CONTINUE(k) == PRIMARY_RUN(k+1)
//! ```
//!
//! Every stage is its own solver invocation over the accumulated script, so
//! tags saved by earlier stages stay resolvable.

use std::collections::BTreeMap;
use std::path::PathBuf;

use sal_core::{PhaseTag, SolutionTag, charge_tags};
use sal_phreeqc::{ReactionStage, ScriptBuilder, SolverBackend};
use sal_plant::{Plant, Pond, SimulationParams, TransferPolicy};
use sal_results::{ExtentCheck, ResultTable, StageKind, StageRecord, Termination, TransferRecord};
use tracing::{info, warn};

use crate::error::{CascadeError, CascadeResult, StageFailure};
use crate::levels;
use crate::mass_balance::{cap_transfer, reaction_at, remaining_volume};
use crate::progress::CascadeEvent;
use crate::trigger::detect_trigger;

/// Offset between a stage's reaction id and the fresh phase set a
/// receiving pond declares.
const RECEIVING_PHASE_SET_OFFSET: u32 = 100;

/// Everything produced so far.
#[derive(Debug, Clone, Default)]
pub struct CascadeRun {
    pub stages: Vec<StageRecord>,
    /// Parsed tables by table id.
    pub tables: BTreeMap<String, ResultTable>,
    /// Solver output location of every table.
    pub table_paths: BTreeMap<String, PathBuf>,
    pub transfers: Vec<TransferRecord>,
    /// Ponds with their level histories.
    pub ponds: Vec<Pond>,
}

impl CascadeRun {
    /// Absolute start day of every table.
    pub fn stage_start_days(&self) -> BTreeMap<String, u32> {
        self.stages
            .iter()
            .map(|s| (s.table_id.clone(), s.absolute_start_day))
            .collect()
    }

    pub fn table(&self, table_id: &str) -> Option<&ResultTable> {
        self.tables.get(table_id)
    }
}

#[derive(Debug, Clone)]
pub struct CascadeOutcome {
    pub run: CascadeRun,
    pub termination: Termination,
}

/// Run the full cascade against `backend`.
///
/// Configuration problems are reported before anything is submitted. A
/// stage failure returns [`CascadeError::Stage`] carrying the partial run.
pub fn run_cascade(
    backend: &mut dyn SolverBackend,
    plant: &Plant,
    params: &SimulationParams,
    progress: Option<&mut dyn FnMut(CascadeEvent)>,
) -> CascadeResult<CascadeOutcome> {
    let mut cascade = Cascade::new(backend, plant, params, progress)?;
    let termination = cascade.drive()?;
    info!(
        reason = %termination.describe(),
        stages = cascade.run.stages.len(),
        transfers = cascade.run.transfers.len(),
        "Cascade finished"
    );
    cascade.emit(CascadeEvent::Finished {
        termination: termination.clone(),
        stages: cascade.run.stages.len(),
    });
    Ok(CascadeOutcome {
        run: cascade.into_run(),
        termination,
    })
}

struct Cascade<'a, 'p> {
    backend: &'a mut dyn SolverBackend,
    progress: Option<&'p mut dyn FnMut(CascadeEvent)>,
    params: &'a SimulationParams,
    plant: Plant,
    builder: ScriptBuilder,
    primary: String,
    run: CascadeRun,
}

/// Stage description before it gets a table id.
struct StageSpec {
    kind: StageKind,
    pond: String,
    cascade_index: u32,
    days: u32,
    start_day: u32,
    resume: Option<(SolutionTag, Option<PhaseTag>)>,
    save: Option<(SolutionTag, PhaseTag)>,
}

impl<'a, 'p> Cascade<'a, 'p> {
    fn new(
        backend: &'a mut dyn SolverBackend,
        plant: &Plant,
        params: &'a SimulationParams,
        progress: Option<&'p mut dyn FnMut(CascadeEvent)>,
    ) -> CascadeResult<Self> {
        if params.transfer_policy != TransferPolicy::DiscardExcess {
            return Err(CascadeError::config(format!(
                "transfer policy '{}' is not implemented",
                params.transfer_policy.label()
            )));
        }
        if params.nsteps_default_days == 0 {
            return Err(CascadeError::config("nsteps_default_days must be positive"));
        }
        let primary = plant
            .primary_pond()
            .map(|p| p.name.clone())
            .ok_or_else(|| CascadeError::config("plant has no ponds"))?;
        let builder = ScriptBuilder::new(&plant.brine, params, backend.output_dir())
            .map_err(|e| CascadeError::config(e.to_string()))?;

        Ok(Self {
            backend,
            progress,
            params,
            plant: plant.clone(),
            builder,
            primary,
            run: CascadeRun::default(),
        })
    }

    fn emit(&mut self, event: CascadeEvent) {
        if let Some(cb) = self.progress.as_deref_mut() {
            cb(event);
        }
    }

    fn into_run(mut self) -> CascadeRun {
        self.run.ponds = self.plant.ponds;
        self.run
    }

    fn partial(&self) -> Box<CascadeRun> {
        let mut run = self.run.clone();
        run.ponds = self.plant.ponds.clone();
        Box::new(run)
    }

    fn fail(&self, stage: &str, source: impl Into<StageFailure>) -> CascadeError {
        CascadeError::Stage {
            stage: stage.to_string(),
            source: source.into(),
            partial: self.partial(),
        }
    }

    /// Build, submit and read back one stage. Returns its table id.
    fn submit(&mut self, spec: StageSpec) -> CascadeResult<String> {
        let n = self.run.stages.len() as u32 + 1;
        let table_id = format!("results{n}.dat");
        let label = format!("{} {} {}", spec.pond, spec.kind.label(), spec.cascade_index);
        let moles = self.builder.evaporation().moles_over(spec.start_day, spec.days);

        let mut stage = ReactionStage::new(&label, n, spec.days, &table_id)
            .removing(moles)
            .anchored_at(spec.start_day);
        if let Some((solution, phases)) = spec.resume {
            stage = stage.resume(solution, phases);
        }
        if spec.kind == StageKind::ReceivingEvolve {
            stage = stage.with_phase_set(RECEIVING_PHASE_SET_OFFSET + n);
        }
        if let Some((solution, phases)) = spec.save {
            stage = stage.save(solution, phases);
        }

        info!(
            stage = %label,
            reaction_id = n,
            steps = spec.days,
            start_day = spec.start_day,
            "Submitting stage"
        );
        self.emit(CascadeEvent::StageSubmitted {
            table_id: table_id.clone(),
            label: label.clone(),
            kind: spec.kind,
            absolute_start_day: spec.start_day,
            step_count: spec.days,
        });

        let staged = self.builder.push_stage(stage).clone();
        let script = self.builder.build();
        if let Err(e) = self.backend.run(&script) {
            return Err(self.fail(&label, e));
        }
        let table = match ResultTable::from_file(&staged.result_path) {
            Ok(t) => t,
            Err(e) => return Err(self.fail(&label, e)),
        };

        self.run.stages.push(StageRecord {
            table_id: table_id.clone(),
            label,
            kind: spec.kind,
            pond: spec.pond,
            cascade_index: spec.cascade_index,
            reaction_id: n,
            step_count: staged.plan.effective_days,
            steps_per_day: staged.steps_per_day(),
            absolute_start_day: spec.start_day,
            padded_days: staged.plan.padded_days,
            truncated_from: staged.plan.truncated_from,
            resumed_solution: spec.resume.map(|(solution, _)| solution),
            resumed_phases: spec.resume.and_then(|(_, phases)| phases),
            saved_solution: spec.save.map(|(solution, _)| solution),
            saved_phases: spec.save.map(|(_, phases)| phases),
        });
        self.run.tables.insert(table_id.clone(), table);
        self.run.table_paths.insert(table_id.clone(), staged.result_path);
        Ok(table_id)
    }

    fn record(&self, table_id: &str) -> Option<&StageRecord> {
        self.run.stages.iter().find(|s| s.table_id == table_id)
    }

    fn drive(&mut self) -> CascadeResult<Termination> {
        let nsteps = self.params.nsteps_default_days;
        let mineral = self.params.target_mineral.clone();

        // T_1 = 0, fresh brine.
        let mut t_k = 0;
        let mut primary_table = self.submit(StageSpec {
            kind: StageKind::PrimaryRun,
            pond: self.primary.clone(),
            cascade_index: 0,
            days: nsteps,
            start_day: t_k,
            resume: None,
            save: None,
        })?;
        // Tags the primary pond's state at T_k lives under; None is the feed brine.
        let mut primary_state: Option<(SolutionTag, PhaseTag)> = None;

        let mut k: u32 = 1;
        loop {
            let (table, spd, label) = match self.record(&primary_table) {
                Some(r) => (
                    self.run.tables[&primary_table].clone(),
                    r.steps_per_day,
                    r.label.clone(),
                ),
                None => return Err(CascadeError::config("primary stage record missing")),
            };

            let trigger = match detect_trigger(&table, &mineral, spd) {
                Ok(Some(t)) => t,
                Ok(None) => {
                    info!(stage = %label, "No {mineral} saturation, cascade ends");
                    return Ok(Termination::NoTrigger { stage: label });
                }
                Err(e) => return Err(self.fail(&label, e)),
            };

            if k > self.params.max_stages {
                info!(max_stages = self.params.max_stages, "Stage ceiling reached");
                return Ok(Termination::MaxStages {
                    stages: self.params.max_stages,
                });
            }
            let Some(destination) = self.plant.receiving_pond(k as usize).map(|p| p.name.clone())
            else {
                warn!(index = k, "Trigger detected but no receiving pond left");
                return Ok(Termination::PondsExhausted { index: k });
            };
            let Some((save_solution, save_phases)) = charge_tags(k) else {
                return Err(CascadeError::config(format!("no tags for cascade index {k}")));
            };

            let tr_local = trigger.local_day;
            let t_trigger = t_k + tr_local;
            info!(index = k, local_day = tr_local, absolute_day = t_trigger, "{mineral} saturation, transfer advised");
            self.emit(CascadeEvent::TriggerDetected {
                index: k,
                local_day: tr_local,
                absolute_day: t_trigger,
            });

            // CHARGE_AND_SAVE(k)
            let charge = self.submit(StageSpec {
                kind: StageKind::Charge,
                pond: self.primary.clone(),
                cascade_index: k,
                days: tr_local,
                start_day: t_k,
                resume: primary_state.map(|(s, p)| (s, Some(p))),
                save: Some((save_solution, save_phases)),
            })?;
            let charge_label = self.run.stages.last().map(|s| s.label.clone()).unwrap_or_default();
            let target = f64::from(tr_local) * f64::from(spd);
            let charge_table = self.run.tables[&charge].clone();

            let remaining_m3 = match remaining_volume(
                &charge_table,
                target,
                self.params.initial_pond1_m3,
                self.params.liquid_density_g_per_l,
            ) {
                Ok(v) => v,
                Err(e) => return Err(self.fail(&charge_label, e)),
            };
            let extent_check = match (reaction_at(&table, target), reaction_at(&charge_table, target)) {
                (Ok(p), Ok(c)) => ExtentCheck::compare(p, c),
                (Err(e), _) => return Err(self.fail(&label, e)),
                (_, Err(e)) => return Err(self.fail(&charge_label, e)),
            };
            if !extent_check.consistent {
                warn!(
                    index = k,
                    primary_mol = extent_check.primary_mol,
                    charge_mol = extent_check.charge_mol,
                    "Primary and charge stages disagree on water removed at the trigger day"
                );
            }

            let cap = cap_transfer(
                &self.primary,
                &destination,
                remaining_m3,
                &self.params.pond_capacities_m3,
                self.params.transfer_policy,
            )?;
            levels::record_transfer(
                &mut self.plant,
                &self.primary,
                &destination,
                remaining_m3,
                cap.allowed_m3,
                &charge_table,
                &self.params.tracked_phases,
            );
            self.run.transfers.push(TransferRecord {
                index: k,
                source: self.primary.clone(),
                destination: destination.clone(),
                absolute_day: t_trigger,
                remaining_m3,
                allowed_m3: cap.allowed_m3,
                discarded_m3: cap.discarded_m3,
                extent_check,
            });
            self.emit(CascadeEvent::TransferApplied {
                index: k,
                source: self.primary.clone(),
                destination: destination.clone(),
                allowed_m3: cap.allowed_m3,
                discarded_m3: cap.discarded_m3,
            });

            // RECEIVING_POND_EVOLVE(k): saved solution, fresh phase set.
            self.submit(StageSpec {
                kind: StageKind::ReceivingEvolve,
                pond: destination,
                cascade_index: k,
                days: nsteps,
                start_day: t_trigger,
                resume: Some((save_solution, None)),
                save: None,
            })?;

            // PRIMARY_CONTINUE(k) becomes PRIMARY_RUN(k+1).
            primary_table = self.submit(StageSpec {
                kind: StageKind::PrimaryRun,
                pond: self.primary.clone(),
                cascade_index: k,
                days: nsteps,
                start_day: t_trigger,
                resume: Some((save_solution, Some(save_phases))),
                save: None,
            })?;
            primary_state = Some((save_solution, save_phases));
            t_k = t_trigger;
            k += 1;
        }
    }
}
