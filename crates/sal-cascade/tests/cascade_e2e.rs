mod common;

use common::{StubSolver, constant_params, plant};
use sal_cascade::{CascadeError, CascadeEvent, run_cascade};
use sal_core::Tag;
use sal_phreeqc::Removal;
use sal_plant::{SimulationParams, TransferPolicy};
use sal_results::{StageKind, Termination};

fn first_primary_at(day: u32) -> common::TriggerFn {
    Box::new(move |s| (s.stage.label == "Pond 1 primary run 0").then_some(day))
}

fn every_primary_at(day: u32) -> common::TriggerFn {
    Box::new(move |s| s.stage.label.starts_with("Pond 1 primary run").then_some(day))
}

#[test]
fn single_transfer_at_day_30() {
    let mut solver = StubSolver::new("single_transfer", first_primary_at(30));
    let mut params = constant_params();
    params.pond_capacities_m3.insert("Pond 2".to_string(), 300.0);
    let plant = plant(3);

    let outcome = run_cascade(&mut solver, &plant, &params, None).unwrap();

    assert_eq!(
        solver.labels(),
        vec![
            ("Pond 1 primary run 0".to_string(), 0),
            ("Pond 1 charge 1".to_string(), 0),
            ("Pond 2 receiving evolve 1".to_string(), 30),
            ("Pond 1 primary run 1".to_string(), 30),
        ]
    );
    let stages_in_script: Vec<usize> = solver.submissions.iter().map(|s| s.stages_in_script).collect();
    assert_eq!(stages_in_script, vec![1, 2, 3, 4]);

    assert_eq!(
        outcome.termination,
        Termination::NoTrigger {
            stage: "Pond 1 primary run 1".to_string()
        }
    );
    let starts = outcome.run.stage_start_days();
    assert_eq!(starts["results1.dat"], 0);
    assert_eq!(starts["results2.dat"], 0);
    assert_eq!(starts["results3.dat"], 30);
    assert_eq!(starts["results4.dat"], 30);

    let charge = &outcome.run.stages[1];
    assert_eq!(charge.kind, StageKind::Charge);
    assert_eq!(charge.step_count, 30);

    assert_eq!(outcome.run.transfers.len(), 1);
    let t = &outcome.run.transfers[0];
    assert_eq!(t.absolute_day, 30);
    assert_eq!(t.destination, "Pond 2");
    assert_eq!(t.allowed_m3, 300.0);
    assert!((t.discarded_m3 - 200.0).abs() < 1e-3);
    assert!(t.remaining_m3 < 500.0);
    assert!(t.extent_check.consistent);

    let pond2 = outcome.run.ponds.iter().find(|p| p.name == "Pond 2").unwrap();
    assert_eq!(pond2.level_history, vec![300.0 / 14_175.0]);
}

#[test]
fn charge_and_continue_thread_saved_tags() {
    let mut solver = StubSolver::new("saved_tags", every_primary_at(30));
    let params = SimulationParams {
        max_stages: 2,
        ..constant_params()
    };

    let outcome = run_cascade(&mut solver, &plant(4), &params, None).unwrap();
    assert_eq!(outcome.termination, Termination::MaxStages { stages: 2 });

    let script = &solver.submissions.last().unwrap().script;
    assert!(script.contains("SAVE SOLUTION 2\nSAVE EQUILIBRIUM_PHASES 1\n"));
    assert!(script.contains("SAVE SOLUTION 3\nSAVE EQUILIBRIUM_PHASES 2\n"));
    // Second charge resumes the first charge's state.
    let charge2 = script.split("USE SOLUTION").nth(5).unwrap();
    assert!(charge2.starts_with(" 2\nUSE EQUILIBRIUM_PHASES 1\n"));
    // Receiving ponds never resume a phase set.
    let receiving2 = script.split("USE SOLUTION").nth(6).unwrap();
    assert!(receiving2.starts_with(" 3\nREACTION"));

    let tags: Vec<(&str, Option<u32>, Option<u32>, Option<u32>, Option<u32>)> = outcome
        .run
        .stages
        .iter()
        .map(|r| {
            (
                r.label.as_str(),
                r.resumed_solution.map(Tag::number),
                r.resumed_phases.map(Tag::number),
                r.saved_solution.map(Tag::number),
                r.saved_phases.map(Tag::number),
            )
        })
        .collect();
    assert_eq!(
        tags,
        vec![
            ("Pond 1 primary run 0", None, None, None, None),
            ("Pond 1 charge 1", None, None, Some(2), Some(1)),
            ("Pond 2 receiving evolve 1", Some(2), None, None, None),
            ("Pond 1 primary run 1", Some(2), Some(1), None, None),
            ("Pond 1 charge 2", Some(2), Some(1), Some(3), Some(2)),
            ("Pond 3 receiving evolve 2", Some(3), None, None, None),
            ("Pond 1 primary run 2", Some(3), Some(2), None, None),
        ]
    );
}

#[test]
fn start_days_never_regress() {
    let mut solver = StubSolver::new("monotonic", every_primary_at(30));
    let params = SimulationParams {
        max_stages: 4,
        ..constant_params()
    };

    let outcome = run_cascade(&mut solver, &plant(6), &params, None).unwrap();

    let primary_starts: Vec<u32> = outcome
        .run
        .stages
        .iter()
        .filter(|s| s.kind == StageKind::PrimaryRun)
        .map(|s| s.absolute_start_day)
        .collect();
    assert_eq!(primary_starts, vec![0, 30, 60, 90, 120]);
    assert!(primary_starts.windows(2).all(|w| w[0] <= w[1]));
    let transfer_days: Vec<u32> = outcome.run.transfers.iter().map(|t| t.absolute_day).collect();
    assert_eq!(transfer_days, vec![30, 60, 90, 120]);
}

#[test]
fn no_trigger_returns_partial_results() {
    let mut solver = StubSolver::new("no_trigger", Box::new(|_| None));
    let outcome = run_cascade(&mut solver, &plant(3), &constant_params(), None).unwrap();

    assert_eq!(solver.submissions.len(), 1);
    assert_eq!(outcome.run.stages.len(), 1);
    assert!(outcome.run.transfers.is_empty());
    assert!(matches!(outcome.termination, Termination::NoTrigger { .. }));
}

#[test]
fn running_out_of_ponds_ends_cascade() {
    let mut solver = StubSolver::new("exhausted", every_primary_at(10));
    let outcome = run_cascade(&mut solver, &plant(2), &constant_params(), None).unwrap();
    assert_eq!(outcome.termination, Termination::PondsExhausted { index: 2 });
    assert_eq!(outcome.run.transfers.len(), 1);
}

#[test]
fn empty_schedule_without_fallback_fails_before_submitting() {
    let mut solver = StubSolver::new("no_source", first_primary_at(30));
    let params = SimulationParams {
        evap_schedule_mol_per_day_l: Some(vec![]),
        evaporation_rate_mol_per_day_l: None,
        ..constant_params()
    };

    let err = run_cascade(&mut solver, &plant(3), &params, None).unwrap_err();
    assert!(matches!(err, CascadeError::Config { .. }));
    assert!(solver.submissions.is_empty());
}

#[test]
fn unimplemented_policy_fails_before_submitting() {
    let mut solver = StubSolver::new("policy", first_primary_at(30));
    let params = SimulationParams {
        transfer_policy: TransferPolicy::HoldInSource,
        ..constant_params()
    };
    let err = run_cascade(&mut solver, &plant(3), &params, None).unwrap_err();
    assert!(err.to_string().contains("hold_in_source"));
    assert!(solver.submissions.is_empty());
}

#[test]
fn stage_failure_carries_partial_run() {
    let mut solver = StubSolver::new("failure", first_primary_at(30)).failing_on(2);
    let err = run_cascade(&mut solver, &plant(3), &constant_params(), None).unwrap_err();

    match &err {
        CascadeError::Stage { stage, partial, .. } => {
            assert_eq!(stage, "Pond 2 receiving evolve 1");
            assert_eq!(partial.stages.len(), 2);
            assert_eq!(partial.transfers.len(), 1);
        }
        other => panic!("expected stage failure, got {other:?}"),
    }
    assert!(err.to_string().contains("Numerical method failed"));
    assert!(err.partial().is_some());
}

#[test]
fn schedule_is_sliced_at_absolute_days() {
    let schedule: Vec<f64> = (0..400).map(|d| 0.1 + f64::from(d) * 1e-4).collect();
    let mut solver = StubSolver::new("schedule", first_primary_at(30));
    let params = SimulationParams {
        evap_schedule_mol_per_day_l: Some(schedule.clone()),
        ..constant_params()
    };

    run_cascade(&mut solver, &plant(3), &params, None).unwrap();

    let receiving = &solver.submissions[2];
    match &receiving.removal {
        Removal::Daily(rates) => {
            assert_eq!(rates.len(), 100);
            assert_eq!(rates[0], schedule[30]);
        }
        other => panic!("expected daily removal, got {other:?}"),
    }
    match &solver.submissions[1].removal {
        Removal::Daily(rates) => assert_eq!(rates.as_slice(), &schedule[..30]),
        other => panic!("expected daily removal, got {other:?}"),
    }
}

#[test]
fn progress_events_follow_the_cascade() {
    let mut solver = StubSolver::new("progress", first_primary_at(30));
    let mut events = Vec::new();
    let mut cb = |e: CascadeEvent| events.push(e);

    run_cascade(&mut solver, &plant(3), &constant_params(), Some(&mut cb)).unwrap();

    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            CascadeEvent::StageSubmitted { .. } => "stage",
            CascadeEvent::TriggerDetected { .. } => "trigger",
            CascadeEvent::TransferApplied { .. } => "transfer",
            CascadeEvent::Finished { .. } => "finished",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["stage", "trigger", "stage", "transfer", "stage", "stage", "finished"]
    );
    assert!(matches!(
        events[1],
        CascadeEvent::TriggerDetected {
            index: 1,
            local_day: 30,
            absolute_day: 30
        }
    ));
}
