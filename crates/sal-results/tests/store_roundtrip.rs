use sal_results::*;
use std::fs;
use std::path::PathBuf;

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sal_results_{name}"));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn manifest(run_id: &str, timestamp: &str) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        timestamp: timestamp.to_string(),
        solver_version: "phreeqc-3.8.6/phreeqc.dat".to_string(),
        target_mineral: "Halite".to_string(),
        tracked_phases: vec!["Calcite".to_string(), "Gypsum".to_string(), "Halite".to_string()],
        termination: Termination::NoTrigger {
            stage: "Pond 1 primary run 2".to_string(),
        },
        stages: vec![StageRecord {
            table_id: "results1.dat".to_string(),
            label: "Pond 1 primary run 1".to_string(),
            kind: StageKind::PrimaryRun,
            pond: "Pond 1".to_string(),
            cascade_index: 0,
            reaction_id: 1,
            step_count: 100,
            steps_per_day: 1,
            absolute_start_day: 0,
            padded_days: 0,
            truncated_from: None,
            resumed_solution: None,
            resumed_phases: None,
            saved_solution: None,
            saved_phases: None,
        }],
        transfers: vec![TransferRecord {
            index: 1,
            source: "Pond 1".to_string(),
            destination: "Pond 2".to_string(),
            absolute_day: 30,
            remaining_m3: 500.0,
            allowed_m3: 300.0,
            discarded_m3: 200.0,
            extent_check: ExtentCheck::compare(8.19, 8.19),
        }],
    }
}

#[test]
fn save_and_load_run_with_tables() {
    let dir = scratch("roundtrip");
    let table_path = dir.join("results1.dat");
    fs::write(&table_path, "step\tpH\treaction\tHalite\n1\t7.0\t-0.273\t0\n2\t7.0\t-0.546\t0.01\n").unwrap();

    let store = RunStore::for_work_dir(&dir).unwrap();
    let m = manifest("abc123", "2026-10-16T12:00:00+00:00");
    store.save_run(&m, &[table_path]).unwrap();

    assert!(store.has_run("abc123"));
    assert_eq!(store.load_manifest("abc123").unwrap(), m);
    assert_eq!(store.resolve_id("abc").unwrap(), "abc123");

    let table = store.load_table("abc123", "results1.dat").unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.final_phase_moles("Halite"), 0.01);

    store.delete_run("abc123").unwrap();
    assert!(matches!(
        store.load_manifest("abc123"),
        Err(ResultsError::RunNotFound { .. })
    ));
}

#[test]
fn list_runs_newest_first() {
    let dir = scratch("list");
    let store = RunStore::new(dir.join("runs")).unwrap();
    store.save_run(&manifest("run1", "2026-10-16T12:00:00+00:00"), &[]).unwrap();
    store.save_run(&manifest("run2", "2026-10-16T13:00:00+00:00"), &[]).unwrap();

    let runs = store.list_runs().unwrap();
    let ids: Vec<&str> = runs.iter().map(|m| m.run_id.as_str()).collect();
    assert_eq!(ids, vec!["run2", "run1"]);
    assert!(store.resolve_id("run").is_err());
    assert_eq!(runs[0].total_discarded_m3(), 200.0);
}

#[test]
fn charge_tags_survive_manifest_roundtrip() {
    let dir = scratch("tags");
    let store = RunStore::for_work_dir(&dir).unwrap();
    let mut m = manifest("tags1", "2026-10-16T12:00:00+00:00");
    let mut charge = m.stages[0].clone();
    charge.table_id = "results2.dat".to_string();
    charge.label = "Pond 1 charge 1".to_string();
    charge.kind = StageKind::Charge;
    charge.cascade_index = 1;
    charge.saved_solution = sal_core::Tag::new(2);
    charge.saved_phases = sal_core::Tag::new(1);
    m.stages.push(charge);
    store.save_run(&m, &[]).unwrap();

    let json = fs::read_to_string(dir.join("runs/tags1/manifest.json")).unwrap();
    assert!(json.contains("\"saved_solution\": 2"));
    assert!(!json.contains("resumed_solution"));

    let loaded = store.load_manifest("tags1").unwrap();
    assert_eq!(loaded.stages[1].saved_solution.map(|t| t.number()), Some(2));
    assert_eq!(loaded.stages[1].saved_phases.map(|t| t.number()), Some(1));
    assert_eq!(loaded, m);
}
