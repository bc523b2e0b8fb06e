//! Query helpers for stored runs.

use std::path::Path;

use sal_results::{PondTimeline, ResultTable, RunManifest, RunStore, StageKind, Termination};

use crate::error::{AppError, AppResult};

/// Per-pond slice of a run.
#[derive(Debug, Clone)]
pub struct PondSummary {
    pub pond: String,
    pub first_day: u32,
    pub last_day: u32,
    /// Target mineral moles at the end of the pond's last stage.
    pub final_target_moles: f64,
    pub description: String,
}

/// Transfer summary of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub termination: Termination,
    pub ponds: Vec<PondSummary>,
    pub total_days: u32,
    pub transfer_count: usize,
    pub discarded_m3: f64,
    /// Transfers whose primary and charge extents disagreed.
    pub extent_mismatches: usize,
}

pub fn get_run_summary(store: &RunStore, run_id: &str) -> AppResult<RunSummary> {
    let manifest = store.load_manifest(run_id)?;

    let mut ponds = Vec::new();
    for pond in manifest.ponds() {
        let stages = manifest.pond_stages(pond);
        let (Some(first), Some(last)) = (stages.first(), stages.last()) else {
            continue;
        };
        let table = store.load_table(run_id, &last.table_id)?;
        let description = match first.kind {
            StageKind::ReceivingEvolve => format!("receives transfer {}", first.cascade_index),
            _ => format!("primary concentrator, {} runs", stages.len()),
        };
        ponds.push(PondSummary {
            pond: pond.to_string(),
            first_day: first.absolute_start_day,
            last_day: last.absolute_end_day(),
            final_target_moles: table.final_phase_moles(&manifest.target_mineral),
            description,
        });
    }

    Ok(RunSummary {
        run_id: manifest.run_id.clone(),
        termination: manifest.termination.clone(),
        total_days: manifest
            .stages
            .iter()
            .map(|s| s.absolute_end_day())
            .max()
            .unwrap_or(0),
        transfer_count: manifest.transfers.len(),
        discarded_m3: manifest.total_discarded_m3(),
        extent_mismatches: manifest
            .transfers
            .iter()
            .filter(|t| !t.extent_check.consistent)
            .count(),
        ponds,
    })
}

/// Stitch a pond's stage tables onto absolute days.
pub fn pond_timeline(store: &RunStore, manifest: &RunManifest, pond: &str) -> AppResult<PondTimeline> {
    let stages = manifest.pond_stages(pond);
    if stages.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "run {} has no stages for {pond}",
            manifest.run_id
        )));
    }
    let tables: Vec<ResultTable> = stages
        .iter()
        .map(|s| store.load_table(&manifest.run_id, &s.table_id))
        .collect::<Result<_, _>>()?;
    let pairs: Vec<_> = stages.iter().copied().zip(tables.iter()).collect();
    Ok(PondTimeline::build(pond, &pairs, &manifest.tracked_phases)?)
}

/// Export a pond's timeline as CSV, to `out` if given. Returns the CSV text.
pub fn export_timeline(store: &RunStore, run_id: &str, pond: &str, out: Option<&Path>) -> AppResult<String> {
    let run_id = store.resolve_id(run_id)?;
    let manifest = store.load_manifest(&run_id)?;
    let csv = pond_timeline(store, &manifest, pond)?.to_csv();
    if let Some(path) = out {
        std::fs::write(path, &csv)?;
    }
    Ok(csv)
}
