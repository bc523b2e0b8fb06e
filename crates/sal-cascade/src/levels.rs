//! Liquid and settled-solids level bookkeeping per pond.

use sal_plant::Plant;
use sal_results::ResultTable;

/// Settled-solids thickness [m] from the final cumulative moles (per litre)
/// of every phase in `phases` that has reference properties.
pub fn solids_level_m(plant: &Plant, table: &ResultTable, phases: &[String], volume_m3: f64, area_m2: f64) -> f64 {
    if area_m2 <= 0.0 {
        return 0.0;
    }
    let volume_l = volume_m3 * 1000.0;
    let solids_m3: f64 = phases
        .iter()
        .filter_map(|p| plant.mineral(p).ok())
        .map(|m| m.solid_volume_m3(table.final_phase_moles(&m.name) * volume_l))
        .sum();
    solids_m3 / area_m2
}

/// Record levels on both sides of a transfer: the source before the brine
/// leaves, the destination after it arrives with a fresh phase set.
pub fn record_transfer(
    plant: &mut Plant,
    source: &str,
    destination: &str,
    remaining_m3: f64,
    allowed_m3: f64,
    charge_table: &ResultTable,
    phases: &[String],
) {
    let source_solids = plant
        .get_pond(source)
        .map(|p| solids_level_m(plant, charge_table, phases, remaining_m3, p.area_m2))
        .unwrap_or(0.0);

    if let Ok(pond) = plant.get_pond_mut(source) {
        let level = pond.level_for_volume(remaining_m3);
        pond.record_levels(level, source_solids);
    }
    if let Ok(pond) = plant.get_pond_mut(destination) {
        let level = pond.level_for_volume(allowed_m3);
        pond.record_levels(level, 0.0);
    }
}
