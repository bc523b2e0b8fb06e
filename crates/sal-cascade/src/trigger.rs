//! Transfer trigger detection.

use sal_results::{ResultTable, ResultsResult};

/// Position of Halite moles in the solver's default column order.
pub const HALITE_FALLBACK: usize = 17;

/// First saturation of the target mineral within one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trigger {
    /// Floored local day, at least 1.
    pub local_day: u32,
    /// Table row the mineral first exceeded zero in.
    pub row: usize,
    /// Unfloored local day.
    pub raw_local_day: f64,
}

fn phase_fallback(mineral: &str) -> Option<usize> {
    mineral
        .eq_ignore_ascii_case("halite")
        .then_some(HALITE_FALLBACK)
}

/// First row whose cumulative `mineral` moles exceed zero, on the table's
/// own day axis (`step / steps_per_day`). `None` if it never precipitates.
pub fn detect_trigger(
    table: &ResultTable,
    mineral: &str,
    steps_per_day: u32,
) -> ResultsResult<Option<Trigger>> {
    let time = table.time_series()?;
    let moles = table.phase_series(mineral, phase_fallback(mineral))?;
    let per_day = f64::from(steps_per_day.max(1));

    Ok(moles.iter().position(|&m| m > 0.0).map(|row| {
        let raw_local_day = time[row] / per_day;
        Trigger {
            local_day: (raw_local_day.floor().max(1.0)) as u32,
            row,
            raw_local_day,
        }
    }))
}
