//! Upstream input files: brine, pond capacity table, daily evaporation table.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::{ResolvedPaths, RunConfig};
use crate::model::{Brine, Plant, Pond, SimulationParams};
use crate::reference::{LEGACY_MAX_LEVEL_M, default_minerals, legacy_pond_areas};
use crate::validate::{validate_params, validate_plant};
use crate::{PlantError, PlantResult};

/// Everything the cascade needs, loaded and validated.
#[derive(Debug, Clone)]
pub struct PlantInputs {
    pub plant: Plant,
    pub params: SimulationParams,
}

/// `"P3"`, `"pond_3"`, `"Pond 3"` all become `"Pond 3"`; names without a
/// number are trimmed and title-cased.
pub fn canonical_pond_name(raw: &str) -> String {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if let Ok(n) = digits.parse::<u32>() {
        return format!("Pond {n}");
    }
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a tab-separated `name<TAB>m3` table. Rows whose volume is not
/// numeric (header rows such as `volume<TAB>m3`) are skipped.
pub fn parse_pond_table(content: &str) -> Vec<(String, f64)> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let name = fields.next()?.trim();
            let volume = fields.next()?.trim().parse::<f64>().ok()?;
            Some((canonical_pond_name(name), volume))
        })
        .collect()
}

pub fn load_pond_table(path: &Path) -> PlantResult<Vec<(String, f64)>> {
    if !path.exists() {
        return Err(PlantError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let rows = parse_pond_table(&std::fs::read_to_string(path)?);
    if rows.is_empty() {
        return Err(PlantError::Parse {
            path: path.to_path_buf(),
            line: 1,
            message: "no pond rows with a numeric volume".to_string(),
        });
    }
    Ok(rows)
}

fn normalize_header(h: &str) -> String {
    h.trim()
        .trim_matches('"')
        .to_lowercase()
        .replace([' ', '-'], "_")
}

const RATE_HEADERS: [&str; 3] = [
    "evap_mol_day_l",
    "mol_h2o_per_day_per_liter",
    "mol_h2o_per_day_per_l",
];
const DAY_HEADERS: [&str; 3] = ["day", "day_index", "dia"];

/// Parse a comma-separated daily evaporation table into rates ordered by day.
///
/// Returns `Err((line, message))` with a 1-based line number.
pub fn parse_evaporation_table(content: &str) -> Result<Vec<f64>, (usize, String)> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty());
    let (_, header) = lines
        .next()
        .ok_or_else(|| (1, "empty evaporation table".to_string()))?;
    let headers: Vec<String> = header.split(',').map(normalize_header).collect();

    let rate_idx = headers
        .iter()
        .position(|h| RATE_HEADERS.contains(&h.as_str()))
        .ok_or_else(|| {
            (
                1,
                format!("no evaporation rate column (expected one of {RATE_HEADERS:?})"),
            )
        })?;
    let day_idx = headers
        .iter()
        .position(|h| DAY_HEADERS.contains(&h.as_str()));

    let mut rows: Vec<(f64, f64)> = Vec::new();
    for (i, line) in lines {
        let fields: Vec<&str> = line.split(',').collect();
        let parse = |idx: usize, what: &str| -> Result<f64, (usize, String)> {
            fields
                .get(idx)
                .and_then(|f| f.trim().trim_matches('"').parse::<f64>().ok())
                .ok_or_else(|| (i + 1, format!("invalid {what}")))
        };
        let rate = parse(rate_idx, "evaporation rate")?;
        let day = match day_idx {
            Some(idx) => parse(idx, "day index")?,
            None => rows.len() as f64,
        };
        rows.push((day, rate));
    }

    rows.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(rows.into_iter().map(|(_, rate)| rate).collect())
}

pub fn load_evaporation_schedule(path: &Path) -> PlantResult<Vec<f64>> {
    if !path.exists() {
        return Err(PlantError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    let schedule = parse_evaporation_table(&content).map_err(|(line, message)| {
        PlantError::Parse {
            path: path.to_path_buf(),
            line,
            message,
        }
    })?;

    if let (Some(min), Some(max)) = (
        schedule.iter().copied().reduce(f64::min),
        schedule.iter().copied().reduce(f64::max),
    ) {
        let avg = schedule.iter().sum::<f64>() / schedule.len() as f64;
        info!(
            days = schedule.len(),
            avg, min, max, "Loaded evaporation schedule from {}",
            path.display()
        );
    }
    Ok(schedule)
}

pub fn load_brine(path: &Path) -> PlantResult<Brine> {
    Brine::from_file(path)
}

/// Build the plant and the run parameters from a configuration.
pub fn load_inputs(config: &RunConfig, paths: &ResolvedPaths) -> PlantResult<PlantInputs> {
    let brine = load_brine(&paths.brine_data)?;
    let table = load_pond_table(&paths.ponds_data)?;

    let legacy_areas = legacy_pond_areas();
    let ponds: Vec<Pond> = table
        .iter()
        .map(|(name, _)| {
            let area = config
                .pond_areas_m2
                .get(name)
                .or_else(|| legacy_areas.get(name))
                .copied()
                .unwrap_or(1.0);
            Pond::new(name, area, LEGACY_MAX_LEVEL_M, LEGACY_MAX_LEVEL_M)
        })
        .collect();
    let capacities: BTreeMap<String, f64> = table.iter().cloned().collect();

    let mut params = config.params.apply(SimulationParams::default());
    if params.pond_capacities_m3.is_empty() {
        params.pond_capacities_m3 = capacities;
    }
    if config.params.initial_pond1_m3.is_none()
        && let Some((_, primary_m3)) = table.first()
    {
        params.initial_pond1_m3 = *primary_m3;
    }

    match &paths.evaporation_schedule {
        Some(path) if path.exists() => {
            params.evap_schedule_mol_per_day_l = Some(load_evaporation_schedule(path)?);
        }
        Some(path) => {
            warn!(
                "Evaporation schedule {} not found, using constant rate",
                path.display()
            );
        }
        None => debug!("No evaporation schedule configured, using constant rate"),
    }

    let plant = Plant {
        ponds,
        brine,
        minerals: default_minerals(),
    };
    validate_plant(&plant)?;
    validate_params(&params)?;

    Ok(PlantInputs { plant, params })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names() {
        assert_eq!(canonical_pond_name("P3"), "Pond 3");
        assert_eq!(canonical_pond_name("pond_12"), "Pond 12");
        assert_eq!(canonical_pond_name("  Pond 1 "), "Pond 1");
        assert_eq!(canonical_pond_name("north basin"), "North Basin");
    }

    #[test]
    fn pond_table_skips_header_rows() {
        let rows = parse_pond_table("volume\tm3\nPond 1\t21252\nP2\t21262.5\n\n");
        assert_eq!(
            rows,
            vec![
                ("Pond 1".to_string(), 21_252.0),
                ("Pond 2".to_string(), 21_262.5)
            ]
        );
    }

    #[test]
    fn evaporation_table_orders_by_day() {
        let csv = "day,evap_mol_day_L\n2,0.30\n0,0.10\n1,0.20\n";
        assert_eq!(parse_evaporation_table(csv).unwrap(), vec![0.10, 0.20, 0.30]);
    }

    #[test]
    fn evaporation_table_accepts_descriptive_header() {
        let csv = "date,mol H2O per day per liter\n2025-08-01,0.25\n2025-08-02,0.26\n";
        assert_eq!(parse_evaporation_table(csv).unwrap(), vec![0.25, 0.26]);
    }

    #[test]
    fn evaporation_table_reports_bad_line() {
        let csv = "day,evap_mol_day_L\n0,0.1\n1,abc\n";
        let (line, msg) = parse_evaporation_table(csv).unwrap_err();
        assert_eq!(line, 3);
        assert!(msg.contains("evaporation rate"));
    }

    #[test]
    fn evaporation_table_requires_rate_column() {
        assert!(parse_evaporation_table("day,radiation\n0,200\n").is_err());
    }
}
