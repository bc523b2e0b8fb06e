//! Immutable reference tables handed to the components that need them.

use std::collections::BTreeMap;

use crate::model::MineralProps;

/// Liquid level [m] ponds start at and may not exceed.
pub const LEGACY_MAX_LEVEL_M: f64 = 1.5;

/// Minerals tracked by the cascade plus water.
pub fn default_minerals() -> BTreeMap<String, MineralProps> {
    [
        MineralProps::new("Calcite", 100.0869, 2700.0),
        MineralProps::new("Halite", 58.44, 2170.0),
        MineralProps::new("Gypsum", 136.14, 2320.0),
        MineralProps::new("Water", 18.015_28, 1000.0),
    ]
    .into_iter()
    .map(|m| (m.name.clone(), m))
    .collect()
}

/// Surveyed areas [m²] of the six-pond facility.
pub fn legacy_pond_areas() -> BTreeMap<String, f64> {
    [
        ("Pond 1", 14_168.0),
        ("Pond 2", 14_175.0),
        ("Pond 3", 8_510.5),
        ("Pond 4", 8_970.0),
        ("Pond 5", 7_815.0),
        ("Pond 6", 7_763.5),
    ]
    .into_iter()
    .map(|(name, area)| (name.to_string(), area))
    .collect()
}
