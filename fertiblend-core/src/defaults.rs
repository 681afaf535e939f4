//! Fallback inputs used when no crop profile or water analysis is available.

use crate::ConcentrationMap;

const DEFAULT_TARGETS: [(&str, f64); 12] = [
    ("N", 150.0),
    ("P", 50.0),
    ("K", 200.0),
    ("Ca", 180.0),
    ("Mg", 50.0),
    ("S", 80.0),
    ("Fe", 2.0),
    ("Mn", 0.5),
    ("Zn", 0.3),
    ("Cu", 0.1),
    ("B", 0.5),
    ("Mo", 0.05),
];

const DEFAULT_WATER: [(&str, f64); 12] = [
    ("Ca", 20.0),
    ("K", 5.0),
    ("N", 2.0),
    ("P", 1.0),
    ("Mg", 8.0),
    ("S", 5.0),
    ("Fe", 0.1),
    ("Mn", 0.05),
    ("Zn", 0.02),
    ("Cu", 0.01),
    ("B", 0.1),
    ("Mo", 0.001),
];

/// General-purpose 12-element target profile (mg/L).
pub fn default_targets() -> ConcentrationMap {
    to_map(&DEFAULT_TARGETS)
}

/// Typical low-mineral irrigation water (mg/L).
pub fn default_water() -> ConcentrationMap {
    to_map(&DEFAULT_WATER)
}

fn to_map(pairs: &[(&str, f64)]) -> ConcentrationMap {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}
