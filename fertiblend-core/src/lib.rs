//! Fertigation nutrient-solution design.
//!
//! The crate turns a fertilizer catalog, a water analysis and per-element target
//! concentrations into per-fertilizer dosages, then verifies the resulting solution and
//! explains any residual deviation. Entry point is [`calculation::CalculationBuilder`].

pub mod analysis;
pub mod calculation;
pub mod caps;
pub mod composition;
pub mod defaults;
pub mod dosage;
pub mod elements;
pub mod error;
pub mod greedy;
pub mod logger;
pub mod optimizer;
pub mod registry;
pub mod settings;
pub mod severity;
pub mod snapshot;
pub mod supplement;
pub mod units;
pub mod verification;

pub use fertiblend_schemas::solution::ConcentrationMap;
