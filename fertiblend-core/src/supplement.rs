//! Micronutrient coverage and automatic supplementation.

use crate::{
    composition::FertilizerComposition,
    elements::MICRONUTRIENTS,
    registry::CompositionRegistry,
    ConcentrationMap,
};
use serde::Serialize;
use tracing::info;

/// Dosage (g/L) at which a source's deliverable amount is judged.
pub const REFERENCE_DOSAGE: f64 = 2.0;
/// Needs at or below this (mg/L) are ignored.
const MIN_NEED: f64 = 0.001;
/// Sources at or below this mass fraction (%) do not count.
const MIN_SOURCE_CONTENT: f64 = 0.1;
/// A source delivering less than this share of the need triggers a supplement.
const MIN_COVERAGE: f64 = 0.5;

const SUPPLEMENT_SUFFIX: &str = "[required supplement]";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MicronutrientCoverage {
    pub element: String,
    /// Target minus water, floored at 0 (mg/L).
    pub need: f64,
    pub best_source: Option<String>,
    pub best_content_percent: f64,
    /// What the best source delivers at [`REFERENCE_DOSAGE`] (mg/L).
    pub max_deliverable: f64,
    pub coverage_percent: f64,
    pub needs_supplement: bool,
}

#[derive(Debug, Clone)]
pub struct SupplementOutcome {
    pub fertilizers: Vec<FertilizerComposition>,
    pub coverage: Vec<MicronutrientCoverage>,
    pub added: Vec<String>,
}

pub fn analyze_coverage(
    fertilizers: &[FertilizerComposition],
    targets: &ConcentrationMap,
    water: &ConcentrationMap,
) -> Vec<MicronutrientCoverage> {
    MICRONUTRIENTS
        .iter()
        .filter(|element| targets.contains_key(**element))
        .map(|element| {
            let target = targets.get(*element).copied().unwrap_or(0.0);
            let need = (target - water.get(*element).copied().unwrap_or(0.0)).max(0.0);
            let best = fertilizers
                .iter()
                .filter(|f| f.mass_fraction(element) > MIN_SOURCE_CONTENT)
                .max_by(|a, b| a.mass_fraction(element).total_cmp(&b.mass_fraction(element)));
            let (best_source, best_content_percent, max_deliverable) = match best {
                Some(source) => (
                    Some(source.name().to_string()),
                    source.mass_fraction(element),
                    REFERENCE_DOSAGE * source.contribution_factor(element),
                ),
                None => (None, 0.0, 0.0),
            };
            let coverage_percent = if need > 0.0 {
                (max_deliverable / need * 100.0).min(100.0)
            } else {
                100.0
            };
            let needs_supplement =
                need > MIN_NEED && (best_source.is_none() || max_deliverable < MIN_COVERAGE * need);
            MicronutrientCoverage {
                element: element.to_string(),
                need,
                best_source,
                best_content_percent,
                max_deliverable,
                coverage_percent,
                needs_supplement,
            }
        })
        .collect()
}

/// Appends the registry's primary source for every uncovered micronutrient.
///
/// Added salts are renamed with a `[required supplement]` suffix and flagged. A micronutrient
/// without a primary source in the registry is left uncovered.
pub fn supplement_micronutrients(
    registry: &CompositionRegistry,
    mut fertilizers: Vec<FertilizerComposition>,
    targets: &ConcentrationMap,
    water: &ConcentrationMap,
) -> SupplementOutcome {
    let coverage = analyze_coverage(&fertilizers, targets, water);
    let mut added = Vec::new();
    for gap in coverage.iter().filter(|c| c.needs_supplement) {
        let Some(entry) = registry.primary_source(&gap.element) else {
            continue;
        };
        let name = format!("{} {}", entry.composition.name(), SUPPLEMENT_SUFFIX);
        if fertilizers.iter().any(|f| f.name() == name) {
            continue;
        }
        info!(element = %gap.element, need = gap.need, supplement = %name, "Adding micronutrient supplement");
        fertilizers.push(entry.composition.clone().with_name(&name).as_required_supplement());
        added.push(name);
    }
    SupplementOutcome {
        fertilizers,
        coverage,
        added,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        composition::test_salt,
        defaults::{default_targets, default_water},
    };

    fn macro_catalog() -> Vec<FertilizerComposition> {
        vec![
            test_salt("Calcium Nitrate", 98.0, &[("Ca", 19.0)], &[("N", 15.5)]),
            test_salt("Potassium Nitrate", 98.0, &[("K", 38.67)], &[("N", 13.85)]),
        ]
    }

    #[test]
    fn adds_every_missing_micronutrient() {
        let registry = CompositionRegistry::standard().unwrap();
        let outcome = supplement_micronutrients(&registry, macro_catalog(), &default_targets(), &default_water());
        assert_eq!(outcome.added.len(), 6);
        assert_eq!(outcome.fertilizers.len(), 8);
        let boron = outcome
            .fertilizers
            .iter()
            .find(|f| f.supplies("B"))
            .unwrap();
        assert!(boron.is_required_supplement());
        assert!(boron.name().ends_with("[required supplement]"));
    }

    #[test]
    fn strong_source_needs_no_supplement() {
        let registry = CompositionRegistry::standard().unwrap();
        let mut catalog = macro_catalog();
        catalog.push(test_salt("Iron Chelate", 100.0, &[("Fe", 13.0)], &[]));
        let outcome = supplement_micronutrients(&registry, catalog, &default_targets(), &default_water());
        let iron = outcome.coverage.iter().find(|c| c.element == "Fe").unwrap();
        assert!(!iron.needs_supplement);
        assert_eq!(iron.best_source.as_deref(), Some("Iron Chelate"));
        assert!((iron.max_deliverable - 260.0).abs() < 1e-9);
        assert_eq!(outcome.added.len(), 5);
    }

    #[test]
    fn trace_content_does_not_count_as_a_source() {
        let catalog = vec![test_salt("Dusty Salt", 100.0, &[("Fe", 0.05)], &[])];
        let targets: ConcentrationMap = [("Fe".to_string(), 2.0)].into_iter().collect();
        let coverage = analyze_coverage(&catalog, &targets, &ConcentrationMap::new());
        assert_eq!(coverage.len(), 1);
        assert!(coverage[0].best_source.is_none());
        assert!(coverage[0].needs_supplement);
    }

    #[test]
    fn water_covering_the_target_needs_nothing() {
        let targets: ConcentrationMap = [("Mo".to_string(), 0.05)].into_iter().collect();
        let water: ConcentrationMap = [("Mo".to_string(), 0.06)].into_iter().collect();
        let coverage = analyze_coverage(&[], &targets, &water);
        assert_eq!(coverage[0].need, 0.0);
        assert!(!coverage[0].needs_supplement);
    }
}
