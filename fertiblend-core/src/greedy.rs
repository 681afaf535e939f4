//! Deterministic single-pass dosage assignment.
//!
//! Nutrients are visited in a fixed priority order. For each one the best source closes the
//! whole remaining gap, and its side contributions are deducted from every other element.
//! There is no backtracking, so the result is not optimal, but it is cheap and always
//! identical for identical inputs.

use crate::{
    composition::FertilizerComposition,
    dosage::DosageVector,
    elements::{MACRONUTRIENTS, MICRONUTRIENTS},
    settings::SolverSettings,
    ConcentrationMap,
};
use tracing::{debug, info};

const TIE_EPSILON: f64 = 1e-9;

/// Preferred salt per element, by name or formula keyword.
const DEFAULT_SALTS: [(&str, &[&str]); 12] = [
    ("P", &["monopotassium phosphate", "kh2po4", "fosfato monopotasico"]),
    ("Ca", &["calcium nitrate", "ca(no3)2", "nitrato de calcio"]),
    ("K", &["potassium nitrate", "kno3", "nitrato de potasio"]),
    ("Mg", &["magnesium sulfate", "mgso4", "sulfato de magnesio"]),
    ("N", &["calcium nitrate", "ca(no3)2", "nitrato de calcio"]),
    ("S", &["magnesium sulfate", "mgso4", "sulfato de magnesio"]),
    ("Fe", &["iron edta", "fe-edta", "iron chelate"]),
    ("Mn", &["manganese sulfate", "mnso4"]),
    ("Zn", &["zinc sulfate", "znso4"]),
    ("Cu", &["copper sulfate", "cuso4"]),
    ("B", &["boric acid", "h3bo3"]),
    ("Mo", &["sodium molybdate", "na2moo4"]),
];

pub struct GreedySolver<'a> {
    settings: &'a SolverSettings,
}

impl<'a> GreedySolver<'a> {
    pub fn new(settings: &'a SolverSettings) -> Self {
        Self { settings }
    }

    pub fn solve(
        &self,
        targets: &ConcentrationMap,
        water: &ConcentrationMap,
        fertilizers: &[FertilizerComposition],
    ) -> DosageVector {
        let mut remaining: ConcentrationMap = targets
            .iter()
            .map(|(element, target)| {
                let baseline = water.get(element).copied().unwrap_or(0.0);
                (element.clone(), (target - baseline).max(0.0))
            })
            .collect();
        let mut dosages = DosageVector::zeroed(fertilizers);

        for element in MACRONUTRIENTS {
            self.assign(element, None, &mut remaining, fertilizers, &mut dosages);
        }
        for element in MICRONUTRIENTS {
            self.assign(
                element,
                Some(self.settings.micro_dosage_cap),
                &mut remaining,
                fertilizers,
                &mut dosages,
            );
        }

        dosages.prune(
            fertilizers,
            self.settings.macro_significance,
            self.settings.micro_significance,
        );
        info!(
            active = dosages.active_count(),
            total_g_per_l = dosages.total(),
            "Greedy dosage assignment complete"
        );
        dosages
    }

    fn assign(
        &self,
        element: &str,
        cap: Option<f64>,
        remaining: &mut ConcentrationMap,
        fertilizers: &[FertilizerComposition],
        dosages: &mut DosageVector,
    ) {
        let need = remaining.get(element).copied().unwrap_or(0.0);
        if need <= 0.0 {
            return;
        }
        let Some(source) = best_source(element, fertilizers) else {
            debug!(element, need, "No fertilizer supplies element; gap left open");
            return;
        };

        let factor = source.contribution_factor(element);
        let mut dosage = need / factor;
        if let Some(cap) = cap {
            dosage = dosage.min(cap);
        }
        debug!(element, fertilizer = source.name(), dosage, "Greedy assignment");
        dosages.add(source.name(), dosage);

        for (other, delivered) in source.contributions_at(dosage) {
            if let Some(left) = remaining.get_mut(&other) {
                *left = (*left - delivered).max(0.0);
            }
        }
    }
}

/// Largest mass fraction of `element`; on a tie the element's default salt wins, then
/// catalog order.
fn best_source<'f>(element: &str, fertilizers: &'f [FertilizerComposition]) -> Option<&'f FertilizerComposition> {
    let mut best: Option<&FertilizerComposition> = None;
    for candidate in fertilizers.iter().filter(|f| f.contribution_factor(element) > 0.0) {
        best = match best {
            None => Some(candidate),
            Some(current) => {
                let diff = candidate.mass_fraction(element) - current.mass_fraction(element);
                if diff > TIE_EPSILON
                    || (diff.abs() <= TIE_EPSILON
                        && is_default_salt(element, candidate)
                        && !is_default_salt(element, current))
                {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }
    best
}

fn is_default_salt(element: &str, fertilizer: &FertilizerComposition) -> bool {
    let name = fertilizer.name().to_lowercase();
    let formula = fertilizer.formula().to_lowercase();
    DEFAULT_SALTS
        .iter()
        .filter(|(e, _)| *e == element)
        .flat_map(|(_, keywords)| keywords.iter())
        .any(|keyword| name.contains(keyword) || formula.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::test_salt;

    fn map(pairs: &[(&str, f64)]) -> ConcentrationMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn catalog() -> Vec<FertilizerComposition> {
        vec![
            test_salt("Calcium Nitrate", 98.0, &[("Ca", 16.97)], &[("N", 11.86)]),
            test_salt("Potassium Nitrate", 98.0, &[("K", 38.67)], &[("N", 13.85)]),
            test_salt("Monopotassium Phosphate", 98.0, &[("K", 28.73)], &[("P", 22.76)]),
            test_salt("Magnesium Sulfate", 98.0, &[("Mg", 9.87)], &[("S", 13.01)]),
            test_salt("Boric Acid", 98.0, &[], &[("B", 17.48)]),
        ]
    }

    #[test]
    fn closes_calcium_gap_with_calcium_nitrate() {
        let settings = SolverSettings::default();
        let dosages = GreedySolver::new(&settings).solve(
            &map(&[("Ca", 180.0)]),
            &map(&[("Ca", 20.0)]),
            &catalog(),
        );
        let expected = 160.0 / (16.97 * 98.0 / 10.0);
        assert!((dosages.get("Calcium Nitrate") - expected).abs() < 1e-9);
        assert_eq!(dosages.get("Potassium Nitrate"), 0.0);
        assert_eq!(dosages.len(), 5);
    }

    #[test]
    fn phosphate_first_reduces_potassium_need() {
        let settings = SolverSettings::default();
        let fertilizers = catalog();
        let dosages = GreedySolver::new(&settings).solve(
            &map(&[("P", 40.0), ("K", 200.0)]),
            &ConcentrationMap::new(),
            &fertilizers,
        );
        let mkp = dosages.get("Monopotassium Phosphate");
        let k_from_mkp = mkp * fertilizers[2].contribution_factor("K");
        let kno3 = dosages.get("Potassium Nitrate");
        assert!((kno3 * fertilizers[1].contribution_factor("K") - (200.0 - k_from_mkp)).abs() < 1e-9);
    }

    #[test]
    fn micronutrient_dosage_is_capped() {
        let settings = SolverSettings::default();
        let dosages = GreedySolver::new(&settings).solve(&map(&[("B", 500.0)]), &ConcentrationMap::new(), &catalog());
        assert_eq!(dosages.get("Boric Acid"), settings.micro_dosage_cap);
    }

    #[test]
    fn unsupplied_element_leaves_gap() {
        let settings = SolverSettings::default();
        let dosages = GreedySolver::new(&settings).solve(&map(&[("Fe", 2.0)]), &map(&[("Fe", 0.1)]), &catalog());
        assert_eq!(dosages.total(), 0.0);
    }

    #[test]
    fn default_salt_wins_ties() {
        let fertilizers = vec![
            test_salt("Brand X Nitrate", 98.0, &[("Ca", 16.97)], &[("N", 11.86)]),
            test_salt("Calcium Nitrate", 98.0, &[("Ca", 16.97)], &[("N", 11.86)]),
        ];
        let chosen = best_source("Ca", &fertilizers).unwrap();
        assert_eq!(chosen.name(), "Calcium Nitrate");
    }

    #[test]
    fn water_above_target_needs_nothing() {
        let settings = SolverSettings::default();
        let dosages = GreedySolver::new(&settings).solve(&map(&[("Mg", 30.0)]), &map(&[("Mg", 45.0)]), &catalog());
        assert_eq!(dosages.get("Magnesium Sulfate"), 0.0);
    }
}
