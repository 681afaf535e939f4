use crate::{
    composition::FertilizerComposition,
    dosage::DosageVector,
    elements::{ChargeRole, ElementTable},
    ConcentrationMap,
};
use serde::Serialize;

/// mg/L of an element delivered by `dosage_mg_per_l` of product.
/// Zero when either the fraction or the purity is not positive.
pub fn element_contribution(dosage_mg_per_l: f64, mass_fraction_percent: f64, purity_percent: f64) -> f64 {
    if mass_fraction_percent <= 0.0 || purity_percent <= 0.0 {
        return 0.0;
    }
    dosage_mg_per_l * mass_fraction_percent / 100.0 * purity_percent / 100.0
}

/// Element concentrations contributed by the fertilizers alone.
pub fn fertilizer_contributions(dosages: &DosageVector, fertilizers: &[FertilizerComposition]) -> ConcentrationMap {
    let mut totals = ConcentrationMap::new();
    for fertilizer in fertilizers {
        let dosage = dosages.get(fertilizer.name());
        if dosage <= 0.0 {
            continue;
        }
        for (element, mg) in fertilizer.contributions_at(dosage) {
            *totals.entry(element).or_insert(0.0) += mg;
        }
    }
    totals
}

/// Water baseline plus every fertilizer contribution.
pub fn achieved_concentrations(
    water: &ConcentrationMap,
    dosages: &DosageVector,
    fertilizers: &[FertilizerComposition],
) -> ConcentrationMap {
    let mut achieved = water.clone();
    for (element, mg) in fertilizer_contributions(dosages, fertilizers) {
        *achieved.entry(element).or_insert(0.0) += mg;
    }
    achieved
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IonicTotals {
    pub cation_meq: f64,
    pub anion_meq: f64,
}

impl IonicTotals {
    pub fn difference(&self) -> f64 {
        (self.cation_meq - self.anion_meq).abs()
    }

    /// Percent imbalance: `|cations − anions| / max(cations, anions, 1) × 100`.
    pub fn imbalance_percent(&self) -> f64 {
        self.difference() / self.cation_meq.max(self.anion_meq).max(1.0) * 100.0
    }
}

/// Sums meq/L per side of the charge balance. Uncharged and unknown species are skipped.
pub fn ionic_totals(table: &ElementTable, concentrations: &ConcentrationMap) -> IonicTotals {
    let mut totals = IonicTotals::default();
    for (element, mg) in concentrations {
        match table.role_of(element) {
            ChargeRole::Cation => totals.cation_meq += table.mg_to_meq(*mg, element),
            ChargeRole::Anion => totals.anion_meq += table.mg_to_meq(*mg, element),
            ChargeRole::Uncharged => {}
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::test_salt;

    #[test]
    fn contribution_is_zero_for_missing_fraction() {
        assert_eq!(element_contribution(1000.0, 0.0, 98.0), 0.0);
        assert_eq!(element_contribution(1000.0, 10.0, 0.0), 0.0);
        assert!((element_contribution(1000.0, 10.0, 100.0) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn achieved_adds_fertilizers_to_water() {
        let salt = test_salt("Potassium Nitrate", 100.0, &[("K", 38.67)], &[("N", 13.85)]);
        let fertilizers = vec![salt];
        let mut dosages = DosageVector::zeroed(&fertilizers);
        dosages.set("Potassium Nitrate", 0.5);
        let water = ConcentrationMap::from([("K".to_string(), 5.0), ("Cl".to_string(), 12.0)]);

        let achieved = achieved_concentrations(&water, &dosages, &fertilizers);
        assert!((achieved["K"] - (5.0 + 193.35)).abs() < 1e-9);
        assert!((achieved["N"] - 69.25).abs() < 1e-9);
        assert_eq!(achieved["Cl"], 12.0);
    }

    #[test]
    fn balanced_solution_has_no_imbalance() {
        let table = ElementTable::standard();
        // 1 mmol/L KNO3 in mg/L
        let solution = ConcentrationMap::from([("K".to_string(), 39.10), ("N".to_string(), 14.01)]);
        let totals = ionic_totals(&table, &solution);
        assert!((totals.cation_meq - 1.0).abs() < 1e-9);
        assert!((totals.anion_meq - 1.0).abs() < 1e-9);
        assert!(totals.imbalance_percent() < 1e-9);
    }

    #[test]
    fn imbalance_uses_unit_floor() {
        let totals = IonicTotals { cation_meq: 0.2, anion_meq: 0.0 };
        assert!((totals.imbalance_percent() - 20.0).abs() < 1e-9);
    }
}
