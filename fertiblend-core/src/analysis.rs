//! Post-solve accounting: where each element comes from and whether dosage limits hold.

use crate::{
    composition::FertilizerComposition,
    dosage::DosageVector,
    elements::ElementTable,
    units::{achieved_concentrations, fertilizer_contributions, ionic_totals},
    ConcentrationMap,
};
use fertiblend_schemas::limits::DosageLimit;
use serde::Serialize;
use std::collections::BTreeMap;

/// Conductivity estimate per meq/L of cations (dS/m).
const EC_PER_CATION_MEQ: f64 = 0.1;
const LIMIT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SpeciesAmount {
    pub mg_per_l: f64,
    pub mmol_per_l: f64,
    pub meq_per_l: f64,
}

pub type SpeciesTable = BTreeMap<String, SpeciesAmount>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionBreakdown {
    pub fertilizer: SpeciesTable,
    pub water: SpeciesTable,
    pub final_solution: SpeciesTable,
    pub cation_meq: f64,
    pub anion_meq: f64,
    /// dS/m
    pub estimated_ec: f64,
}

fn species_table(table: &ElementTable, concentrations: &ConcentrationMap) -> SpeciesTable {
    concentrations
        .iter()
        .map(|(element, &mg)| {
            let amount = if table.contains(element) {
                SpeciesAmount {
                    mg_per_l: mg,
                    mmol_per_l: table.mg_to_mmol(mg, element),
                    meq_per_l: table.mg_to_meq(mg, element),
                }
            } else {
                SpeciesAmount {
                    mg_per_l: mg,
                    ..SpeciesAmount::default()
                }
            };
            (element.clone(), amount)
        })
        .collect()
}

pub fn solution_breakdown(
    table: &ElementTable,
    water: &ConcentrationMap,
    dosages: &DosageVector,
    fertilizers: &[FertilizerComposition],
) -> SolutionBreakdown {
    let contributed = fertilizer_contributions(dosages, fertilizers);
    let achieved = achieved_concentrations(water, dosages, fertilizers);
    let totals = ionic_totals(table, &achieved);
    SolutionBreakdown {
        fertilizer: species_table(table, &contributed),
        water: species_table(table, water),
        final_solution: species_table(table, &achieved),
        cation_meq: totals.cation_meq,
        anion_meq: totals.anion_meq,
        estimated_ec: totals.cation_meq * EC_PER_CATION_MEQ,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitStatus {
    Met,
    BelowMinimum,
    AboveMaximum,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitCompliance {
    pub fertilizer: String,
    pub dosage: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub status: LimitStatus,
    /// Distance to the violated bound (g/L); 0 when met.
    pub violation: f64,
}

pub fn limit_compliance(dosages: &DosageVector, limits: &[DosageLimit]) -> Vec<LimitCompliance> {
    limits
        .iter()
        .map(|limit| {
            let dosage = dosages.get(&limit.fertilizer);
            let (status, violation) = match (limit.min_g_per_l, limit.max_g_per_l) {
                (Some(min), _) if dosage < min - LIMIT_TOLERANCE => (LimitStatus::BelowMinimum, min - dosage),
                (_, Some(max)) if dosage > max + LIMIT_TOLERANCE => (LimitStatus::AboveMaximum, dosage - max),
                _ => (LimitStatus::Met, 0.0),
            };
            LimitCompliance {
                fertilizer: limit.fertilizer.clone(),
                dosage,
                min: limit.min_g_per_l,
                max: limit.max_g_per_l,
                status,
                violation,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::test_salt;

    #[test]
    fn breakdown_splits_water_and_fertilizer() {
        let table = ElementTable::standard();
        let fertilizers = vec![test_salt("Calcium Chloride", 100.0, &[("Ca", 36.0)], &[("Cl", 64.0)])];
        let mut dosages = DosageVector::zeroed(&fertilizers);
        dosages.set("Calcium Chloride", 0.5);
        let water: ConcentrationMap = [("Ca".to_string(), 20.0)].into_iter().collect();

        let breakdown = solution_breakdown(&table, &water, &dosages, &fertilizers);
        assert!((breakdown.fertilizer["Ca"].mg_per_l - 180.0).abs() < 1e-9);
        assert!((breakdown.final_solution["Ca"].mg_per_l - 200.0).abs() < 1e-9);
        assert!((breakdown.final_solution["Cl"].mg_per_l - 320.0).abs() < 1e-9);
        let ca_meq = breakdown.final_solution["Ca"].meq_per_l;
        assert!((ca_meq - 2.0 * breakdown.final_solution["Ca"].mmol_per_l).abs() < 1e-9);
        assert!((breakdown.cation_meq - ca_meq).abs() < 1e-9);
        assert!((breakdown.estimated_ec - ca_meq * 0.1).abs() < 1e-9);
    }

    #[test]
    fn unknown_species_keep_mass_only() {
        let water: ConcentrationMap = [("Si".to_string(), 12.0)].into_iter().collect();
        let breakdown = solution_breakdown(&ElementTable::standard(), &water, &DosageVector::new(), &[]);
        assert_eq!(breakdown.water["Si"].mg_per_l, 12.0);
        assert_eq!(breakdown.water["Si"].meq_per_l, 0.0);
    }

    #[test]
    fn compliance_reports_violation_size() {
        let mut dosages = DosageVector::new();
        dosages.set("Potassium Nitrate", 0.4);
        dosages.set("Magnesium Sulfate", 2.5);
        let limits = vec![
            DosageLimit {
                fertilizer: "Potassium Nitrate".to_string(),
                min_g_per_l: Some(0.5),
                max_g_per_l: None,
            },
            DosageLimit {
                fertilizer: "Magnesium Sulfate".to_string(),
                min_g_per_l: None,
                max_g_per_l: Some(2.0),
            },
            DosageLimit {
                fertilizer: "Boric Acid".to_string(),
                min_g_per_l: None,
                max_g_per_l: Some(0.01),
            },
        ];
        let report = limit_compliance(&dosages, &limits);
        assert_eq!(report[0].status, LimitStatus::BelowMinimum);
        assert!((report[0].violation - 0.1).abs() < 1e-9);
        assert_eq!(report[1].status, LimitStatus::AboveMaximum);
        assert!((report[1].violation - 0.5).abs() < 1e-9);
        assert_eq!(report[2].status, LimitStatus::Met);
    }
}
