use crate::{
    elements::{ChargeRole, ElementTable},
    units, ConcentrationMap,
};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BalanceStatus {
    Excellent,
    Good,
    Caution,
    Poor,
    Critical,
}

impl BalanceStatus {
    pub fn from_imbalance(percent: f64) -> Self {
        match percent {
            p if p <= 5.0 => BalanceStatus::Excellent,
            p if p <= 10.0 => BalanceStatus::Good,
            p if p <= 15.0 => BalanceStatus::Caution,
            p if p <= 25.0 => BalanceStatus::Poor,
            _ => BalanceStatus::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IonicBalanceSummary {
    pub cation_meq: f64,
    pub anion_meq: f64,
    pub difference_meq: f64,
    pub imbalance_percent: f64,
    pub status: BalanceStatus,
    /// meq/L per cation.
    pub cations: BTreeMap<String, f64>,
    /// meq/L per anion.
    pub anions: BTreeMap<String, f64>,
}

pub fn summarize_balance(table: &ElementTable, achieved: &ConcentrationMap) -> IonicBalanceSummary {
    let totals = units::ionic_totals(table, achieved);
    let mut cations = BTreeMap::new();
    let mut anions = BTreeMap::new();
    for (element, mg) in achieved {
        let side = match table.role_of(element) {
            ChargeRole::Cation => &mut cations,
            ChargeRole::Anion => &mut anions,
            ChargeRole::Uncharged => continue,
        };
        side.insert(element.clone(), table.mg_to_meq(*mg, element));
    }
    let imbalance_percent = totals.imbalance_percent();
    IonicBalanceSummary {
        cation_meq: totals.cation_meq,
        anion_meq: totals.anion_meq,
        difference_meq: totals.difference(),
        imbalance_percent,
        status: BalanceStatus::from_imbalance(imbalance_percent),
        cations,
        anions,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioBasis {
    Meq,
    Mg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RatioStatus {
    Excellent,
    Good,
    Caution,
    Imbalanced,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioCheck {
    pub label: String,
    pub basis: RatioBasis,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub optimal: f64,
    pub status: RatioStatus,
}

// numerator, denominator, basis, min, max, optimal
const NUTRIENT_RATIOS: [(&str, &str, RatioBasis, f64, f64, f64); 4] = [
    ("K", "Ca", RatioBasis::Meq, 0.8, 1.5, 1.2),
    ("Ca", "Mg", RatioBasis::Meq, 3.0, 8.0, 4.0),
    ("K", "Mg", RatioBasis::Meq, 2.0, 6.0, 3.0),
    ("N", "K", RatioBasis::Mg, 0.6, 1.2, 0.75),
];

/// Antagonism ratios of the achieved solution. Ratios with a zero term are skipped.
pub fn check_ratios(table: &ElementTable, achieved: &ConcentrationMap) -> Vec<RatioCheck> {
    NUTRIENT_RATIOS
        .iter()
        .filter_map(|&(numerator, denominator, basis, min, max, optimal)| {
            let amount = |element: &str| {
                let mg = achieved.get(element).copied().unwrap_or(0.0);
                match basis {
                    RatioBasis::Meq => table.mg_to_meq(mg, element),
                    RatioBasis::Mg => mg,
                }
            };
            let (top, bottom) = (amount(numerator), amount(denominator));
            if top <= 0.0 || bottom <= 0.0 {
                return None;
            }
            let value = top / bottom;
            let status = if (value - optimal).abs() <= 0.1 * optimal {
                RatioStatus::Excellent
            } else if value >= min && value <= max {
                RatioStatus::Good
            } else if value >= min * 0.8 && value <= max * 1.2 {
                RatioStatus::Caution
            } else {
                RatioStatus::Imbalanced
            };
            Some(RatioCheck {
                label: format!("{}:{}", numerator, denominator),
                basis,
                value,
                min,
                max,
                optimal,
                status,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_bands() {
        assert_eq!(BalanceStatus::from_imbalance(3.0), BalanceStatus::Excellent);
        assert_eq!(BalanceStatus::from_imbalance(10.0), BalanceStatus::Good);
        assert_eq!(BalanceStatus::from_imbalance(12.0), BalanceStatus::Caution);
        assert_eq!(BalanceStatus::from_imbalance(20.0), BalanceStatus::Poor);
        assert_eq!(BalanceStatus::from_imbalance(40.0), BalanceStatus::Critical);
    }

    #[test]
    fn splits_meq_by_charge_role() {
        let table = ElementTable::standard();
        let achieved = ConcentrationMap::from([
            ("Ca".to_string(), 40.08),
            ("N".to_string(), 28.02),
            ("B".to_string(), 0.5),
        ]);
        let summary = summarize_balance(&table, &achieved);
        assert!((summary.cations["Ca"] - 2.0).abs() < 1e-9);
        assert!((summary.anions["N"] - 2.0).abs() < 1e-9);
        assert!(!summary.anions.contains_key("B"));
        assert_eq!(summary.status, BalanceStatus::Excellent);
    }

    #[test]
    fn grades_ratios() {
        let table = ElementTable::standard();
        // K:Ca in meq = (117.3/39.1) / (60.12/40.08*2) = 3.0 / 3.0 = 1.0
        let achieved = ConcentrationMap::from([("K".to_string(), 117.3), ("Ca".to_string(), 60.12)]);
        let checks = check_ratios(&table, &achieved);
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].label, "K:Ca");
        assert!((checks[0].value - 1.0).abs() < 1e-9);
        assert_eq!(checks[0].status, RatioStatus::Good);
    }
}
