//! Verification of a dosage solution against its targets.
//!
//! Everything here is read-only over its inputs: the report is derived from targets,
//! water, achieved concentrations, the fertilizer selection and the dosages.

pub mod diagnostics;
pub mod ionic;

use crate::{
    caps::SafetyCaps,
    composition::FertilizerComposition,
    dosage::DosageVector,
    elements::{ElementTable, NutrientClass},
    settings::SolverSettings,
    ConcentrationMap,
};
use diagnostics::{diagnose, Diagnosis, DiagnosticCause, DiagnosticContext, DIAGNOSIS_THRESHOLD};
use ionic::{check_ratios, summarize_balance, BalanceStatus, IonicBalanceSummary, RatioCheck, RatioStatus};
use serde::Serialize;
use std::fmt;

/// Achieved above this multiple of the recommended maximum raises a safety warning.
const EXCESS_FACTOR: f64 = 1.5;

// element, recommended min, recommended max (mg/L)
const RECOMMENDED_RANGES: [(&str, f64, f64); 15] = [
    ("N", 100.0, 200.0),
    ("P", 30.0, 60.0),
    ("K", 150.0, 350.0),
    ("Ca", 120.0, 220.0),
    ("Mg", 30.0, 80.0),
    ("S", 50.0, 120.0),
    ("Fe", 1.0, 4.0),
    ("Mn", 0.3, 1.5),
    ("Zn", 0.1, 0.8),
    ("Cu", 0.05, 0.3),
    ("B", 0.2, 1.0),
    ("Mo", 0.01, 0.1),
    ("Na", 0.0, 50.0),
    ("Cl", 0.0, 75.0),
    ("HCO3", 0.0, 100.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviationStatus {
    Excellent,
    Good,
    Low,
    High,
    #[serde(rename = "Deviation Low")]
    DeviationLow,
    #[serde(rename = "Deviation High")]
    DeviationHigh,
}

impl DeviationStatus {
    /// ≤5 % Excellent, ≤15 % Good, ≤30 % Low/High, beyond that Deviation Low/High.
    pub fn from_deviation(percent: f64) -> Self {
        let magnitude = percent.abs();
        if magnitude <= 5.0 {
            DeviationStatus::Excellent
        } else if magnitude <= 15.0 {
            DeviationStatus::Good
        } else if magnitude <= 30.0 {
            if percent < 0.0 {
                DeviationStatus::Low
            } else {
                DeviationStatus::High
            }
        } else if percent < 0.0 {
            DeviationStatus::DeviationLow
        } else {
            DeviationStatus::DeviationHigh
        }
    }
}

impl fmt::Display for DeviationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviationStatus::Excellent => "Excellent",
            DeviationStatus::Good => "Good",
            DeviationStatus::Low => "Low",
            DeviationStatus::High => "High",
            DeviationStatus::DeviationLow => "Deviation Low",
            DeviationStatus::DeviationHigh => "Deviation High",
        };
        f.write_str(label)
    }
}

/// `(achieved − target) / target × 100`, or 0 when the target is 0.
pub fn deviation_percent(target: f64, achieved: f64) -> f64 {
    if target > 0.0 {
        (achieved - target) / target * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementVerification {
    pub element: String,
    pub class: NutrientClass,
    pub target: f64,
    pub water: f64,
    pub fertilizer_contribution: f64,
    pub achieved: f64,
    pub deviation: f64,
    pub deviation_percent: f64,
    pub status: DeviationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DosageSummary {
    pub total_dosage: f64,
    pub max_individual_dosage: f64,
    pub active_fertilizers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityScore {
    pub targeting_accuracy: f64,
    pub dosage_efficiency: f64,
    pub safety: f64,
    pub ionic_balance: f64,
    pub utilization: f64,
    pub overall: f64,
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    pub elements: Vec<ElementVerification>,
    pub ionic_balance: IonicBalanceSummary,
    pub ratios: Vec<RatioCheck>,
    pub diagnoses: Vec<Diagnosis>,
    pub dosage_summary: DosageSummary,
    pub safety_warnings: Vec<String>,
    pub quality: QualityScore,
    pub recommendations: Vec<String>,
    /// Elements the reference table cannot convert.
    pub data_quality: Vec<String>,
}

impl VerificationReport {
    pub fn element(&self, symbol: &str) -> Option<&ElementVerification> {
        self.elements.iter().find(|e| e.element == symbol)
    }

    pub fn diagnosis(&self, symbol: &str) -> Option<&Diagnosis> {
        self.diagnoses.iter().find(|d| d.element == symbol)
    }
}

pub struct Verifier<'a> {
    elements: &'a ElementTable,
    caps: &'a SafetyCaps,
    settings: &'a SolverSettings,
    requested: Option<&'a ConcentrationMap>,
}

impl<'a> Verifier<'a> {
    pub fn new(elements: &'a ElementTable, caps: &'a SafetyCaps, settings: &'a SolverSettings) -> Self {
        Self {
            elements,
            caps,
            settings,
            requested: None,
        }
    }

    /// Targets as the caller asked for them, before safety caps. Lets the diagnostics flag
    /// a request above the safe maximum even after it was clamped.
    pub fn with_requested_targets(mut self, requested: &'a ConcentrationMap) -> Self {
        self.requested = Some(requested);
        self
    }

    pub fn verify(
        &self,
        targets: &ConcentrationMap,
        achieved: &ConcentrationMap,
        water: &ConcentrationMap,
        fertilizers: &[FertilizerComposition],
        dosages: &DosageVector,
    ) -> VerificationReport {
        let rows: Vec<ElementVerification> = targets
            .iter()
            .map(|(element, &target)| {
                let got = achieved.get(element).copied().unwrap_or(0.0);
                let baseline = water.get(element).copied().unwrap_or(0.0);
                let deviation = deviation_percent(target, got);
                ElementVerification {
                    element: element.clone(),
                    class: self.elements.class_of(element),
                    target,
                    water: baseline,
                    fertilizer_contribution: (got - baseline).max(0.0),
                    achieved: got,
                    deviation: got - target,
                    deviation_percent: deviation,
                    status: DeviationStatus::from_deviation(deviation),
                }
            })
            .collect();

        let context = DiagnosticContext {
            fertilizers,
            water,
            total_dosage: dosages.total(),
            caps: self.caps,
            settings: self.settings,
            requested: self.requested,
        };
        let diagnoses: Vec<Diagnosis> = rows
            .iter()
            .filter(|row| row.target > 0.0 && row.deviation_percent.abs() > DIAGNOSIS_THRESHOLD)
            .map(|row| diagnose(&row.element, row.target, row.achieved, row.deviation_percent, &context))
            .collect();

        let ionic_balance = summarize_balance(self.elements, achieved);
        let ratios = check_ratios(self.elements, achieved);
        let dosage_summary = DosageSummary {
            total_dosage: dosages.total(),
            max_individual_dosage: dosages.max_individual(),
            active_fertilizers: dosages.active_count(),
        };
        let safety_warnings = self.safety_warnings(achieved, dosages);
        let quality = self.quality(&rows, &dosage_summary, &safety_warnings, &ionic_balance);
        let recommendations = recommendations(&diagnoses, &ionic_balance, &ratios, &safety_warnings);
        let data_quality = self
            .elements
            .unknown_symbols(targets.keys().chain(achieved.keys()))
            .into_iter()
            .map(|symbol| format!("No atomic weight or valence for '{}'; excluded from meq sums", symbol))
            .collect();

        VerificationReport {
            elements: rows,
            ionic_balance,
            ratios,
            diagnoses,
            dosage_summary,
            safety_warnings,
            quality,
            recommendations,
            data_quality,
        }
    }

    fn safety_warnings(&self, achieved: &ConcentrationMap, dosages: &DosageVector) -> Vec<String> {
        let mut warnings = Vec::new();
        let total = dosages.total();
        if total > self.settings.max_total_dosage + 1e-9 {
            warnings.push(format!(
                "Total dosage {:.2} g/L exceeds the {:.1} g/L ceiling",
                total, self.settings.max_total_dosage
            ));
        }
        for (name, dosage) in dosages.iter() {
            if dosage > self.settings.max_individual_dosage + 1e-9 {
                warnings.push(format!(
                    "{} at {:.2} g/L exceeds the {:.1} g/L individual ceiling",
                    name, dosage, self.settings.max_individual_dosage
                ));
            }
        }
        for (element, _, max) in RECOMMENDED_RANGES {
            let value = achieved.get(element).copied().unwrap_or(0.0);
            if max > 0.0 && value > EXCESS_FACTOR * max {
                warnings.push(format!(
                    "{} at {:.2} mg/L is more than {}x the recommended maximum {} mg/L",
                    element, value, EXCESS_FACTOR, max
                ));
            }
        }
        warnings
    }

    fn quality(
        &self,
        rows: &[ElementVerification],
        dosages: &DosageSummary,
        safety_warnings: &[String],
        balance: &IonicBalanceSummary,
    ) -> QualityScore {
        let targeted: Vec<f64> = rows
            .iter()
            .filter(|row| row.target > 0.0)
            .map(|row| row.deviation_percent.abs())
            .collect();
        let targeting_accuracy = if targeted.is_empty() {
            100.0
        } else {
            (100.0 - targeted.iter().sum::<f64>() / targeted.len() as f64).clamp(0.0, 100.0)
        };
        let ceiling = self.settings.max_total_dosage;
        let excess = (dosages.total_dosage - 0.5 * ceiling).max(0.0);
        let dosage_efficiency = (100.0 - excess / ceiling * 100.0).clamp(0.0, 100.0);
        let safety = (100.0 - 20.0 * safety_warnings.len() as f64).max(0.0);
        let ionic_balance = (100.0 - 2.0 * balance.imbalance_percent).clamp(0.0, 100.0);
        let utilization = (dosages.active_fertilizers as f64 / 8.0).min(1.0) * 100.0;
        let overall = (targeting_accuracy + dosage_efficiency + safety + ionic_balance + utilization) / 5.0;
        QualityScore {
            targeting_accuracy,
            dosage_efficiency,
            safety,
            ionic_balance,
            utilization,
            overall,
            grade: grade(overall).to_string(),
        }
    }
}

pub fn grade(score: f64) -> &'static str {
    const GRADES: [(f64, &str); 10] = [
        (90.0, "A+"),
        (85.0, "A"),
        (80.0, "A-"),
        (75.0, "B+"),
        (70.0, "B"),
        (65.0, "B-"),
        (60.0, "C+"),
        (55.0, "C"),
        (50.0, "C-"),
        (f64::NEG_INFINITY, "F"),
    ];
    GRADES
        .iter()
        .find(|(floor, _)| score >= *floor)
        .map_or("F", |(_, grade)| grade)
}

fn recommendations(
    diagnoses: &[Diagnosis],
    balance: &IonicBalanceSummary,
    ratios: &[RatioCheck],
    safety_warnings: &[String],
) -> Vec<String> {
    let mut advice = Vec::new();
    for diagnosis in diagnoses {
        let element = &diagnosis.element;
        let line = match diagnosis.primary {
            DiagnosticCause::NoFertilizerSource => format!("Add a fertilizer that supplies {}", element),
            DiagnosticCause::ExcessiveWaterContent | DiagnosticCause::HighWaterContent => format!(
                "Blend the source water with low-mineral (RO or rain) water to lower its {} contribution",
                element
            ),
            DiagnosticCause::ConflictingFertilizers => format!(
                "Use more concentrated salts or relax other targets to free dosage allowance for {}",
                element
            ),
            DiagnosticCause::TargetExceedsSafeLimits => format!("Lower the {} target to within its safe range", element),
            DiagnosticCause::LowFertilizerContent => format!("Replace the {} source with a more concentrated salt", element),
            DiagnosticCause::NutrientTradeOff => format!(
                "Add a salt that supplies {} without its current companion ions",
                element
            ),
        };
        advice.push(line);
    }
    if matches!(
        balance.status,
        BalanceStatus::Caution | BalanceStatus::Poor | BalanceStatus::Critical
    ) {
        let (excess, remedy) = if balance.cation_meq > balance.anion_meq {
            ("cations", "nitrate, sulfate or phosphate based salts or acids")
        } else {
            ("anions", "potassium, calcium or magnesium carbonate/hydroxide sources")
        };
        advice.push(format!(
            "Ionic imbalance of {:.1}% with excess {}; rebalance with {}",
            balance.imbalance_percent, excess, remedy
        ));
    }
    for ratio in ratios.iter().filter(|r| r.status == RatioStatus::Imbalanced) {
        advice.push(format!(
            "{} ratio {:.2} is outside {}-{}; adjust the two nutrients toward {}",
            ratio.label, ratio.value, ratio.min, ratio.max, ratio.optimal
        ));
    }
    if !safety_warnings.is_empty() {
        advice.push("Review the dosage safety warnings before mixing".to_string());
    }
    if advice.is_empty() {
        advice.push("Solution meets its targets; no changes needed".to_string());
    }
    advice
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::test_salt;

    fn map(pairs: &[(&str, f64)]) -> ConcentrationMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn deviation_bands() {
        assert_eq!(DeviationStatus::from_deviation(4.9), DeviationStatus::Excellent);
        assert_eq!(DeviationStatus::from_deviation(-12.0), DeviationStatus::Good);
        assert_eq!(DeviationStatus::from_deviation(22.0), DeviationStatus::High);
        assert_eq!(DeviationStatus::from_deviation(-22.0), DeviationStatus::Low);
        assert_eq!(DeviationStatus::from_deviation(-95.0), DeviationStatus::DeviationLow);
        assert_eq!(DeviationStatus::from_deviation(60.0).to_string(), "Deviation High");
    }

    #[test]
    fn zero_target_has_zero_deviation() {
        assert_eq!(deviation_percent(0.0, 12.0), 0.0);
    }

    #[test]
    fn grades_follow_bands() {
        assert_eq!(grade(95.0), "A+");
        assert_eq!(grade(72.0), "B");
        assert_eq!(grade(10.0), "F");
    }

    #[test]
    fn exact_solution_needs_no_diagnosis() {
        let (table, caps, settings) = (ElementTable::standard(), SafetyCaps::standard(), SolverSettings::default());
        let fertilizers = vec![test_salt("Potassium Nitrate", 100.0, &[("K", 38.67)], &[("N", 13.85)])];
        let mut dosages = DosageVector::zeroed(&fertilizers);
        dosages.set("Potassium Nitrate", 0.5);
        let achieved = map(&[("K", 193.35), ("N", 69.25)]);
        let report = Verifier::new(&table, &caps, &settings).verify(
            &map(&[("K", 193.35)]),
            &achieved,
            &ConcentrationMap::new(),
            &fertilizers,
            &dosages,
        );
        assert_eq!(report.element("K").map(|e| e.status), Some(DeviationStatus::Excellent));
        assert!(report.diagnoses.is_empty());
        assert!(report.safety_warnings.is_empty());
        assert!(report.data_quality.is_empty());
    }

    #[test]
    fn flags_excess_and_unknown_elements() {
        let (table, caps, settings) = (ElementTable::standard(), SafetyCaps::standard(), SolverSettings::default());
        let dosages = DosageVector::new();
        let report = Verifier::new(&table, &caps, &settings).verify(
            &map(&[("Cl", 10.0), ("Si", 5.0)]),
            &map(&[("Cl", 150.0), ("Si", 5.0)]),
            &map(&[("Cl", 150.0), ("Si", 5.0)]),
            &[],
            &dosages,
        );
        assert!(report.safety_warnings.iter().any(|w| w.starts_with("Cl")));
        assert_eq!(report.data_quality.len(), 1);
        assert_eq!(report.diagnosis("Cl").map(|d| d.primary), Some(DiagnosticCause::NoFertilizerSource));
    }

    #[test]
    fn clamped_request_is_still_diagnosed_as_unsafe() {
        let (table, caps, settings) = (ElementTable::standard(), SafetyCaps::standard(), SolverSettings::default());
        let dosages = DosageVector::new();
        let (capped, achieved, water) = (map(&[("B", 1.0)]), map(&[("B", 0.1)]), map(&[("B", 0.1)]));
        let requested = map(&[("B", 5.0)]);

        let unsafe_cause = |report: &VerificationReport| {
            report
                .diagnosis("B")
                .map_or(false, |d| d.findings.iter().any(|f| f.cause == DiagnosticCause::TargetExceedsSafeLimits))
        };
        let with_request = Verifier::new(&table, &caps, &settings)
            .with_requested_targets(&requested)
            .verify(&capped, &achieved, &water, &[], &dosages);
        assert!(unsafe_cause(&with_request));
        assert_eq!(with_request.diagnosis("B").map(|d| d.primary), Some(DiagnosticCause::NoFertilizerSource));

        let capped_only = Verifier::new(&table, &caps, &settings).verify(&capped, &achieved, &water, &[], &dosages);
        assert!(!unsafe_cause(&capped_only));
    }
}
