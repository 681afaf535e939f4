//! Safety-cap preprocessing of requested target concentrations.
//!
//! Targets are checked against per-element safe windows before any solver sees them. In
//! strict mode out-of-range values are repaired; in lenient mode they are only reported.
//! The step never fails.

use crate::{
    elements::{MACRONUTRIENTS, MICRONUTRIENTS},
    severity::Severity,
    ConcentrationMap,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientCap {
    pub min: f64,
    pub max: f64,
    pub optimal_min: f64,
    pub optimal_max: f64,
    /// Replacement for targets below `min` in strict mode.
    pub safe_default: f64,
    pub notes: String,
}

/// Acceptable band for the mg/L ratio of two targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioBand {
    pub numerator: String,
    pub denominator: String,
    pub min: f64,
    pub max: f64,
    pub optimal: f64,
}

impl RatioBand {
    pub fn label(&self) -> String {
        format!("{}:{}", self.numerator, self.denominator)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    ClampedToMaximum,
    RaisedToSafeDefault,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapAdjustment {
    pub element: String,
    pub original: f64,
    pub adjusted: f64,
    pub kind: AdjustmentKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapWarning {
    /// Element symbol or ratio label such as `K:Ca`.
    pub subject: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CapSummary {
    pub macro_adjustments: usize,
    pub micro_adjustments: usize,
    pub high_warnings: usize,
    pub medium_warnings: usize,
    pub low_warnings: usize,
    pub info_warnings: usize,
    /// 0–100; 100 means nothing had to be touched or flagged.
    pub safety_score: f64,
}

/// Output of [`SafetyCaps::apply`]. The input map is never modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CappedTargets {
    pub targets: ConcentrationMap,
    pub adjustments: Vec<CapAdjustment>,
    pub warnings: Vec<CapWarning>,
    pub summary: CapSummary,
}

impl CappedTargets {
    /// Targets used as-is, without any cap processing.
    pub fn unchecked(targets: &ConcentrationMap) -> Self {
        Self {
            targets: targets.clone(),
            adjustments: Vec::new(),
            warnings: Vec::new(),
            summary: CapSummary {
                safety_score: 100.0,
                ..CapSummary::default()
            },
        }
    }
}

// element, min, max, optimal range, safe default, notes
const STANDARD_CAPS: [(&str, f64, f64, (f64, f64), f64, &str); 14] = [
    ("N", 50.0, 300.0, (150.0, 250.0), 150.0, "Excess nitrogen drives soft vegetative growth and nitrate accumulation"),
    ("P", 15.0, 70.0, (30.0, 50.0), 40.0, "High phosphorus antagonises zinc and iron uptake"),
    ("K", 100.0, 300.0, (200.0, 280.0), 200.0, "Excess potassium competes with calcium and magnesium"),
    ("Ca", 80.0, 220.0, (120.0, 200.0), 150.0, "Low calcium causes blossom-end rot and tip burn"),
    ("Mg", 15.0, 80.0, (25.0, 60.0), 40.0, "Magnesium above 80 mg/L raises salinity with no yield benefit"),
    ("S", 20.0, 150.0, (50.0, 100.0), 80.0, "Sulfate is rarely toxic but adds to EC"),
    ("HCO3", 0.0, 60.0, (10.0, 40.0), 30.0, "Bicarbonate buffers pH; excess locks out micronutrients"),
    ("Cl", 0.0, 75.0, (0.0, 30.0), 0.0, "Chloride above 75 mg/L injures sensitive crops"),
    ("Fe", 0.5, 4.0, (1.5, 3.0), 2.0, "Iron above 4 mg/L can precipitate and stain emitters"),
    ("Mn", 0.1, 1.5, (0.3, 0.8), 0.5, "Manganese toxicity shows as brown leaf spotting"),
    ("Zn", 0.05, 0.8, (0.2, 0.5), 0.3, "Zinc has a narrow window between deficiency and toxicity"),
    ("Cu", 0.02, 0.2, (0.05, 0.15), 0.08, "Copper is toxic to roots above 0.2 mg/L"),
    ("B", 0.1, 1.0, (0.2, 0.8), 0.5, "Boron has the narrowest safe window of all nutrients"),
    ("Mo", 0.005, 0.15, (0.02, 0.08), 0.05, "Molybdenum is required only in trace amounts"),
];

const STANDARD_RATIOS: [(&str, &str, f64, f64, f64); 3] = [
    ("K", "Ca", 0.6, 1.8, 1.2),
    ("Ca", "Mg", 2.5, 8.0, 4.0),
    ("N", "K", 0.5, 1.3, 0.75),
];

#[derive(Debug, Clone)]
pub struct SafetyCaps {
    caps: BTreeMap<String, NutrientCap>,
    ratios: Vec<RatioBand>,
}

impl Default for SafetyCaps {
    fn default() -> Self {
        Self::standard()
    }
}

impl SafetyCaps {
    pub fn standard() -> Self {
        let caps = STANDARD_CAPS
            .iter()
            .map(|(element, min, max, (opt_lo, opt_hi), safe_default, notes)| {
                (
                    element.to_string(),
                    NutrientCap {
                        min: *min,
                        max: *max,
                        optimal_min: *opt_lo,
                        optimal_max: *opt_hi,
                        safe_default: *safe_default,
                        notes: notes.to_string(),
                    },
                )
            })
            .collect();
        let ratios = STANDARD_RATIOS
            .iter()
            .map(|(num, den, min, max, optimal)| RatioBand {
                numerator: num.to_string(),
                denominator: den.to_string(),
                min: *min,
                max: *max,
                optimal: *optimal,
            })
            .collect();
        Self { caps, ratios }
    }

    pub fn with_cap(mut self, element: &str, cap: NutrientCap) -> Self {
        self.caps.insert(element.to_string(), cap);
        self
    }

    pub fn cap(&self, element: &str) -> Option<&NutrientCap> {
        self.caps.get(element)
    }

    pub fn ratios(&self) -> &[RatioBand] {
        &self.ratios
    }

    /// Checks every requested target and returns a new, safe target set.
    ///
    /// Targets of zero or below are treated as "not requested" and pass through untouched.
    /// A NaN target is replaced by the safe default in strict mode; otherwise, or without a
    /// known cap, it becomes 0 with a HIGH warning.
    pub fn apply(&self, targets: &ConcentrationMap, strict: bool) -> CappedTargets {
        let mut safe = ConcentrationMap::new();
        let mut adjustments = Vec::new();
        let mut warnings = Vec::new();

        for (element, &value) in targets {
            if value.is_nan() {
                match self.caps.get(element) {
                    Some(cap) if strict => {
                        adjustments.push(CapAdjustment {
                            element: element.clone(),
                            original: value,
                            adjusted: cap.safe_default,
                            kind: AdjustmentKind::RaisedToSafeDefault,
                            reason: format!(
                                "target is not a number; using safe default {} mg/L",
                                cap.safe_default
                            ),
                        });
                        safe.insert(element.clone(), cap.safe_default);
                    }
                    _ => {
                        warnings.push(CapWarning {
                            subject: element.clone(),
                            severity: Severity::High,
                            message: format!("{} target is not a number; treated as not requested", element),
                        });
                        safe.insert(element.clone(), 0.0);
                    }
                }
                continue;
            }
            let Some(cap) = self.caps.get(element) else {
                warnings.push(CapWarning {
                    subject: element.clone(),
                    severity: Severity::Info,
                    message: format!("No safety limits known for {}; target passed through", element),
                });
                safe.insert(element.clone(), value);
                continue;
            };
            if value <= 0.0 {
                safe.insert(element.clone(), value);
                continue;
            }

            let adjusted = if value > cap.max {
                if strict {
                    adjustments.push(CapAdjustment {
                        element: element.clone(),
                        original: value,
                        adjusted: cap.max,
                        kind: AdjustmentKind::ClampedToMaximum,
                        reason: format!("{} mg/L exceeds safe maximum {} mg/L. {}", value, cap.max, cap.notes),
                    });
                    cap.max
                } else {
                    warnings.push(CapWarning {
                        subject: element.clone(),
                        severity: Severity::High,
                        message: format!("{} target {} mg/L exceeds safe maximum {} mg/L", element, value, cap.max),
                    });
                    value
                }
            } else if value < cap.min {
                if strict {
                    adjustments.push(CapAdjustment {
                        element: element.clone(),
                        original: value,
                        adjusted: cap.safe_default,
                        kind: AdjustmentKind::RaisedToSafeDefault,
                        reason: format!(
                            "{} mg/L is below safe minimum {} mg/L; using safe default {} mg/L",
                            value, cap.min, cap.safe_default
                        ),
                    });
                    cap.safe_default
                } else {
                    warnings.push(CapWarning {
                        subject: element.clone(),
                        severity: Severity::Medium,
                        message: format!("{} target {} mg/L is below safe minimum {} mg/L", element, value, cap.min),
                    });
                    value
                }
            } else {
                if value < cap.optimal_min || value > cap.optimal_max {
                    warnings.push(CapWarning {
                        subject: element.clone(),
                        severity: Severity::Low,
                        message: format!(
                            "{} target {} mg/L is safe but outside the optimal range {}-{} mg/L",
                            element, value, cap.optimal_min, cap.optimal_max
                        ),
                    });
                }
                value
            };
            safe.insert(element.clone(), adjusted);
        }

        warnings.extend(self.check_ratios(&safe));
        for adjustment in &adjustments {
            info!(
                element = %adjustment.element,
                from = adjustment.original,
                to = adjustment.adjusted,
                "Safety cap adjusted target"
            );
        }
        let summary = summarize(&adjustments, &warnings);
        debug!(score = summary.safety_score, "Safety cap pass complete");

        CappedTargets {
            targets: safe,
            adjustments,
            warnings,
            summary,
        }
    }

    /// Non-blocking warnings for ratios outside their bands. Missing or zero terms are skipped.
    pub fn check_ratios(&self, targets: &ConcentrationMap) -> Vec<CapWarning> {
        self.ratios
            .iter()
            .filter_map(|band| {
                let numerator = *targets.get(&band.numerator)?;
                let denominator = *targets.get(&band.denominator)?;
                if numerator <= 0.0 || denominator <= 0.0 {
                    return None;
                }
                let ratio = numerator / denominator;
                if ratio >= band.min && ratio <= band.max {
                    return None;
                }
                Some(CapWarning {
                    subject: band.label(),
                    severity: Severity::Medium,
                    message: format!(
                        "{} ratio {:.2} outside acceptable band {}-{} (optimal {})",
                        band.label(),
                        ratio,
                        band.min,
                        band.max,
                        band.optimal
                    ),
                })
            })
            .collect()
    }
}

fn summarize(adjustments: &[CapAdjustment], warnings: &[CapWarning]) -> CapSummary {
    let mut summary = CapSummary::default();
    let mut clamps = 0usize;
    let mut raises = 0usize;
    for adjustment in adjustments {
        if MACRONUTRIENTS.contains(&adjustment.element.as_str()) {
            summary.macro_adjustments += 1;
        } else if MICRONUTRIENTS.contains(&adjustment.element.as_str()) {
            summary.micro_adjustments += 1;
        }
        match adjustment.kind {
            AdjustmentKind::ClampedToMaximum => clamps += 1,
            AdjustmentKind::RaisedToSafeDefault => raises += 1,
        }
    }
    for warning in warnings {
        match warning.severity {
            Severity::High => summary.high_warnings += 1,
            Severity::Medium => summary.medium_warnings += 1,
            Severity::Low => summary.low_warnings += 1,
            Severity::Info => summary.info_warnings += 1,
        }
    }
    let penalty = 15.0 * clamps as f64
        + 5.0 * raises as f64
        + 10.0 * summary.high_warnings as f64
        + 5.0 * summary.medium_warnings as f64
        + 2.0 * summary.low_warnings as f64;
    summary.safety_score = (100.0 - penalty).max(0.0);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(pairs: &[(&str, f64)]) -> ConcentrationMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn nan_target_is_repaired_or_flagged() {
        let caps = SafetyCaps::standard();
        let requested = targets(&[("Fe", f64::NAN), ("Si", f64::NAN)]);

        let strict = caps.apply(&requested, true);
        assert_eq!(strict.targets["Fe"], 2.0);
        assert_eq!(strict.adjustments.len(), 1);
        assert_eq!(strict.adjustments[0].kind, AdjustmentKind::RaisedToSafeDefault);
        assert_eq!(strict.targets["Si"], 0.0);
        assert!(strict.warnings.iter().any(|w| w.subject == "Si" && w.severity == Severity::High));

        let lenient = caps.apply(&requested, false);
        assert!(lenient.adjustments.is_empty());
        assert_eq!(lenient.targets["Fe"], 0.0);
        assert!(lenient.warnings.iter().any(|w| w.subject == "Fe" && w.severity == Severity::High));
        assert!(lenient.targets.values().all(|v| v.is_finite()));
    }

    #[test]
    fn strict_mode_clamps_excess_boron() {
        let caps = SafetyCaps::standard();
        let result = caps.apply(&targets(&[("B", 5.0)]), true);
        assert_eq!(result.targets["B"], 1.0);
        assert_eq!(result.adjustments.len(), 1);
        assert_eq!(result.adjustments[0].kind, AdjustmentKind::ClampedToMaximum);
        assert_eq!(result.summary.micro_adjustments, 1);
        assert_eq!(result.summary.safety_score, 85.0);
    }

    #[test]
    fn strict_mode_raises_low_target_to_safe_default() {
        let result = SafetyCaps::standard().apply(&targets(&[("Ca", 40.0)]), true);
        assert_eq!(result.targets["Ca"], 150.0);
        assert_eq!(result.adjustments[0].kind, AdjustmentKind::RaisedToSafeDefault);
    }

    #[test]
    fn lenient_mode_only_warns() {
        let input = targets(&[("K", 400.0), ("Mg", 5.0)]);
        let result = SafetyCaps::standard().apply(&input, false);
        assert_eq!(result.targets, input);
        assert!(result.adjustments.is_empty());
        let severities: Vec<Severity> = result.warnings.iter().map(|w| w.severity).collect();
        assert!(severities.contains(&Severity::High));
        assert!(severities.contains(&Severity::Medium));
    }

    #[test]
    fn outside_optimal_range_is_low_warning() {
        let result = SafetyCaps::standard().apply(&targets(&[("N", 100.0)]), true);
        assert_eq!(result.targets["N"], 100.0);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].severity, Severity::Low);
    }

    #[test]
    fn unknown_element_passes_through_with_info() {
        let result = SafetyCaps::standard().apply(&targets(&[("Si", 30.0)]), true);
        assert_eq!(result.targets["Si"], 30.0);
        assert_eq!(result.warnings[0].severity, Severity::Info);
    }

    #[test]
    fn ratio_outside_band_is_flagged() {
        // K:Ca = 280 / 100 = 2.8
        let result = SafetyCaps::standard().apply(&targets(&[("K", 280.0), ("Ca", 100.0)]), true);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.subject == "K:Ca" && w.severity == Severity::Medium));
    }

    #[test]
    fn reapplying_is_idempotent() {
        let caps = SafetyCaps::standard();
        let first = caps.apply(&targets(&[("N", 400.0), ("P", 2.0), ("B", 5.0), ("Mo", 0.5)]), true);
        let second = caps.apply(&first.targets, true);
        assert_eq!(second.targets, first.targets);
        assert!(second.adjustments.is_empty());
    }
}
