//! Root-cause explanations for elements that miss their target.

use crate::{
    caps::SafetyCaps, composition::FertilizerComposition, settings::SolverSettings, severity::Severity,
    ConcentrationMap,
};
use serde::Serialize;

/// Deviation (percent, absolute) above which an element is diagnosed.
pub const DIAGNOSIS_THRESHOLD: f64 = 5.0;
/// Water supplying this share of the target counts as "nearly" covering it.
const HIGH_WATER_SHARE: f64 = 0.8;
/// Total dosage at this share of the ceiling counts as "near" it.
const CEILING_PROXIMITY: f64 = 0.9;
/// Mass fraction (%) below which a source is considered weak.
const LOW_CONTENT_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCause {
    NoFertilizerSource,
    HighWaterContent,
    ExcessiveWaterContent,
    ConflictingFertilizers,
    TargetExceedsSafeLimits,
    LowFertilizerContent,
    /// None of the above applies; the solver traded this element off against others.
    NutrientTradeOff,
}

impl DiagnosticCause {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticCause::NoFertilizerSource => "no_fertilizer_source",
            DiagnosticCause::HighWaterContent => "high_water_content",
            DiagnosticCause::ExcessiveWaterContent => "excessive_water_content",
            DiagnosticCause::ConflictingFertilizers => "conflicting_fertilizers",
            DiagnosticCause::TargetExceedsSafeLimits => "target_exceeds_safe_limits",
            DiagnosticCause::LowFertilizerContent => "low_fertilizer_content",
            DiagnosticCause::NutrientTradeOff => "nutrient_trade_off",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticFinding {
    pub cause: DiagnosticCause,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    pub element: String,
    pub deviation_percent: f64,
    /// First matching cause.
    pub primary: DiagnosticCause,
    pub severity: Severity,
    /// Every matching cause, in check order.
    pub findings: Vec<DiagnosticFinding>,
}

/// Read-only view of the calculation handed to the diagnostic rules.
pub struct DiagnosticContext<'a> {
    pub fertilizers: &'a [FertilizerComposition],
    pub water: &'a ConcentrationMap,
    pub total_dosage: f64,
    pub caps: &'a SafetyCaps,
    pub settings: &'a SolverSettings,
    /// Targets as requested, before safety caps. Falls back to the solved-for target.
    pub requested: Option<&'a ConcentrationMap>,
}

fn finding(cause: DiagnosticCause, severity: Severity, message: String) -> DiagnosticFinding {
    DiagnosticFinding { cause, severity, message }
}

pub fn diagnose(
    element: &str,
    target: f64,
    achieved: f64,
    deviation_percent: f64,
    context: &DiagnosticContext<'_>,
) -> Diagnosis {
    let mut findings = Vec::new();

    let sources: Vec<&FertilizerComposition> = context.fertilizers.iter().filter(|f| f.supplies(element)).collect();
    if sources.is_empty() {
        findings.push(finding(
            DiagnosticCause::NoFertilizerSource,
            Severity::High,
            format!("No fertilizer in the selection supplies {}", element),
        ));
    }

    let water = context.water.get(element).copied().unwrap_or(0.0);
    if target > 0.0 && water > target {
        findings.push(finding(
            DiagnosticCause::ExcessiveWaterContent,
            Severity::High,
            format!("Water alone supplies {:.3} mg/L of {}, above the {:.3} mg/L target", water, element, target),
        ));
    } else if target > 0.0 && water >= HIGH_WATER_SHARE * target {
        findings.push(finding(
            DiagnosticCause::HighWaterContent,
            Severity::Medium,
            format!(
                "Water supplies {:.0}% of the {} target, leaving little room for adjustment",
                water / target * 100.0,
                element
            ),
        ));
    }

    let ceiling = context.settings.max_total_dosage;
    if context.total_dosage >= CEILING_PROXIMITY * ceiling {
        findings.push(finding(
            DiagnosticCause::ConflictingFertilizers,
            Severity::Medium,
            format!(
                "Total dosage {:.2} g/L is at {:.0}% of the {:.1} g/L ceiling; nutrients compete for the remaining allowance",
                context.total_dosage,
                context.total_dosage / ceiling * 100.0,
                ceiling
            ),
        ));
    }

    if let Some(cap) = context.caps.cap(element) {
        let requested = context
            .requested
            .and_then(|r| r.get(element).copied())
            .unwrap_or(target);
        if requested > cap.max {
            findings.push(finding(
                DiagnosticCause::TargetExceedsSafeLimits,
                Severity::High,
                format!(
                    "{} requested target {:.3} mg/L exceeds the safe maximum {:.3} mg/L",
                    element, requested, cap.max
                ),
            ));
        }
    }

    if !sources.is_empty() && sources.iter().all(|f| f.mass_fraction(element) < LOW_CONTENT_PERCENT) {
        let best = sources.iter().map(|f| f.mass_fraction(element)).fold(0.0, f64::max);
        findings.push(finding(
            DiagnosticCause::LowFertilizerContent,
            Severity::Medium,
            format!("Best {} source carries only {:.2}% {}", element, best, element),
        ));
    }

    if findings.is_empty() {
        findings.push(finding(
            DiagnosticCause::NutrientTradeOff,
            Severity::Low,
            format!(
                "{} reached {:.3} of {:.3} mg/L; the shared salts cannot match every target at once",
                element, achieved, target
            ),
        ));
    }

    let primary = findings[0].cause;
    let severity = findings.iter().map(|f| f.severity).max().unwrap_or(Severity::Low);
    Diagnosis {
        element: element.to_string(),
        deviation_percent,
        primary,
        severity,
        findings,
    }
}
