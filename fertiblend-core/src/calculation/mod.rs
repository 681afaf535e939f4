//! End-to-end calculation pipeline.
//!
//! [`CalculationBuilder`](builder::CalculationBuilder) collects the inputs of one request and
//! [`CalculationEngine::run`](engine::CalculationEngine::run) executes it:
//! caps → micronutrient supplement → solver → achieved concentrations → breakdown →
//! limit compliance → verification.

pub mod builder;
pub mod engine;

use crate::{
    analysis::{LimitCompliance, SolutionBreakdown},
    caps::CappedTargets,
    composition::FertilizerComposition,
    dosage::DosageVector,
    optimizer::OptimizationResult,
    supplement::MicronutrientCoverage,
    verification::VerificationReport,
    ConcentrationMap,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveMethod {
    Greedy,
    #[default]
    Optimizer,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalculationOutcome {
    pub method: SolveMethod,
    pub requested_targets: ConcentrationMap,
    pub safe_targets: CappedTargets,
    pub water: ConcentrationMap,
    pub fertilizers: Vec<FertilizerComposition>,
    pub micronutrient_coverage: Vec<MicronutrientCoverage>,
    pub supplements_added: Vec<String>,
    pub dosages: DosageVector,
    pub volume_liters: f64,
    /// Product mass per fertilizer for the whole batch.
    pub batch_grams: BTreeMap<String, f64>,
    pub achieved: ConcentrationMap,
    /// Present only for [`SolveMethod::Optimizer`].
    pub optimization: Option<OptimizationResult>,
    pub breakdown: SolutionBreakdown,
    pub limit_compliance: Vec<LimitCompliance>,
    pub verification: VerificationReport,
}
