use crate::{
    analysis::{limit_compliance, solution_breakdown},
    calculation::{CalculationOutcome, SolveMethod},
    caps::CappedTargets,
    composition::FertilizerComposition,
    error::FertiblendError,
    greedy::GreedySolver,
    logger::VerificationLogger,
    optimizer::NutrientOptimizer,
    settings::Settings,
    snapshot::ReferenceSnapshot,
    supplement::{analyze_coverage, supplement_micronutrients, SupplementOutcome},
    units,
    verification::Verifier,
    ConcentrationMap,
};
use fertiblend_schemas::limits::DosageLimit;
use std::sync::Arc;
use tracing::{info, warn};

pub struct CalculationEngine {
    pub(super) snapshot: Arc<ReferenceSnapshot>,
    pub(super) targets: ConcentrationMap,
    pub(super) water: ConcentrationMap,
    pub(super) fertilizers: Vec<FertilizerComposition>,
    pub(super) method: SolveMethod,
    pub(super) settings: Settings,
    pub(super) volume_liters: f64,
    pub(super) dosage_limits: Vec<DosageLimit>,
    pub(super) supplement_micronutrients: bool,
    pub(super) logger: Option<VerificationLogger>,
}

impl CalculationEngine {
    pub fn run(&mut self) -> Result<CalculationOutcome, FertiblendError> {
        let reference = Arc::clone(&self.snapshot);

        let safe_targets = if self.settings.caps.enabled {
            reference.caps.apply(&self.targets, self.settings.caps.strict)
        } else {
            CappedTargets::unchecked(&self.targets)
        };
        for adjustment in &safe_targets.adjustments {
            warn!(
                element = %adjustment.element,
                original = adjustment.original,
                adjusted = adjustment.adjusted,
                "Target adjusted by safety caps"
            );
        }

        let supplemented = if self.supplement_micronutrients {
            supplement_micronutrients(
                &reference.registry,
                self.fertilizers.clone(),
                &safe_targets.targets,
                &self.water,
            )
        } else {
            SupplementOutcome {
                coverage: analyze_coverage(&self.fertilizers, &safe_targets.targets, &self.water),
                fertilizers: self.fertilizers.clone(),
                added: Vec::new(),
            }
        };
        let fertilizers = supplemented.fertilizers;

        info!(
            method = ?self.method,
            fertilizers = fertilizers.len(),
            targets = safe_targets.targets.len(),
            "Running dosage calculation"
        );
        let (dosages, optimization) = match self.method {
            SolveMethod::Greedy => {
                let dosages = GreedySolver::new(&self.settings.solver).solve(
                    &safe_targets.targets,
                    &self.water,
                    &fertilizers,
                );
                (dosages, None)
            }
            SolveMethod::Optimizer => {
                let optimizer = NutrientOptimizer::new(self.settings.solver.clone());
                let result = optimizer.solve(
                    &reference.elements,
                    &safe_targets.targets,
                    &self.water,
                    &fertilizers,
                    &self.dosage_limits,
                )?;
                (result.dosages.clone(), Some(result))
            }
        };

        let achieved = units::achieved_concentrations(&self.water, &dosages, &fertilizers);
        let breakdown = solution_breakdown(&reference.elements, &self.water, &dosages, &fertilizers);
        let compliance = limit_compliance(&dosages, &self.dosage_limits);
        let verification = Verifier::new(&reference.elements, &reference.caps, &self.settings.solver)
            .with_requested_targets(&self.targets)
            .verify(&safe_targets.targets, &achieved, &self.water, &fertilizers, &dosages);

        if let Some(logger) = &mut self.logger {
            logger.log_report(&verification)?;
        }
        info!(
            total_g_per_l = dosages.total(),
            score = verification.quality.overall,
            grade = %verification.quality.grade,
            "Calculation complete"
        );

        Ok(CalculationOutcome {
            method: self.method,
            requested_targets: self.targets.clone(),
            safe_targets,
            water: self.water.clone(),
            batch_grams: dosages.grams_for_volume(self.volume_liters),
            volume_liters: self.volume_liters,
            fertilizers,
            micronutrient_coverage: supplemented.coverage,
            supplements_added: supplemented.added,
            dosages,
            achieved,
            optimization,
            breakdown,
            limit_compliance: compliance,
            verification,
        })
    }
}
