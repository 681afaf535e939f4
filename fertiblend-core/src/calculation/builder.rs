use crate::{
    calculation::{engine::CalculationEngine, SolveMethod},
    composition::FertilizerComposition,
    defaults::{default_targets, default_water},
    error::FertiblendError,
    logger::VerificationLogger,
    settings::Settings,
    snapshot::ReferenceSnapshot,
    ConcentrationMap,
};
use fertiblend_schemas::limits::DosageLimit;
use std::sync::Arc;
use tracing::debug;

/// A fluent builder for one dosage calculation.
///
/// Targets and water fall back to the built-in defaults when not given. Everything else
/// defaults to the optimizer with standard settings, 1 L of solution and no supplements.
#[derive(Default)]
pub struct CalculationBuilder {
    targets: Option<ConcentrationMap>,
    water: Option<ConcentrationMap>,
    fertilizers: Vec<FertilizerComposition>,
    method: SolveMethod,
    settings: Settings,
    volume_liters: Option<f64>,
    dosage_limits: Vec<DosageLimit>,
    supplement_micronutrients: bool,
    log_path: Option<String>,
}

impl CalculationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested element concentrations in mg/L.
    pub fn with_targets(mut self, targets: ConcentrationMap) -> Self {
        self.targets = Some(targets);
        self
    }

    /// Baseline water analysis in mg/L.
    pub fn with_water(mut self, water: ConcentrationMap) -> Self {
        self.water = Some(water);
        self
    }

    pub fn with_fertilizers(mut self, fertilizers: Vec<FertilizerComposition>) -> Self {
        self.fertilizers = fertilizers;
        self
    }

    pub fn with_method(mut self, method: SolveMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_volume(mut self, volume_liters: f64) -> Self {
        self.volume_liters = Some(volume_liters);
        self
    }

    pub fn with_dosage_limits(mut self, limits: Vec<DosageLimit>) -> Self {
        self.dosage_limits = limits;
        self
    }

    /// Adds primary micronutrient sources for elements the selection cannot cover.
    pub fn with_micronutrient_supplement(mut self, enabled: bool) -> Self {
        self.supplement_micronutrients = enabled;
        self
    }

    /// Writes the per-element verification table to the specified CSV file.
    pub fn with_verification_log_to_file(mut self, path: &str) -> Self {
        self.log_path = Some(path.to_string());
        self
    }

    /// Consumes the builder and returns an engine bound to `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns a `FertiblendError` if no fertilizer was given, the volume is not positive,
    /// the settings are inconsistent, or the log file cannot be created.
    pub fn build(self, snapshot: Arc<ReferenceSnapshot>) -> Result<CalculationEngine, FertiblendError> {
        if self.fertilizers.is_empty() {
            return Err(FertiblendError::NoFertilizers);
        }
        let volume_liters = self.volume_liters.unwrap_or(1.0);
        if !(volume_liters.is_finite() && volume_liters > 0.0) {
            return Err(FertiblendError::ConfigError(format!(
                "solution volume must be positive, got {} L",
                volume_liters
            )));
        }
        self.settings.validate()?;

        let targets = self.targets.unwrap_or_else(|| {
            debug!("No targets given; using the default profile");
            default_targets()
        });
        let water = self.water.unwrap_or_else(|| {
            debug!("No water analysis given; using the default analysis");
            default_water()
        });

        let logger = match self.log_path {
            Some(path) => Some(
                VerificationLogger::new(&path).map_err(|e| FertiblendError::FileIO(path.clone(), e))?,
            ),
            None => None,
        };

        Ok(CalculationEngine {
            snapshot,
            targets,
            water,
            fertilizers: self.fertilizers,
            method: self.method,
            settings: self.settings,
            volume_liters,
            dosage_limits: self.dosage_limits,
            supplement_micronutrients: self.supplement_micronutrients,
            logger,
        })
    }
}
