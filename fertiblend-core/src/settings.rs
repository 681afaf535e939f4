use crate::error::FertiblendError;
use serde::{Deserialize, Serialize};
use std::fs;

/// Which numerical backend the optimizer should use.
///
/// `Auto` picks the exact linear-program backend when it was compiled in and the
/// least-squares backend otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    #[default]
    Auto,
    Simplex,
    LeastSquares,
}

/// Weights, ceilings and thresholds shared by both solvers and the verifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub deviation_weight: f64,
    pub dosage_weight: f64,
    /// g/L, per fertilizer.
    pub max_individual_dosage: f64,
    /// g/L, summed over all fertilizers.
    pub max_total_dosage: f64,
    /// Dosages below these are zeroed (g/L).
    pub macro_significance: f64,
    pub micro_significance: f64,
    /// Greedy ceiling for any single micronutrient salt (g/L).
    pub micro_dosage_cap: f64,
    /// Floor for proportional-error denominators and the least-squares stopping test.
    pub tolerance: f64,
    pub max_iterations: usize,
    pub backend: BackendPreference,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            deviation_weight: 1000.0,
            dosage_weight: 10.0,
            max_individual_dosage: 5.0,
            max_total_dosage: 15.0,
            macro_significance: 1e-3,
            micro_significance: 1e-4,
            micro_dosage_cap: 1.0,
            tolerance: 1e-6,
            max_iterations: 10_000,
            backend: BackendPreference::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapSettings {
    pub enabled: bool,
    /// Strict mode repairs out-of-range targets; lenient mode only warns.
    pub strict: bool,
}

impl Default for CapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            strict: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub solver: SolverSettings,
    pub caps: CapSettings,
}

impl Settings {
    /// Reads settings from a YAML file. Missing keys fall back to their defaults.
    pub fn from_yaml_file(path: &str) -> Result<Self, FertiblendError> {
        let content =
            fs::read_to_string(path).map_err(|e| FertiblendError::FileIO(path.to_string(), e))?;
        let settings: Settings = serde_yaml::from_str(&content)
            .map_err(|e| FertiblendError::YamlParsing(path.to_string(), e))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), FertiblendError> {
        let s = &self.solver;
        if s.max_individual_dosage <= 0.0 || s.max_total_dosage <= 0.0 {
            return Err(FertiblendError::ConfigError(
                "dosage ceilings must be positive".to_string(),
            ));
        }
        if s.deviation_weight < 0.0 || s.dosage_weight < 0.0 {
            return Err(FertiblendError::ConfigError(
                "objective weights must be non-negative".to_string(),
            ));
        }
        if s.tolerance <= 0.0 || s.max_iterations == 0 {
            return Err(FertiblendError::ConfigError(
                "tolerance and iteration limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
