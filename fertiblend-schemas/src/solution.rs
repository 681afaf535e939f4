use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Element symbol to concentration in mg/L. A missing element means zero.
pub type ConcentrationMap = BTreeMap<String, f64>;

/// Desired final nutrient-solution concentrations for a crop and growth stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetProfile {
    pub profile_id: String,
    pub crop_name: String,
    #[serde(default)]
    pub growth_stage: Option<String>,
    pub targets: ConcentrationMap,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Baseline chemistry of the dilution water.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterAnalysis {
    pub analysis_id: String,
    pub source_name: String,
    pub concentrations: ConcentrationMap,
    #[serde(default)]
    pub ph: Option<f64>,
    /// dS/m
    #[serde(default)]
    pub ec: Option<f64>,
    #[serde(default)]
    pub sampled_on: Option<String>,
}
