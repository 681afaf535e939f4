use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Element mass fractions (percent by weight) split by the ion that carries them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IonicComposition {
    #[serde(default)]
    pub cations: BTreeMap<String, f64>,
    #[serde(default)]
    pub anions: BTreeMap<String, f64>,
}

impl IonicComposition {
    pub fn is_empty(&self) -> bool {
        self.cations.is_empty() && self.anions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FertilizerMetadata {
    pub vendor: Option<String>,
    pub grade: Option<String>,
    pub notes: Option<String>,
    /// Free-form vendor data such as solubility. Not interpreted by the engine.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// One purchasable salt as delivered by a catalog.
///
/// A record may arrive without a composition, in which case the engine resolves it through
/// its composition registry using `name` and `formula`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizerRecord {
    pub name: String,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub molecular_weight: Option<f64>,
    /// Percent purity (0-100].
    #[serde(default)]
    pub purity: Option<f64>,
    /// kg/L.
    #[serde(default)]
    pub density: Option<f64>,
    #[serde(default)]
    pub composition: Option<IonicComposition>,
    #[serde(default)]
    pub is_ph_adjuster: bool,
    #[serde(default)]
    pub metadata: Option<FertilizerMetadata>,
}

impl FertilizerRecord {
    /// A record that only names the salt and leaves the composition to the registry.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            formula: None,
            molecular_weight: None,
            purity: None,
            density: None,
            composition: None,
            is_ph_adjuster: false,
            metadata: None,
        }
    }
}
