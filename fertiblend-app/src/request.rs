use crate::config::KnowledgeBase;
use anyhow::{Context, Result};
use fertiblend_core::{
    calculation::SolveMethod,
    composition::FertilizerComposition,
    registry::CompositionRegistry,
    ConcentrationMap,
};
use fertiblend_schemas::{fertilizer::FertilizerRecord, limits::DosageLimit};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::warn;

fn default_volume() -> f64 {
    1.0
}

/// One dosage calculation, as written in `request.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub request_id: String,
    #[serde(default)]
    pub crop_profile_id: Option<String>,
    #[serde(default)]
    pub water_analysis_id: Option<String>,
    /// Catalog names first, then the built-in registry.
    pub fertilizers: Vec<String>,
    #[serde(default)]
    pub method: SolveMethod,
    #[serde(default = "default_volume")]
    pub volume_liters: f64,
    #[serde(default)]
    pub apply_caps: Option<bool>,
    #[serde(default)]
    pub strict_caps: Option<bool>,
    #[serde(default)]
    pub supplement_micronutrients: bool,
    #[serde(default)]
    pub dosage_limits: Vec<DosageLimit>,
    #[serde(default)]
    pub target_overrides: ConcentrationMap,
    #[serde(default)]
    pub water_overrides: ConcentrationMap,
}

impl CalculationRequest {
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path))
    }

    /// Profile targets with overrides applied, or `None` to use the engine defaults.
    pub fn targets(&self, kb: &KnowledgeBase) -> Option<ConcentrationMap> {
        let base = self.crop_profile_id.as_ref().and_then(|id| {
            let profile = kb.crop_profiles.get(id);
            if profile.is_none() {
                warn!(profile = %id, "Crop profile not found; falling back to default targets");
            }
            profile.map(|p| p.targets.clone())
        });
        merge_overrides(base, &self.target_overrides)
    }

    /// Water concentrations with overrides applied, or `None` to use the engine defaults.
    pub fn water(&self, kb: &KnowledgeBase) -> Option<ConcentrationMap> {
        let base = self.water_analysis_id.as_ref().and_then(|id| {
            let analysis = kb.water_analyses.get(id);
            if analysis.is_none() {
                warn!(analysis = %id, "Water analysis not found; falling back to default water");
            }
            analysis.map(|a| a.concentrations.clone())
        });
        merge_overrides(base, &self.water_overrides)
    }

    /// Resolves the requested names to compositions. Unresolved names are returned
    /// separately so the caller can report them.
    pub fn fertilizers(
        &self,
        kb: &KnowledgeBase,
        registry: &CompositionRegistry,
    ) -> (Vec<FertilizerComposition>, Vec<String>) {
        let records: Vec<FertilizerRecord> = self
            .fertilizers
            .iter()
            .map(|name| {
                kb.fertilizers
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| FertilizerRecord::named(name))
            })
            .collect();
        let resolution = registry.resolve_catalog(&records);
        let unresolved = resolution.unresolved.iter().map(|e| e.to_string()).collect();
        (resolution.compositions, unresolved)
    }
}

fn merge_overrides(base: Option<ConcentrationMap>, overrides: &ConcentrationMap) -> Option<ConcentrationMap> {
    if base.is_none() && overrides.is_empty() {
        return None;
    }
    let mut merged = base.unwrap_or_default();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_request() {
        let yaml = "request_id: REQ-1\nfertilizers: [Calcium Nitrate]\n";
        let request: CalculationRequest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(request.method, SolveMethod::Optimizer);
        assert_eq!(request.volume_liters, 1.0);
        assert!(!request.supplement_micronutrients);
    }

    #[test]
    fn overrides_without_profile_stand_alone() {
        let overrides: ConcentrationMap = [("B".to_string(), 0.4)].into_iter().collect();
        assert_eq!(merge_overrides(None, &overrides), Some(overrides.clone()));
        assert_eq!(merge_overrides(None, &ConcentrationMap::new()), None);

        let base: ConcentrationMap = [("B".to_string(), 0.5), ("N".to_string(), 150.0)].into_iter().collect();
        let merged = merge_overrides(Some(base), &overrides).unwrap();
        assert_eq!(merged["B"], 0.4);
        assert_eq!(merged["N"], 150.0);
    }
}
