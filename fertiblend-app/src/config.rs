use anyhow::{Context, Result};
use fertiblend_core::settings::Settings;
use fertiblend_schemas::{
    fertilizer::FertilizerRecord,
    file_formats::{CropProfileFile, FertilizerCatalogFile, WaterAnalysisFile},
    solution::{TargetProfile, WaterAnalysis},
};
use std::{collections::BTreeMap, fs, path::Path};

/// All static data loaded from the knowledge-base YAML files.
pub struct KnowledgeBase {
    pub fertilizers: BTreeMap<String, FertilizerRecord>,
    pub crop_profiles: BTreeMap<String, TargetProfile>,
    pub water_analyses: BTreeMap<String, WaterAnalysis>,
    pub settings: Settings,
}

impl KnowledgeBase {
    /// Loads all data from the specified base directory.
    pub fn load(base_path: &str) -> Result<Self> {
        println!("Loading knowledge base from '{}'...", base_path);

        let fertilizers = load_yaml_files_into_map(
            Path::new(base_path).join("1_fertilizers"),
            |file: FertilizerCatalogFile| file.fertilizers,
            |item: &FertilizerRecord| item.name.clone(),
        )?;
        let crop_profiles = load_yaml_files_into_map(
            Path::new(base_path).join("2_crop_profiles"),
            |file: CropProfileFile| file.crop_profiles,
            |item: &TargetProfile| item.profile_id.clone(),
        )?;
        let water_analyses = load_yaml_files_into_map(
            Path::new(base_path).join("3_water_analyses"),
            |file: WaterAnalysisFile| file.water_analyses,
            |item: &WaterAnalysis| item.analysis_id.clone(),
        )?;

        let settings_path = Path::new(base_path).join("settings.yaml");
        let settings = if settings_path.is_file() {
            let path = settings_path.to_string_lossy();
            Settings::from_yaml_file(&path).with_context(|| format!("Failed to load settings from {}", path))?
        } else {
            Settings::default()
        };

        println!(
            "Knowledge base loaded: {} fertilizers, {} crop profiles, {} water analyses.",
            fertilizers.len(),
            crop_profiles.len(),
            water_analyses.len()
        );
        Ok(Self {
            fertilizers,
            crop_profiles,
            water_analyses,
            settings,
        })
    }
}

/// Loads every YAML file in a directory and indexes its items by key.
fn load_yaml_files_into_map<P, F, E, T, K>(dir_path: P, extract_vec: E, get_key: K) -> Result<BTreeMap<String, T>>
where
    P: AsRef<Path>,
    F: for<'de> serde::Deserialize<'de>,
    E: Fn(F) -> Vec<T>,
    K: Fn(&T) -> String,
{
    let mut map = BTreeMap::new();
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir_path.as_ref())
        .with_context(|| format!("Failed to read directory: {:?}", dir_path.as_ref()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |s| s == "yaml" || s == "yml") {
            paths.push(path);
        }
    }
    // read_dir order is platform dependent
    paths.sort();

    for path in paths {
        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        let file_wrapper: F =
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse YAML from {:?}", path))?;
        for item in extract_vec(file_wrapper) {
            map.insert(get_key(&item), item);
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::CalculationRequest;
    use fertiblend_core::registry::CompositionRegistry;

    const KB_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data/knowledge_base");
    const REQUEST: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/request.yaml");

    #[test]
    fn loads_bundled_knowledge_base() {
        let kb = KnowledgeBase::load(KB_DIR).unwrap();
        assert!(kb.fertilizers.contains_key("Calcium Nitrate"));
        assert!(kb.crop_profiles.contains_key("TOMATO-FRUIT"));
        assert!(kb.water_analyses.contains_key("WELL-01"));
        assert_eq!(kb.settings.solver.max_total_dosage, 15.0);
    }

    #[test]
    fn bundled_request_resolves_completely() {
        let kb = KnowledgeBase::load(KB_DIR).unwrap();
        let request = CalculationRequest::from_yaml_file(REQUEST).unwrap();
        let registry = CompositionRegistry::standard().unwrap();

        let (fertilizers, unresolved) = request.fertilizers(&kb, &registry);
        assert!(unresolved.is_empty(), "{:?}", unresolved);
        assert_eq!(fertilizers.len(), request.fertilizers.len());

        let targets = request.targets(&kb).unwrap();
        assert_eq!(targets["B"], 0.45);
        assert_eq!(targets["K"], 280.0);
        assert_eq!(request.water(&kb).unwrap()["HCO3"], 140.0);
    }
}
