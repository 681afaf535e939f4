//! Fertilizer identity → ionic composition.
//!
//! Lookups run an explicit, ordered chain of [`CompositionMatcher`] strategies and return the
//! first hit. There is no scoring across strategies.

mod builtin;
pub mod matchers;

use crate::{
    composition::{FertilizerComposition, DEFAULT_PURITY},
    error::FertiblendError,
};
use builtin::{BUILTIN_SALTS, KEYWORD_DEFAULTS, PRIMARY_MICRO_SOURCES};
use fertiblend_schemas::fertilizer::FertilizerRecord;
use matchers::{normalize_formula, CompositionMatcher, FormulaMatcher, KeywordMatcher, Query, SynonymMatcher};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub key: String,
    /// Lowercase.
    pub synonyms: Vec<String>,
    /// Normalized with [`normalize_formula`].
    pub formula_variants: Vec<String>,
    pub composition: FertilizerComposition,
}

impl RegistryEntry {
    pub fn new(key: &str, composition: FertilizerComposition, synonyms: &[&str], formula_variants: &[&str]) -> Self {
        let mut synonyms: Vec<String> = synonyms.iter().map(|s| s.to_lowercase()).collect();
        let canonical = composition.name().to_lowercase();
        if !synonyms.contains(&canonical) {
            synonyms.insert(0, canonical);
        }
        let mut formula_variants: Vec<String> = formula_variants.iter().map(|f| normalize_formula(f)).collect();
        let own_formula = normalize_formula(composition.formula());
        if !own_formula.is_empty() && !formula_variants.contains(&own_formula) {
            formula_variants.insert(0, own_formula);
        }
        Self {
            key: key.to_string(),
            synonyms,
            formula_variants,
            composition,
        }
    }
}

/// A successful lookup and the strategy that produced it.
#[derive(Debug, Clone, Copy)]
pub struct RegistryMatch<'r> {
    pub entry: &'r RegistryEntry,
    pub strategy: &'static str,
}

#[derive(Debug)]
pub struct CompositionRegistry {
    entries: Vec<RegistryEntry>,
    matchers: Vec<Box<dyn CompositionMatcher>>,
    primary_micro_sources: BTreeMap<String, String>,
}

impl CompositionRegistry {
    /// The curated salt table with the default matcher chain.
    pub fn standard() -> Result<Self, FertiblendError> {
        let mut entries = Vec::with_capacity(BUILTIN_SALTS.len());
        for salt in BUILTIN_SALTS {
            let to_map = |pairs: &[(&str, f64)]| -> BTreeMap<String, f64> {
                pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
            };
            let composition = FertilizerComposition::new(
                salt.name,
                salt.formula,
                salt.molecular_weight,
                DEFAULT_PURITY,
                to_map(salt.cations),
                to_map(salt.anions),
            )?
            .with_ph_adjuster(salt.ph_adjuster);
            entries.push(RegistryEntry::new(salt.key, composition, salt.synonyms, salt.formula_variants));
        }
        let primary = PRIMARY_MICRO_SOURCES
            .iter()
            .map(|(element, key)| (element.to_string(), key.to_string()))
            .collect();
        Ok(Self::with_entries(entries, primary))
    }

    /// A registry over custom entries with the default matcher chain.
    pub fn with_entries(entries: Vec<RegistryEntry>, primary_micro_sources: BTreeMap<String, String>) -> Self {
        Self {
            entries,
            matchers: vec![
                Box::new(SynonymMatcher),
                Box::new(FormulaMatcher),
                Box::new(KeywordMatcher::new(KEYWORD_DEFAULTS.iter().copied())),
            ],
            primary_micro_sources,
        }
    }

    /// Replaces the matcher chain. Order is lookup order.
    pub fn with_matchers(mut self, matchers: Vec<Box<dyn CompositionMatcher>>) -> Self {
        self.matchers = matchers;
        self
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn strategies(&self) -> Vec<&'static str> {
        self.matchers.iter().map(|m| m.strategy()).collect()
    }

    pub fn by_key(&self, key: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Default supplement salt for a micronutrient.
    pub fn primary_source(&self, element: &str) -> Option<&RegistryEntry> {
        self.primary_micro_sources
            .get(element)
            .and_then(|key| self.by_key(key))
    }

    pub fn find(&self, name: &str, formula_hint: Option<&str>) -> Result<RegistryMatch<'_>, FertiblendError> {
        let query = Query::new(name, formula_hint);
        for matcher in &self.matchers {
            if let Some(entry) = matcher.find(&query, &self.entries) {
                debug!(name, strategy = matcher.strategy(), key = %entry.key, "Resolved fertilizer composition");
                return Ok(RegistryMatch {
                    entry,
                    strategy: matcher.strategy(),
                });
            }
        }
        Err(FertiblendError::CompositionNotFound {
            name: name.to_string(),
            formula: formula_hint.map(str::to_string),
        })
    }

    /// Turns catalog records into validated compositions.
    ///
    /// Records with their own composition are used as-is. The rest are resolved through
    /// [`find`](Self::find) and keep their catalog name and purity. Unresolvable, invalid
    /// and duplicate records are dropped and reported.
    pub fn resolve_catalog(&self, records: &[FertilizerRecord]) -> CatalogResolution {
        let mut resolution = CatalogResolution::default();
        let mut seen = HashSet::new();
        for record in records {
            if !seen.insert(record.name.clone()) {
                warn!(name = %record.name, "Duplicate fertilizer name in catalog; keeping the first");
                continue;
            }
            let resolved = match record.composition.as_ref().filter(|c| !c.is_empty()) {
                Some(_) => FertilizerComposition::from_record(record),
                None => self
                    .find(&record.name, record.formula.as_deref())
                    .and_then(|found| FertilizerComposition::from_record_with_reference(record, &found.entry.composition)),
            };
            match resolved {
                Ok(composition) => resolution.compositions.push(composition),
                Err(e) => {
                    warn!(name = %record.name, error = %e, "Dropping unresolved fertilizer");
                    resolution.unresolved.push(e);
                }
            }
        }
        resolution
    }
}

#[derive(Debug, Default)]
pub struct CatalogResolution {
    pub compositions: Vec<FertilizerComposition>,
    pub unresolved: Vec<FertiblendError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fertiblend_schemas::fertilizer::IonicComposition;

    fn registry() -> CompositionRegistry {
        CompositionRegistry::standard().unwrap()
    }

    #[test]
    fn matcher_chain_order() {
        assert_eq!(registry().strategies(), vec!["synonym", "formula", "keyword"]);
    }

    #[test]
    fn finds_by_synonym() {
        let registry = registry();
        let found = registry.find("Nitrato de Calcio", None).unwrap();
        assert_eq!(found.entry.key, "calcium_nitrate");
        assert_eq!(found.strategy, "synonym");
    }

    #[test]
    fn longest_synonym_wins_substring_matches() {
        let reg = registry();
        let found = reg.find("YaraLiva calcium nitrate with boron", None).unwrap();
        assert_eq!(found.entry.key, "calcium_nitrate_boron");
    }

    #[test]
    fn finds_by_hydrated_formula() {
        let registry = registry();
        let found = registry.find("Brand X", Some("mgso4·7H2O")).unwrap();
        assert_eq!(found.entry.key, "magnesium_sulfate");
        assert_eq!(found.strategy, "formula");
    }

    #[test]
    fn falls_back_to_keywords() {
        let registry = registry();
        let found = registry.find("Generic Zinc Product", None).unwrap();
        assert_eq!(found.entry.key, "zinc_sulfate");
        assert_eq!(found.strategy, "keyword");

        let found = registry.find("Solution Fe 6%", None).unwrap();
        assert_eq!(found.entry.key, "iron_edta");
    }

    #[test]
    fn unknown_name_is_not_found() {
        let reg = registry();
        let result = reg.find("Seaweed Extract", None);
        assert!(matches!(result, Err(FertiblendError::CompositionNotFound { .. })));
    }

    #[test]
    fn primary_sources_cover_all_micronutrients() {
        let registry = registry();
        for element in crate::elements::MICRONUTRIENTS {
            let entry = registry.primary_source(element).unwrap();
            assert!(entry.composition.supplies(element), "{}", element);
        }
    }

    #[test]
    fn resolves_catalog_records() {
        let registry = registry();
        let mut custom = FertilizerRecord::named("House Potash");
        custom.purity = Some(99.0);
        custom.composition = Some(IonicComposition {
            cations: BTreeMap::from([("K".to_string(), 50.0)]),
            anions: BTreeMap::new(),
        });
        let mut named = FertilizerRecord::named("Potassium Nitrate");
        named.purity = Some(95.0);
        let records = vec![
            custom,
            named.clone(),
            named,
            FertilizerRecord::named("Seaweed Extract"),
        ];

        let resolution = registry.resolve_catalog(&records);
        assert_eq!(resolution.compositions.len(), 2);
        assert_eq!(resolution.unresolved.len(), 1);
        let kno3 = &resolution.compositions[1];
        assert_eq!(kno3.name(), "Potassium Nitrate");
        assert_eq!(kno3.purity(), 95.0);
        assert_eq!(kno3.formula(), "KNO3");
        assert!((kno3.mass_fraction("K") - 38.67).abs() < 1e-12);
    }
}
