use crate::composition::FertilizerComposition;
use serde::Serialize;
use std::collections::BTreeMap;

/// Fertilizer name → dosage in g/L. Values are never negative.
///
/// Backed by an ordered map so that identical inputs always serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DosageVector {
    dosages: BTreeMap<String, f64>,
}

impl DosageVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fertilizer present at dosage 0.
    pub fn zeroed(fertilizers: &[FertilizerComposition]) -> Self {
        Self {
            dosages: fertilizers.iter().map(|f| (f.name().to_string(), 0.0)).collect(),
        }
    }

    pub fn get(&self, fertilizer: &str) -> f64 {
        self.dosages.get(fertilizer).copied().unwrap_or(0.0)
    }

    /// Negative and non-finite values are stored as 0.
    pub fn set(&mut self, fertilizer: &str, dosage: f64) {
        let value = if dosage.is_finite() { dosage.max(0.0) } else { 0.0 };
        self.dosages.insert(fertilizer.to_string(), value);
    }

    pub fn add(&mut self, fertilizer: &str, dosage: f64) {
        let current = self.get(fertilizer);
        self.set(fertilizer, current + dosage);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.dosages.iter().map(|(name, dosage)| (name.as_str(), *dosage))
    }

    pub fn len(&self) -> usize {
        self.dosages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dosages.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.dosages.values().sum()
    }

    pub fn max_individual(&self) -> f64 {
        self.dosages.values().copied().fold(0.0, f64::max)
    }

    pub fn active_count(&self) -> usize {
        self.dosages.values().filter(|d| **d > 0.0).count()
    }

    /// Zeroes dosages below the significance threshold of their salt class.
    pub fn prune(&mut self, fertilizers: &[FertilizerComposition], macro_threshold: f64, micro_threshold: f64) {
        for fertilizer in fertilizers {
            let threshold = if fertilizer.is_micro_salt() {
                micro_threshold
            } else {
                macro_threshold
            };
            if let Some(dosage) = self.dosages.get_mut(fertilizer.name()) {
                if *dosage < threshold {
                    *dosage = 0.0;
                }
            }
        }
    }

    /// Total product mass in grams for a batch of `volume_liters`.
    pub fn grams_for_volume(&self, volume_liters: f64) -> BTreeMap<String, f64> {
        self.dosages
            .iter()
            .map(|(name, dosage)| (name.clone(), dosage * volume_liters))
            .collect()
    }
}
