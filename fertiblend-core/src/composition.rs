use crate::{elements::MICRONUTRIENTS, error::FertiblendError, units, ConcentrationMap};
use fertiblend_schemas::fertilizer::{FertilizerRecord, IonicComposition};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_PURITY: f64 = 98.0;
pub const DEFAULT_DENSITY: f64 = 1.0;

/// Minimum micronutrient mass fraction (%) for a salt to count as a micronutrient salt.
const MICRO_SALT_FRACTION: f64 = 1.0;

/// A validated, immutable fertilizer composition.
///
/// Mass fractions are percent by weight of the product; purity is a percentage applied on
/// top of them. All fractions are finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FertilizerComposition {
    name: String,
    formula: String,
    molecular_weight: f64,
    purity: f64,
    density: f64,
    cations: BTreeMap<String, f64>,
    anions: BTreeMap<String, f64>,
    is_ph_adjuster: bool,
    required_supplement: bool,
}

impl FertilizerComposition {
    pub fn new(
        name: &str,
        formula: &str,
        molecular_weight: f64,
        purity: f64,
        cations: BTreeMap<String, f64>,
        anions: BTreeMap<String, f64>,
    ) -> Result<Self, FertiblendError> {
        let invalid = |reason: String| FertiblendError::InvalidComposition {
            name: name.to_string(),
            reason,
        };
        if name.trim().is_empty() {
            return Err(invalid("name is empty".to_string()));
        }
        if !(purity > 0.0 && purity <= 100.0) {
            return Err(invalid(format!("purity {} outside (0, 100]", purity)));
        }
        if !(molecular_weight.is_finite() && molecular_weight >= 0.0) {
            return Err(invalid(format!("molecular weight {} is invalid", molecular_weight)));
        }
        for (element, fraction) in cations.iter().chain(anions.iter()) {
            if !fraction.is_finite() || *fraction < 0.0 {
                return Err(invalid(format!("mass fraction {} for {} is invalid", fraction, element)));
            }
        }
        Ok(Self {
            name: name.to_string(),
            formula: formula.to_string(),
            molecular_weight,
            purity,
            density: DEFAULT_DENSITY,
            cations,
            anions,
            is_ph_adjuster: false,
            required_supplement: false,
        })
    }

    /// Builds a composition from a catalog record that carries its own ionic composition.
    /// Missing purity and density fall back to 98 % and 1.0 kg/L.
    pub fn from_record(record: &FertilizerRecord) -> Result<Self, FertiblendError> {
        let ionic = record.composition.clone().unwrap_or_default();
        Self::from_parts(record, ionic, record.molecular_weight.unwrap_or(0.0))
    }

    /// Applies a catalog record's identity and commercial data over a registry composition.
    pub fn from_record_with_reference(record: &FertilizerRecord, reference: &Self) -> Result<Self, FertiblendError> {
        let ionic = IonicComposition {
            cations: reference.cations.clone(),
            anions: reference.anions.clone(),
        };
        let mut composition = Self::from_parts(
            record,
            ionic,
            record.molecular_weight.unwrap_or(reference.molecular_weight),
        )?;
        if record.formula.is_none() {
            composition.formula = reference.formula.clone();
        }
        composition.is_ph_adjuster |= reference.is_ph_adjuster;
        Ok(composition)
    }

    fn from_parts(record: &FertilizerRecord, ionic: IonicComposition, molecular_weight: f64) -> Result<Self, FertiblendError> {
        let composition = Self::new(
            &record.name,
            record.formula.as_deref().unwrap_or(""),
            molecular_weight,
            record.purity.unwrap_or(DEFAULT_PURITY),
            ionic.cations,
            ionic.anions,
        )?;
        Ok(composition
            .with_density(record.density.unwrap_or(DEFAULT_DENSITY))
            .with_ph_adjuster(record.is_ph_adjuster))
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn with_ph_adjuster(mut self, is_ph_adjuster: bool) -> Self {
        self.is_ph_adjuster = is_ph_adjuster;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Marks the salt as added automatically to cover a micronutrient gap.
    pub fn as_required_supplement(mut self) -> Self {
        self.required_supplement = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn molecular_weight(&self) -> f64 {
        self.molecular_weight
    }

    pub fn purity(&self) -> f64 {
        self.purity
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn cations(&self) -> &BTreeMap<String, f64> {
        &self.cations
    }

    pub fn anions(&self) -> &BTreeMap<String, f64> {
        &self.anions
    }

    pub fn is_ph_adjuster(&self) -> bool {
        self.is_ph_adjuster
    }

    pub fn is_required_supplement(&self) -> bool {
        self.required_supplement
    }

    /// Cation plus anion mass fraction of `element`, in percent.
    pub fn mass_fraction(&self, element: &str) -> f64 {
        self.cations.get(element).copied().unwrap_or(0.0) + self.anions.get(element).copied().unwrap_or(0.0)
    }

    pub fn supplies(&self, element: &str) -> bool {
        self.mass_fraction(element) > 0.0
    }

    /// mg/L of `element` delivered per g/L of product.
    pub fn contribution_factor(&self, element: &str) -> f64 {
        self.mass_fraction(element) * self.purity / 100.0 * 1000.0 / 100.0
    }

    /// Every element this salt carries, in symbol order.
    pub fn elements(&self) -> BTreeSet<&str> {
        self.cations
            .keys()
            .chain(self.anions.keys())
            .map(String::as_str)
            .collect()
    }

    /// Element concentrations (mg/L) delivered at `dosage_g_per_l`.
    pub fn contributions_at(&self, dosage_g_per_l: f64) -> ConcentrationMap {
        let dosage_mg = dosage_g_per_l * 1000.0;
        self.elements()
            .into_iter()
            .map(|element| {
                let mg = units::element_contribution(dosage_mg, self.mass_fraction(element), self.purity);
                (element.to_string(), mg)
            })
            .collect()
    }

    /// A salt is treated as a micronutrient salt when it carries at least 1 % of any
    /// micronutrient. It then uses the finer significance threshold.
    pub fn is_micro_salt(&self) -> bool {
        MICRONUTRIENTS
            .iter()
            .any(|element| self.mass_fraction(element) >= MICRO_SALT_FRACTION)
    }
}

#[cfg(test)]
pub(crate) fn test_salt(name: &str, purity: f64, cations: &[(&str, f64)], anions: &[(&str, f64)]) -> FertilizerComposition {
    let to_map = |pairs: &[(&str, f64)]| pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    FertilizerComposition::new(name, "", 0.0, purity, to_map(cations), to_map(anions)).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_fraction() {
        let result = FertilizerComposition::new(
            "Bad Salt",
            "X",
            100.0,
            98.0,
            BTreeMap::from([("K".to_string(), -1.0)]),
            BTreeMap::new(),
        );
        assert!(matches!(result, Err(FertiblendError::InvalidComposition { .. })));
    }

    #[test]
    fn rejects_zero_purity() {
        let result = FertilizerComposition::new("Salt", "X", 100.0, 0.0, BTreeMap::new(), BTreeMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn contribution_factor_matches_unit_math() {
        let salt = test_salt("Calcium Nitrate", 98.0, &[("Ca", 16.97)], &[("N", 11.86)]);
        let factor = salt.contribution_factor("Ca");
        assert!((factor - 166.306).abs() < 1e-9, "factor {}", factor);
        let at_one = salt.contributions_at(1.0);
        assert!((at_one["Ca"] - factor).abs() < 1e-9);
        assert!((at_one["N"] - salt.contribution_factor("N")).abs() < 1e-9);
    }

    #[test]
    fn record_without_purity_uses_default() {
        let mut record = FertilizerRecord::named("Potassium Nitrate");
        record.composition = Some(IonicComposition {
            cations: BTreeMap::from([("K".to_string(), 38.67)]),
            anions: BTreeMap::from([("N".to_string(), 13.85)]),
        });
        let salt = FertilizerComposition::from_record(&record).unwrap();
        assert_eq!(salt.purity(), DEFAULT_PURITY);
        assert_eq!(salt.density(), DEFAULT_DENSITY);
        assert!(salt.supplies("K"));
        assert!(!salt.supplies("Ca"));
    }

    #[test]
    fn micro_salt_classification() {
        let chelate = test_salt("Iron Chelate", 98.0, &[("Fe", 13.0), ("Na", 6.27)], &[("N", 7.63)]);
        let nitrate = test_salt("Calcium Nitrate Boron", 98.0, &[("Ca", 15.5)], &[("N", 11.5), ("B", 0.3)]);
        assert!(chelate.is_micro_salt());
        assert!(!nitrate.is_micro_salt());
    }
}
