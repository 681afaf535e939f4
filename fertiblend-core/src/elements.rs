use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Macronutrients in greedy priority order.
pub const MACRONUTRIENTS: [&str; 6] = ["P", "Ca", "K", "Mg", "N", "S"];
/// Micronutrients in greedy priority order.
pub const MICRONUTRIENTS: [&str; 6] = ["Fe", "Mn", "Zn", "Cu", "B", "Mo"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NutrientClass {
    Macro,
    Micro,
    Other,
}

/// Which side of the charge balance an element is counted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeRole {
    Cation,
    Anion,
    Uncharged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementInfo {
    pub symbol: String,
    /// g/mol
    pub atomic_weight: f64,
    pub valence: u32,
    pub class: NutrientClass,
    pub role: ChargeRole,
}

impl ElementInfo {
    pub fn new(
        symbol: &str,
        atomic_weight: f64,
        valence: u32,
        class: NutrientClass,
        role: ChargeRole,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            atomic_weight,
            valence,
            class,
            role,
        }
    }
}

// symbol, g/mol, valence, class, role
const STANDARD_ELEMENTS: [(&str, f64, u32, NutrientClass, ChargeRole); 19] = [
    ("N", 14.01, 1, NutrientClass::Macro, ChargeRole::Anion),
    ("P", 30.97, 1, NutrientClass::Macro, ChargeRole::Anion),
    ("K", 39.10, 1, NutrientClass::Macro, ChargeRole::Cation),
    ("Ca", 40.08, 2, NutrientClass::Macro, ChargeRole::Cation),
    ("Mg", 24.31, 2, NutrientClass::Macro, ChargeRole::Cation),
    ("S", 32.06, 2, NutrientClass::Macro, ChargeRole::Anion),
    ("Fe", 55.85, 2, NutrientClass::Micro, ChargeRole::Cation),
    ("Mn", 54.94, 2, NutrientClass::Micro, ChargeRole::Cation),
    ("Zn", 65.38, 2, NutrientClass::Micro, ChargeRole::Cation),
    ("Cu", 63.55, 2, NutrientClass::Micro, ChargeRole::Cation),
    ("B", 10.81, 3, NutrientClass::Micro, ChargeRole::Uncharged),
    ("Mo", 95.95, 6, NutrientClass::Micro, ChargeRole::Anion),
    ("Na", 22.99, 1, NutrientClass::Other, ChargeRole::Cation),
    ("Cl", 35.45, 1, NutrientClass::Other, ChargeRole::Anion),
    ("NH4", 18.04, 1, NutrientClass::Other, ChargeRole::Cation),
    ("HCO3", 61.02, 1, NutrientClass::Other, ChargeRole::Anion),
    ("NO3", 62.00, 1, NutrientClass::Other, ChargeRole::Anion),
    ("H2PO4", 96.99, 1, NutrientClass::Other, ChargeRole::Anion),
    ("SO4", 96.06, 2, NutrientClass::Other, ChargeRole::Anion),
];

/// Static atomic weights and valences, keyed by element symbol.
///
/// Lookups are case-sensitive (`Ca`, not `CA`). The table may be incomplete: conversions of
/// an unknown symbol return zero and log a data-quality warning instead of failing.
#[derive(Debug, Clone)]
pub struct ElementTable {
    elements: BTreeMap<String, ElementInfo>,
}

impl ElementTable {
    pub fn standard() -> Self {
        Self::from_elements(STANDARD_ELEMENTS.iter().map(|(symbol, weight, valence, class, role)| {
            ElementInfo::new(symbol, *weight, *valence, *class, *role)
        }))
    }

    pub fn from_elements<I: IntoIterator<Item = ElementInfo>>(elements: I) -> Self {
        Self {
            elements: elements
                .into_iter()
                .map(|info| (info.symbol.clone(), info))
                .collect(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&ElementInfo> {
        self.elements.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.elements.contains_key(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementInfo> {
        self.elements.values()
    }

    pub fn class_of(&self, symbol: &str) -> NutrientClass {
        self.get(symbol).map_or(NutrientClass::Other, |info| info.class)
    }

    pub fn role_of(&self, symbol: &str) -> ChargeRole {
        self.get(symbol).map_or(ChargeRole::Uncharged, |info| info.role)
    }

    /// mg/L → mmol/L.
    pub fn mg_to_mmol(&self, mg_per_l: f64, symbol: &str) -> f64 {
        match self.get(symbol) {
            Some(info) if info.atomic_weight > 0.0 => mg_per_l / info.atomic_weight,
            _ => {
                warn!(element = symbol, "No atomic weight for element; mmol/L reported as 0");
                0.0
            }
        }
    }

    /// mmol/L → meq/L.
    pub fn mmol_to_meq(&self, mmol_per_l: f64, symbol: &str) -> f64 {
        match self.get(symbol) {
            Some(info) => mmol_per_l * f64::from(info.valence),
            None => {
                warn!(element = symbol, "No valence for element; meq/L reported as 0");
                0.0
            }
        }
    }

    /// mg/L → meq/L with a single lookup.
    pub fn mg_to_meq(&self, mg_per_l: f64, symbol: &str) -> f64 {
        match self.get(symbol) {
            Some(info) if info.atomic_weight > 0.0 => {
                mg_per_l / info.atomic_weight * f64::from(info.valence)
            }
            _ => {
                warn!(element = symbol, "No atomic weight for element; meq/L reported as 0");
                0.0
            }
        }
    }

    /// Symbols from `symbols` that the table cannot convert, deduplicated and sorted.
    pub fn unknown_symbols<'a, I>(&self, symbols: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut unknown: Vec<String> = symbols
            .into_iter()
            .filter(|s| !self.contains(s))
            .cloned()
            .collect();
        unknown.sort();
        unknown.dedup();
        unknown
    }
}

impl Default for ElementTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calcium_conversions() {
        let table = ElementTable::standard();
        let mmol = table.mg_to_mmol(160.0, "Ca");
        assert!((mmol - 160.0 / 40.08).abs() < 1e-12);
        assert!((table.mmol_to_meq(mmol, "Ca") - 2.0 * mmol).abs() < 1e-12);
    }

    #[test]
    fn boron_and_nitrogen_conventions() {
        let table = ElementTable::standard();
        let boron = table.get("B").unwrap();
        assert_eq!((boron.valence, boron.role), (3, ChargeRole::Uncharged));
        assert!((table.mg_to_meq(10.81, "B") - 3.0).abs() < 1e-12);

        // Nitrogen is counted as nitrate: one charge per N on the anion side.
        let nitrogen = table.get("N").unwrap();
        assert_eq!((nitrogen.valence, nitrogen.role), (1, ChargeRole::Anion));
        assert!((table.mg_to_meq(140.1, "N") - 10.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_element_converts_to_zero() {
        let table = ElementTable::standard();
        assert_eq!(table.mg_to_mmol(10.0, "Si"), 0.0);
        assert_eq!(table.mmol_to_meq(1.0, "Si"), 0.0);
        assert_eq!(table.mg_to_meq(10.0, "Si"), 0.0);
        assert_eq!(table.class_of("Si"), NutrientClass::Other);
    }

    #[test]
    fn weightless_entry_has_no_meq() {
        let table = ElementTable::from_elements([ElementInfo::new(
            "X",
            0.0,
            2,
            NutrientClass::Other,
            ChargeRole::Cation,
        )]);
        assert_eq!(table.mg_to_meq(5.0, "X"), 0.0);
    }

    #[test]
    fn classifies_nutrients() {
        let table = ElementTable::standard();
        for symbol in MACRONUTRIENTS {
            assert_eq!(table.class_of(symbol), NutrientClass::Macro, "{}", symbol);
        }
        for symbol in MICRONUTRIENTS {
            assert_eq!(table.class_of(symbol), NutrientClass::Micro, "{}", symbol);
        }
        assert_eq!(table.role_of("NH4"), ChargeRole::Cation);
        assert_eq!(table.role_of("B"), ChargeRole::Uncharged);
    }

    #[test]
    fn reports_unknown_symbols_once() {
        let table = ElementTable::standard();
        let symbols = vec!["Si".to_string(), "Ca".to_string(), "Si".to_string(), "Co".to_string()];
        assert_eq!(table.unknown_symbols(&symbols), vec!["Co".to_string(), "Si".to_string()]);
    }
}
