//! Universal properties of unit conversion, safety caps and the greedy solver.

use fertiblend_core::{
    caps::SafetyCaps,
    composition::FertilizerComposition,
    dosage::DosageVector,
    elements::ElementTable,
    greedy::GreedySolver,
    optimizer::{NutrientOptimizer, SolverStatus},
    registry::CompositionRegistry,
    settings::{BackendPreference, SolverSettings},
    units::achieved_concentrations,
    ConcentrationMap,
};
use proptest::prelude::*;
use proptest::proptest;

const ELEMENTS: [&str; 12] = ["N", "P", "K", "Ca", "Mg", "S", "Fe", "Mn", "Zn", "Cu", "B", "Mo"];

const SALTS: [&str; 8] = [
    "calcium_nitrate",
    "potassium_nitrate",
    "monopotassium_phosphate",
    "magnesium_sulfate",
    "potassium_sulfate",
    "iron_edta",
    "boric_acid",
    "micro_mix",
];

fn catalog() -> Vec<FertilizerComposition> {
    let registry = CompositionRegistry::standard().unwrap();
    SALTS
        .iter()
        .map(|key| registry.by_key(key).unwrap().composition.clone())
        .collect()
}

fn table_symbols() -> Vec<String> {
    ElementTable::standard().iter().map(|info| info.symbol.clone()).collect()
}

fn concentrations(values: &[f64]) -> ConcentrationMap {
    ELEMENTS
        .iter()
        .zip(values)
        .map(|(element, value)| (element.to_string(), *value))
        .collect()
}

fn dosage_vector(fertilizers: &[FertilizerComposition], values: &[f64]) -> DosageVector {
    let mut dosages = DosageVector::zeroed(fertilizers);
    for (fertilizer, value) in fertilizers.iter().zip(values) {
        dosages.set(fertilizer.name(), *value);
    }
    dosages
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 512,
        .. ProptestConfig::default()
    })]

    #[test]
    fn achieved_never_below_water(
        water in prop::collection::vec(0.0f64..300.0, ELEMENTS.len()),
        dosages in prop::collection::vec(0.0f64..5.0, SALTS.len()),
    ) {
        let fertilizers = catalog();
        let water = concentrations(&water);
        let achieved = achieved_concentrations(&water, &dosage_vector(&fertilizers, &dosages), &fertilizers);
        for (element, baseline) in &water {
            prop_assert!(achieved[element] >= *baseline);
        }
    }

    #[test]
    fn mass_molar_round_trip(index in 0usize..ELEMENTS.len(), mg in 0.0f64..1000.0) {
        let table = ElementTable::standard();
        let symbol = ELEMENTS[index];
        let weight = table.get(symbol).unwrap().atomic_weight;
        let back = table.mg_to_mmol(mg, symbol) * weight;
        prop_assert!((back - mg).abs() <= 1e-9 * mg.max(1.0));
    }

    #[test]
    fn milliequivalents_follow_weight_and_valence(
        symbol in prop::sample::select(table_symbols()),
        mg in 0.0f64..1000.0,
    ) {
        let table = ElementTable::standard();
        let info = table.get(&symbol).unwrap();
        let expected = mg / info.atomic_weight * f64::from(info.valence);
        let composed = table.mmol_to_meq(table.mg_to_mmol(mg, &symbol), &symbol);
        let direct = table.mg_to_meq(mg, &symbol);
        prop_assert!((composed - expected).abs() <= 1e-9 * expected.max(1e-12), "{} {} vs {}", symbol, composed, expected);
        prop_assert!((direct - composed).abs() <= 1e-9 * composed.max(1e-12), "{} {} vs {}", symbol, direct, composed);
    }

    #[test]
    fn achievable_targets_are_met_by_both_backends(
        dosages in prop::collection::vec(0.05f64..1.0, SALTS.len()),
    ) {
        let fertilizers = catalog();
        let water = ConcentrationMap::new();
        let delivered = achieved_concentrations(&water, &dosage_vector(&fertilizers, &dosages), &fertilizers);
        let targets: ConcentrationMap = delivered
            .into_iter()
            .filter(|(element, value)| ELEMENTS.contains(&element.as_str()) && *value > 0.0)
            .collect();

        for backend in [BackendPreference::Simplex, BackendPreference::LeastSquares] {
            let settings = SolverSettings { backend, ..SolverSettings::default() };
            let result = NutrientOptimizer::new(settings)
                .solve(&ElementTable::standard(), &targets, &water, &fertilizers, &[])
                .unwrap();
            prop_assert_eq!(result.status, SolverStatus::Optimal);
            prop_assert_eq!(result.deviations_percent.len(), targets.len());
            for (element, deviation) in &result.deviations_percent {
                prop_assert!(deviation.abs() <= 1.0, "{:?} {} off by {}%", backend, element, deviation);
            }
        }
    }

    #[test]
    fn strict_caps_are_idempotent(values in prop::collection::vec(0.0f64..400.0, ELEMENTS.len())) {
        let caps = SafetyCaps::standard();
        let once = caps.apply(&concentrations(&values), true);
        let twice = caps.apply(&once.targets, true);
        prop_assert_eq!(&once.targets, &twice.targets);
        prop_assert!(twice.adjustments.is_empty());
    }

    #[test]
    fn more_product_never_lowers_its_elements(
        dosages in prop::collection::vec(0.0f64..5.0, SALTS.len()),
        index in 0usize..SALTS.len(),
        extra in 0.0f64..2.0,
    ) {
        let fertilizers = catalog();
        let water = ConcentrationMap::new();
        let before = dosage_vector(&fertilizers, &dosages);
        let mut after = before.clone();
        after.add(fertilizers[index].name(), extra);

        let low = achieved_concentrations(&water, &before, &fertilizers);
        let high = achieved_concentrations(&water, &after, &fertilizers);
        for element in fertilizers[index].elements() {
            let lo = low.get(element).copied().unwrap_or(0.0);
            let hi = high.get(element).copied().unwrap_or(0.0);
            prop_assert!(hi + 1e-9 >= lo, "{} fell from {} to {}", element, lo, hi);
        }
    }

    #[test]
    fn greedy_is_deterministic(
        targets in prop::collection::vec(0.0f64..300.0, ELEMENTS.len()),
        water in prop::collection::vec(0.0f64..50.0, ELEMENTS.len()),
    ) {
        let fertilizers = catalog();
        let settings = SolverSettings::default();
        let solver = GreedySolver::new(&settings);
        let (targets, water) = (concentrations(&targets), concentrations(&water));
        let first = solver.solve(&targets, &water, &fertilizers);
        let second = solver.solve(&targets, &water, &fertilizers);
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
