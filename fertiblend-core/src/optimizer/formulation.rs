use crate::{composition::FertilizerComposition, error::FertiblendError, settings::SolverSettings, ConcentrationMap};
use fertiblend_schemas::limits::DosageLimit;
use nalgebra::{DMatrix, DVector};

/// The backend-agnostic optimization problem.
///
/// Rows are target elements, columns are fertilizers. `contribution[(e, f)]` is the mg/L of
/// element `e` delivered per g/L of fertilizer `f`. Elements whose fertilizer target is zero
/// carry a zero deviation weight and do not constrain the solution.
#[derive(Debug, Clone)]
pub struct Formulation {
    pub elements: Vec<String>,
    pub fertilizers: Vec<String>,
    pub contribution: DMatrix<f64>,
    /// `max(0, target − water)` per element.
    pub fertilizer_targets: DVector<f64>,
    /// `deviation_weight / fertilizer_target`, 0 where the target is 0.
    pub deviation_weights: DVector<f64>,
    pub dosage_weight: f64,
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
    pub max_total: f64,
}

impl Formulation {
    pub fn build(
        targets: &ConcentrationMap,
        water: &ConcentrationMap,
        fertilizers: &[FertilizerComposition],
        limits: &[DosageLimit],
        settings: &SolverSettings,
    ) -> Result<Self, FertiblendError> {
        if fertilizers.is_empty() {
            return Err(FertiblendError::NoFertilizers);
        }
        let elements: Vec<String> = targets.keys().cloned().collect();
        let names: Vec<String> = fertilizers.iter().map(|f| f.name().to_string()).collect();

        let contribution = DMatrix::from_fn(elements.len(), fertilizers.len(), |e, f| {
            fertilizers[f].contribution_factor(&elements[e])
        });
        let fertilizer_targets = DVector::from_iterator(
            elements.len(),
            elements.iter().map(|element| {
                let baseline = water.get(element).copied().unwrap_or(0.0);
                (targets[element] - baseline).max(0.0)
            }),
        );
        let deviation_weights = fertilizer_targets.map(|t| {
            if t > 0.0 {
                settings.deviation_weight / t.max(settings.tolerance)
            } else {
                0.0
            }
        });

        let mut lower = DVector::zeros(fertilizers.len());
        let mut upper = DVector::from_element(fertilizers.len(), settings.max_individual_dosage);
        for limit in limits {
            let Some(index) = names.iter().position(|n| *n == limit.fertilizer) else {
                return Err(FertiblendError::InvalidDosageLimit {
                    fertilizer: limit.fertilizer.clone(),
                    reason: "fertilizer is not part of the calculation".to_string(),
                });
            };
            let min = limit.min_g_per_l.unwrap_or(0.0);
            let max = limit
                .max_g_per_l
                .unwrap_or(settings.max_individual_dosage)
                .min(settings.max_individual_dosage);
            if min < 0.0 || min > max {
                return Err(FertiblendError::InvalidDosageLimit {
                    fertilizer: limit.fertilizer.clone(),
                    reason: format!("window [{}, {}] g/L is empty or negative", min, max),
                });
            }
            lower[index] = min;
            upper[index] = max;
        }

        Ok(Self {
            elements,
            fertilizers: names,
            contribution,
            fertilizer_targets,
            deviation_weights,
            dosage_weight: settings.dosage_weight,
            lower,
            upper,
            max_total: settings.max_total_dosage,
        })
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn fertilizer_count(&self) -> usize {
        self.fertilizers.len()
    }

    /// Mandatory minimum dosages must fit under the total ceiling.
    pub fn is_feasible(&self) -> bool {
        self.lower.sum() <= self.max_total + 1e-12
    }

    /// mg/L delivered per element by dosage vector `x`.
    pub fn delivered(&self, x: &DVector<f64>) -> DVector<f64> {
        &self.contribution * x
    }

    /// Weighted absolute deviation plus dosage usage: the linear-program objective.
    pub fn linear_objective(&self, x: &DVector<f64>) -> f64 {
        let residual = self.delivered(x) - &self.fertilizer_targets;
        self.deviation_weights.dot(&residual.abs()) + self.dosage_weight * x.sum()
    }

    pub fn failure(&self, backend: &str, status: &str, reason: &str) -> FertiblendError {
        FertiblendError::OptimizationFailed {
            backend: backend.to_string(),
            status: status.to_string(),
            reason: reason.to_string(),
            elements: self.element_count(),
            fertilizers: self.fertilizer_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::test_salt;

    #[test]
    fn builds_contribution_matrix_and_targets() {
        let fertilizers = vec![
            test_salt("Calcium Nitrate", 98.0, &[("Ca", 16.97)], &[("N", 11.86)]),
            test_salt("Potassium Nitrate", 98.0, &[("K", 38.67)], &[("N", 13.85)]),
        ];
        let targets = ConcentrationMap::from([("Ca".to_string(), 180.0), ("Mg".to_string(), 10.0)]);
        let water = ConcentrationMap::from([("Ca".to_string(), 20.0), ("Mg".to_string(), 15.0)]);
        let problem = Formulation::build(&targets, &water, &fertilizers, &[], &SolverSettings::default()).unwrap();

        assert_eq!(problem.elements, vec!["Ca", "Mg"]);
        assert!((problem.contribution[(0, 0)] - 166.306).abs() < 1e-9);
        assert_eq!(problem.contribution[(0, 1)], 0.0);
        assert_eq!(problem.fertilizer_targets[0], 160.0);
        assert_eq!(problem.fertilizer_targets[1], 0.0);
        assert!((problem.deviation_weights[0] - 1000.0 / 160.0).abs() < 1e-12);
        assert_eq!(problem.deviation_weights[1], 0.0);
        assert_eq!(problem.upper[1], 5.0);
    }

    #[test]
    fn rejects_limit_for_unknown_fertilizer() {
        let fertilizers = vec![test_salt("Calcium Nitrate", 98.0, &[("Ca", 16.97)], &[])];
        let limits = vec![DosageLimit {
            fertilizer: "Potassium Nitrate".to_string(),
            min_g_per_l: Some(0.1),
            max_g_per_l: None,
        }];
        let result = Formulation::build(
            &ConcentrationMap::new(),
            &ConcentrationMap::new(),
            &fertilizers,
            &limits,
            &SolverSettings::default(),
        );
        assert!(matches!(result, Err(FertiblendError::InvalidDosageLimit { .. })));
    }

    #[test]
    fn limits_are_clipped_to_individual_ceiling() {
        let fertilizers = vec![test_salt("Calcium Nitrate", 98.0, &[("Ca", 16.97)], &[])];
        let limits = vec![DosageLimit {
            fertilizer: "Calcium Nitrate".to_string(),
            min_g_per_l: Some(0.5),
            max_g_per_l: Some(9.0),
        }];
        let problem = Formulation::build(
            &ConcentrationMap::new(),
            &ConcentrationMap::new(),
            &fertilizers,
            &limits,
            &SolverSettings::default(),
        )
        .unwrap();
        assert_eq!(problem.lower[0], 0.5);
        assert_eq!(problem.upper[0], 5.0);
    }
}
