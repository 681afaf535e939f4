//! Constrained numerical dosage optimizer.
//!
//! Both backends consume the same [`Formulation`]. The backend is chosen once when the
//! optimizer is created: the exact simplex solver when it is compiled in (cargo feature
//! `simplex`), otherwise the least-squares solver. A failure of the chosen backend is
//! returned as is; the other backend is never tried for the same request.

pub mod formulation;
pub mod least_squares;
#[cfg(feature = "simplex")]
pub mod simplex;

use crate::{
    composition::FertilizerComposition,
    dosage::DosageVector,
    elements::ElementTable,
    error::FertiblendError,
    settings::{BackendPreference, SolverSettings},
    units, ConcentrationMap,
};
use fertiblend_schemas::limits::DosageLimit;
use formulation::Formulation;
use least_squares::LeastSquaresBackend;
use nalgebra::DVector;
use serde::Serialize;
use std::{collections::BTreeMap, fmt, time::Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Simplex,
    LeastSquares,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Simplex => "simplex",
            BackendKind::LeastSquares => "least_squares",
        }
    }

    /// Whether this backend was compiled into the crate.
    pub fn is_available(&self) -> bool {
        match self {
            BackendKind::Simplex => cfg!(feature = "simplex"),
            BackendKind::LeastSquares => true,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Optimal,
    Infeasible,
    Unbounded,
    IterationLimit,
    NumericalFailure,
}

impl SolverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolverStatus::Optimal => "optimal",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::Unbounded => "unbounded",
            SolverStatus::IterationLimit => "iteration_limit",
            SolverStatus::NumericalFailure => "numerical_failure",
        }
    }
}

/// Raw backend output, in formulation column order.
#[derive(Debug, Clone)]
pub struct BackendSolution {
    pub dosages: DVector<f64>,
    pub objective: f64,
    pub status: SolverStatus,
    pub iterations: usize,
}

pub trait SolverBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Returns only `Optimal` solutions; anything else is an `OptimizationFailed` error.
    fn solve(&self, problem: &Formulation, settings: &SolverSettings) -> Result<BackendSolution, FertiblendError>;
}

/// Resolves a preference against what is compiled in.
pub fn select_backend(preference: BackendPreference) -> Box<dyn SolverBackend> {
    let wanted = match preference {
        BackendPreference::Auto | BackendPreference::Simplex => BackendKind::Simplex,
        BackendPreference::LeastSquares => BackendKind::LeastSquares,
    };
    if preference == BackendPreference::Simplex && !BackendKind::Simplex.is_available() {
        warn!("Simplex backend requested but not compiled in; using least squares");
    }
    build_backend(wanted)
}

#[cfg(feature = "simplex")]
fn build_backend(kind: BackendKind) -> Box<dyn SolverBackend> {
    match kind {
        BackendKind::Simplex => Box::new(simplex::SimplexBackend),
        BackendKind::LeastSquares => Box::new(LeastSquaresBackend),
    }
}

#[cfg(not(feature = "simplex"))]
fn build_backend(_kind: BackendKind) -> Box<dyn SolverBackend> {
    Box::new(LeastSquaresBackend)
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub dosages: DosageVector,
    pub achieved: ConcentrationMap,
    /// Percent deviation of `achieved` from `water + fertilizer_target`, per target element.
    pub deviations_percent: BTreeMap<String, f64>,
    /// Percent charge imbalance of the achieved solution.
    pub ionic_balance_error: f64,
    pub status: SolverStatus,
    pub objective_value: f64,
    pub backend: BackendKind,
    pub iterations: usize,
    pub active_fertilizers: usize,
    pub total_dosage: f64,
    pub solver_time_seconds: f64,
}

pub struct NutrientOptimizer {
    backend: Box<dyn SolverBackend>,
    settings: SolverSettings,
}

impl NutrientOptimizer {
    /// Selects the backend from `settings.backend` and what is compiled in.
    pub fn new(settings: SolverSettings) -> Self {
        let backend = select_backend(settings.backend);
        Self { backend, settings }
    }

    pub fn with_backend(backend: Box<dyn SolverBackend>, settings: SolverSettings) -> Self {
        Self { backend, settings }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn solve(
        &self,
        elements: &ElementTable,
        targets: &ConcentrationMap,
        water: &ConcentrationMap,
        fertilizers: &[FertilizerComposition],
        limits: &[DosageLimit],
    ) -> Result<OptimizationResult, FertiblendError> {
        let started = Instant::now();
        let problem = Formulation::build(targets, water, fertilizers, limits, &self.settings)?;
        info!(
            backend = %self.backend.kind(),
            elements = problem.element_count(),
            fertilizers = problem.fertilizer_count(),
            "Solving dosage optimization"
        );
        let solution = self.backend.solve(&problem, &self.settings)?;

        let mut dosages = DosageVector::zeroed(fertilizers);
        for (index, name) in problem.fertilizers.iter().enumerate() {
            dosages.set(name, solution.dosages[index]);
        }
        dosages.prune(fertilizers, self.settings.macro_significance, self.settings.micro_significance);

        let achieved = units::achieved_concentrations(water, &dosages, fertilizers);
        let deviations_percent = problem
            .elements
            .iter()
            .enumerate()
            .map(|(e, element)| {
                let solved_for = water.get(element).copied().unwrap_or(0.0) + problem.fertilizer_targets[e];
                let got = achieved.get(element).copied().unwrap_or(0.0);
                let deviation = if solved_for > 0.0 {
                    (got - solved_for) / solved_for * 100.0
                } else {
                    0.0
                };
                (element.clone(), deviation)
            })
            .collect();
        let ionic_balance_error = units::ionic_totals(elements, &achieved).imbalance_percent();

        let result = OptimizationResult {
            active_fertilizers: dosages.active_count(),
            total_dosage: dosages.total(),
            dosages,
            achieved,
            deviations_percent,
            ionic_balance_error,
            status: solution.status,
            objective_value: solution.objective,
            backend: self.backend.kind(),
            iterations: solution.iterations,
            solver_time_seconds: started.elapsed().as_secs_f64(),
        };
        info!(
            status = result.status.as_str(),
            objective = result.objective_value,
            active = result.active_fertilizers,
            total_g_per_l = result.total_dosage,
            "Optimization complete"
        );
        Ok(result)
    }
}
