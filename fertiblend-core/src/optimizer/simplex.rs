//! Exact linear-program backend: dense tableau simplex with Bland's rule.
//!
//! The formulation is put in standard form with lower bounds shifted out:
//!
//! ```text
//! columns: x'_f | s+_e | s-_e | u_f | t
//! element rows:  Σ_f A[e,f]·x'_f − s+_e + s-_e = target_e − Σ_f A[e,f]·lower_f
//! bound rows:    x'_f + u_f = upper_f − lower_f
//! total row:     Σ_f x'_f + t = max_total − Σ_f lower_f
//! ```
//!
//! Every row has an identity column with a non-negative right-hand side (after flipping
//! element rows whose right-hand side is negative), so the initial basis is feasible and no
//! phase one is needed.

use super::{formulation::Formulation, BackendKind, BackendSolution, SolverBackend, SolverStatus};
use crate::{error::FertiblendError, settings::SolverSettings};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

const PIVOT_EPSILON: f64 = 1e-9;

#[derive(Debug, Default)]
pub struct SimplexBackend;

impl SolverBackend for SimplexBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Simplex
    }

    fn solve(&self, problem: &Formulation, settings: &SolverSettings) -> Result<BackendSolution, FertiblendError> {
        if !problem.is_feasible() {
            return Err(problem.failure(
                self.kind().as_str(),
                SolverStatus::Infeasible.as_str(),
                "minimum dosages exceed the total dosage ceiling",
            ));
        }

        let mut tableau = Tableau::standard_form(problem);
        let (status, iterations) = tableau.run(settings.max_iterations);
        debug!(iterations, status = status.as_str(), "Simplex finished");
        if status != SolverStatus::Optimal {
            return Err(problem.failure(self.kind().as_str(), status.as_str(), "simplex did not reach an optimum"));
        }

        let shifted = tableau.primal(problem.fertilizer_count());
        let dosages = DVector::from_iterator(
            problem.fertilizer_count(),
            (0..problem.fertilizer_count()).map(|f| (problem.lower[f] + shifted[f]).clamp(problem.lower[f], problem.upper[f])),
        );
        Ok(BackendSolution {
            objective: problem.linear_objective(&dosages),
            dosages,
            status,
            iterations,
        })
    }
}

struct Tableau {
    /// m × (n + 1); the last column is the right-hand side.
    rows: DMatrix<f64>,
    costs: Vec<f64>,
    /// Reduced cost per column, kept in sync on every pivot.
    reduced: Vec<f64>,
    basis: Vec<usize>,
}

impl Tableau {
    fn standard_form(problem: &Formulation) -> Self {
        let fertilizers = problem.fertilizer_count();
        let elements = problem.element_count();
        let n = 2 * fertilizers + 2 * elements + 1;
        let m = elements + fertilizers + 1;
        let rhs = n;

        let slack_pos = |e: usize| fertilizers + e;
        let slack_neg = |e: usize| fertilizers + elements + e;
        let upper_slack = |f: usize| fertilizers + 2 * elements + f;
        let total_slack = n - 1;

        let mut rows = DMatrix::zeros(m, n + 1);
        let mut basis = vec![0; m];
        let baseline = problem.delivered(&problem.lower);

        for e in 0..elements {
            let target = problem.fertilizer_targets[e] - baseline[e];
            let sign = if target < 0.0 { -1.0 } else { 1.0 };
            for f in 0..fertilizers {
                rows[(e, f)] = sign * problem.contribution[(e, f)];
            }
            rows[(e, slack_pos(e))] = -sign;
            rows[(e, slack_neg(e))] = sign;
            rows[(e, rhs)] = sign * target;
            basis[e] = if sign > 0.0 { slack_neg(e) } else { slack_pos(e) };
        }
        for f in 0..fertilizers {
            let row = elements + f;
            rows[(row, f)] = 1.0;
            rows[(row, upper_slack(f))] = 1.0;
            rows[(row, rhs)] = problem.upper[f] - problem.lower[f];
            basis[row] = upper_slack(f);
        }
        let total_row = elements + fertilizers;
        for f in 0..fertilizers {
            rows[(total_row, f)] = 1.0;
        }
        rows[(total_row, total_slack)] = 1.0;
        rows[(total_row, rhs)] = (problem.max_total - problem.lower.sum()).max(0.0);
        basis[total_row] = total_slack;

        let mut costs = vec![0.0; n];
        for cost in costs.iter_mut().take(fertilizers) {
            *cost = problem.dosage_weight;
        }
        for e in 0..elements {
            costs[slack_pos(e)] = problem.deviation_weights[e];
            costs[slack_neg(e)] = problem.deviation_weights[e];
        }

        let mut tableau = Self {
            rows,
            reduced: costs.clone(),
            costs,
            basis,
        };
        tableau.price();
        tableau
    }

    fn columns(&self) -> usize {
        self.rows.ncols() - 1
    }

    /// Recomputes reduced costs `c_j − c_B · column_j` from scratch.
    fn price(&mut self) {
        for j in 0..self.columns() {
            let basic_cost: f64 = self
                .basis
                .iter()
                .enumerate()
                .map(|(i, &b)| self.costs[b] * self.rows[(i, j)])
                .sum();
            self.reduced[j] = self.costs[j] - basic_cost;
        }
    }

    fn run(&mut self, max_iterations: usize) -> (SolverStatus, usize) {
        for iteration in 0..max_iterations {
            let Some(entering) = (0..self.columns()).find(|&j| self.reduced[j] < -PIVOT_EPSILON) else {
                return (SolverStatus::Optimal, iteration);
            };
            let Some(leaving) = self.ratio_test(entering) else {
                return (SolverStatus::Unbounded, iteration);
            };
            self.pivot(leaving, entering);
        }
        (SolverStatus::IterationLimit, max_iterations)
    }

    /// Minimum ratio row; ties go to the smallest basic column index.
    fn ratio_test(&self, column: usize) -> Option<usize> {
        let rhs = self.columns();
        let mut best: Option<(usize, f64)> = None;
        for i in 0..self.rows.nrows() {
            let coefficient = self.rows[(i, column)];
            if coefficient <= PIVOT_EPSILON {
                continue;
            }
            let ratio = self.rows[(i, rhs)] / coefficient;
            best = match best {
                None => Some((i, ratio)),
                Some((row, best_ratio)) => {
                    if ratio < best_ratio - PIVOT_EPSILON
                        || (ratio <= best_ratio + PIVOT_EPSILON && self.basis[i] < self.basis[row])
                    {
                        Some((i, ratio))
                    } else {
                        Some((row, best_ratio))
                    }
                }
            };
        }
        best.map(|(row, _)| row)
    }

    fn pivot(&mut self, row: usize, column: usize) {
        let width = self.rows.ncols();
        let pivot = self.rows[(row, column)];
        for j in 0..width {
            self.rows[(row, j)] /= pivot;
        }
        for i in 0..self.rows.nrows() {
            if i == row {
                continue;
            }
            let factor = self.rows[(i, column)];
            if factor == 0.0 {
                continue;
            }
            for j in 0..width {
                let value = self.rows[(row, j)];
                self.rows[(i, j)] -= factor * value;
            }
        }
        let factor = self.reduced[column];
        for j in 0..self.columns() {
            self.reduced[j] -= factor * self.rows[(row, j)];
        }
        self.basis[row] = column;
    }

    /// Values of the first `count` structural columns.
    fn primal(&self, count: usize) -> Vec<f64> {
        let rhs = self.columns();
        let mut values = vec![0.0; count];
        for (i, &b) in self.basis.iter().enumerate() {
            if b < count {
                values[b] = self.rows[(i, rhs)].max(0.0);
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{composition::test_salt, ConcentrationMap};

    fn map(pairs: &[(&str, f64)]) -> ConcentrationMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn hits_single_element_target_exactly() {
        let fertilizers = vec![test_salt("Calcium Source", 100.0, &[("Ca", 20.0)], &[])];
        let problem = Formulation::build(
            &map(&[("Ca", 100.0)]),
            &ConcentrationMap::new(),
            &fertilizers,
            &[],
            &SolverSettings::default(),
        )
        .unwrap();
        let solution = SimplexBackend.solve(&problem, &SolverSettings::default()).unwrap();
        assert_eq!(solution.status, SolverStatus::Optimal);
        // 20 % Ca at 100 % purity delivers 200 mg/L per g/L.
        assert!((solution.dosages[0] - 0.5).abs() < 1e-9, "dosage {}", solution.dosages[0]);
    }

    #[test]
    fn respects_lower_bound_overshoot() {
        let fertilizers = vec![test_salt("Calcium Source", 100.0, &[("Ca", 20.0)], &[])];
        let limits = vec![fertiblend_schemas::limits::DosageLimit {
            fertilizer: "Calcium Source".to_string(),
            min_g_per_l: Some(1.0),
            max_g_per_l: None,
        }];
        let problem = Formulation::build(
            &map(&[("Ca", 100.0)]),
            &ConcentrationMap::new(),
            &fertilizers,
            &limits,
            &SolverSettings::default(),
        )
        .unwrap();
        let solution = SimplexBackend.solve(&problem, &SolverSettings::default()).unwrap();
        assert!((solution.dosages[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn infeasible_minimums_fail_hard() {
        let fertilizers = vec![
            test_salt("A", 100.0, &[("K", 20.0)], &[]),
            test_salt("B", 100.0, &[("Ca", 20.0)], &[]),
            test_salt("C", 100.0, &[("Mg", 20.0)], &[]),
            test_salt("D", 100.0, &[("Na", 20.0)], &[]),
        ];
        let limits: Vec<_> = ["A", "B", "C", "D"]
            .iter()
            .map(|name| fertiblend_schemas::limits::DosageLimit {
                fertilizer: name.to_string(),
                min_g_per_l: Some(4.0),
                max_g_per_l: None,
            })
            .collect();
        let problem = Formulation::build(
            &map(&[("K", 100.0)]),
            &ConcentrationMap::new(),
            &fertilizers,
            &limits,
            &SolverSettings::default(),
        )
        .unwrap();
        let result = SimplexBackend.solve(&problem, &SolverSettings::default());
        match result {
            Err(FertiblendError::OptimizationFailed { backend, status, .. }) => {
                assert_eq!(backend, "simplex");
                assert_eq!(status, "infeasible");
            }
            other => panic!("expected infeasible failure, got {:?}", other),
        }
    }
}
