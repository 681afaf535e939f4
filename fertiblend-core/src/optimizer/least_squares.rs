//! Fallback backend: bound-constrained weighted least squares.
//!
//! Minimizes `Σ_e w·(r_e / max(t_e, ε))² + w_d·Σ_f x_f` where `r = A·x − t`, subject to the
//! dosage box and the total ceiling. The objective is a convex quadratic, so each iteration
//! tries a Newton step on the free variables inside a trust radius and falls back to a
//! projected-gradient step with backtracking when the Newton step does not reduce it.

use super::{formulation::Formulation, BackendKind, BackendSolution, SolverBackend, SolverStatus};
use crate::{error::FertiblendError, settings::SolverSettings};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace, warn};

const INITIAL_DOSAGE: f64 = 0.1;
const BOUND_EPSILON: f64 = 1e-12;
const MIN_RADIUS: f64 = 1e-12;
const MAX_RADIUS: f64 = 100.0;
const BISECTION_STEPS: usize = 100;

#[derive(Debug, Default)]
pub struct LeastSquaresBackend;

struct Problem<'a> {
    formulation: &'a Formulation,
    weights: DVector<f64>,
    hessian: DMatrix<f64>,
    /// Largest diagonal Hessian entry, at least 1.
    curvature: f64,
}

impl<'a> Problem<'a> {
    fn new(formulation: &'a Formulation, settings: &SolverSettings) -> Self {
        let weights = formulation.fertilizer_targets.map(|t| {
            if t > 0.0 {
                settings.deviation_weight / t.max(settings.tolerance).powi(2)
            } else {
                0.0
            }
        });
        let a = &formulation.contribution;
        let weighted = DMatrix::from_fn(a.nrows(), a.ncols(), |e, f| weights[e] * a[(e, f)]);
        let hessian = a.tr_mul(&weighted) * 2.0;
        let curvature = hessian.diagonal().iter().copied().fold(1.0, f64::max);
        Self {
            formulation,
            weights,
            hessian,
            curvature,
        }
    }

    fn residual(&self, x: &DVector<f64>) -> DVector<f64> {
        self.formulation.delivered(x) - &self.formulation.fertilizer_targets
    }

    fn objective(&self, x: &DVector<f64>) -> f64 {
        let r = self.residual(x);
        r.component_mul(&r).dot(&self.weights) + self.formulation.dosage_weight * x.sum()
    }

    fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
        let weighted_residual = self.residual(x).component_mul(&self.weights);
        let mut g = self.formulation.contribution.tr_mul(&weighted_residual) * 2.0;
        g.add_scalar_mut(self.formulation.dosage_weight);
        g
    }

    /// Euclidean projection onto `{lower ≤ x ≤ upper, Σx ≤ max_total}`.
    fn project(&self, y: &DVector<f64>) -> DVector<f64> {
        let lower = &self.formulation.lower;
        let upper = &self.formulation.upper;
        let shifted = |lambda: f64| {
            DVector::from_iterator(y.len(), (0..y.len()).map(|i| (y[i] - lambda).clamp(lower[i], upper[i])))
        };
        let clipped = shifted(0.0);
        if clipped.sum() <= self.formulation.max_total {
            return clipped;
        }
        let mut lo = 0.0;
        let mut hi = (0..y.len()).map(|i| y[i] - lower[i]).fold(0.0, f64::max);
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if shifted(mid).sum() > self.formulation.max_total {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        shifted(hi)
    }

    /// Infinity norm of the projected-gradient step of length `step`; zero exactly at a
    /// constrained optimum.
    fn stationarity(&self, x: &DVector<f64>, g: &DVector<f64>, step: f64) -> f64 {
        (self.project(&(x - g * step)) - x).amax()
    }

    /// Newton direction on the variables not pinned at a bound. When the total ceiling is
    /// active the step is restricted to keep the sum constant.
    fn newton_direction(&self, x: &DVector<f64>, g: &DVector<f64>) -> Option<DVector<f64>> {
        let lower = &self.formulation.lower;
        let upper = &self.formulation.upper;
        let free: Vec<usize> = (0..x.len())
            .filter(|&i| {
                let pinned_low = x[i] <= lower[i] + BOUND_EPSILON && g[i] > 0.0;
                let pinned_high = x[i] >= upper[i] - BOUND_EPSILON && g[i] < 0.0;
                !(pinned_low || pinned_high)
            })
            .collect();
        if free.is_empty() {
            return None;
        }
        let k = free.len();
        let max_diag = free.iter().map(|&i| self.hessian[(i, i)]).fold(0.0, f64::max);
        let regularization = 1e-10 * (1.0 + max_diag);
        let sum_active = x.sum() >= self.formulation.max_total - 1e-9;

        let step = if sum_active {
            let mut kkt = DMatrix::zeros(k + 1, k + 1);
            let mut rhs = DVector::zeros(k + 1);
            for (a, &i) in free.iter().enumerate() {
                for (b, &j) in free.iter().enumerate() {
                    kkt[(a, b)] = self.hessian[(i, j)];
                }
                kkt[(a, a)] += regularization;
                kkt[(a, k)] = 1.0;
                kkt[(k, a)] = 1.0;
                rhs[a] = -g[i];
            }
            kkt.lu().solve(&rhs)?.rows(0, k).into_owned()
        } else {
            let mut reduced = DMatrix::from_fn(k, k, |a, b| self.hessian[(free[a], free[b])]);
            for a in 0..k {
                reduced[(a, a)] += regularization;
            }
            let rhs = DVector::from_iterator(k, free.iter().map(|&i| -g[i]));
            reduced.cholesky()?.solve(&rhs)
        };

        let mut direction = DVector::zeros(x.len());
        for (a, &i) in free.iter().enumerate() {
            direction[i] = step[a];
        }
        Some(direction)
    }

    /// Projected steepest descent with an exact first step and halving backtracking.
    fn gradient_step(&self, x: &DVector<f64>, g: &DVector<f64>, f0: f64, radius: f64) -> Option<DVector<f64>> {
        let g_norm = g.amax();
        if g_norm == 0.0 {
            return None;
        }
        let curvature = g.dot(&(&self.hessian * g));
        let exact = if curvature > 0.0 { g.dot(g) / curvature } else { f64::INFINITY };
        let mut alpha = exact.min(radius / g_norm);
        for _ in 0..50 {
            let candidate = self.project(&(x - g * alpha));
            if self.objective(&candidate) < f0 {
                return Some(candidate);
            }
            alpha *= 0.5;
        }
        None
    }
}

impl SolverBackend for LeastSquaresBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::LeastSquares
    }

    fn solve(&self, formulation: &Formulation, settings: &SolverSettings) -> Result<BackendSolution, FertiblendError> {
        let backend = self.kind().as_str();
        if !formulation.is_feasible() {
            return Err(formulation.failure(
                backend,
                SolverStatus::Infeasible.as_str(),
                "minimum dosages exceed the total dosage ceiling",
            ));
        }

        let problem = Problem::new(formulation, settings);
        let n = formulation.fertilizer_count();
        let start = INITIAL_DOSAGE.min(formulation.max_total / n as f64);
        let mut x = problem.project(&DVector::from_element(n, start));
        let mut radius = 1.0;
        let mut iterations = 0;

        for iteration in 0..settings.max_iterations {
            iterations = iteration + 1;
            let g = problem.gradient(&x);
            let f0 = problem.objective(&x);
            if !f0.is_finite() || g.iter().any(|v| !v.is_finite()) {
                return Err(formulation.failure(
                    backend,
                    SolverStatus::NumericalFailure.as_str(),
                    "objective or gradient is not finite",
                ));
            }
            let stationarity = problem.stationarity(&x, &g, 1.0);
            if stationarity < settings.tolerance {
                debug!(iteration, objective = f0, "Least-squares converged");
                return Ok(BackendSolution {
                    objective: f0,
                    dosages: x,
                    status: SolverStatus::Optimal,
                    iterations: iteration,
                });
            }

            let newton = problem.newton_direction(&x, &g).and_then(|mut direction| {
                let length = direction.amax();
                let clipped = length > radius;
                if clipped {
                    direction *= radius / length;
                }
                let candidate = problem.project(&(&x + direction));
                (problem.objective(&candidate) < f0).then_some((candidate, clipped))
            });

            let next = match newton {
                Some((candidate, clipped)) => {
                    if clipped {
                        radius = (radius * 2.0).min(MAX_RADIUS);
                    }
                    Some(candidate)
                }
                None => problem.gradient_step(&x, &g, f0, radius),
            };

            match next {
                Some(candidate) => {
                    let moved = (&candidate - &x).amax();
                    x = candidate;
                    trace!(iteration, moved, radius, "Least-squares step accepted");
                    if moved < MIN_RADIUS {
                        break;
                    }
                }
                None => {
                    radius *= 0.25;
                    if radius < MIN_RADIUS {
                        break;
                    }
                }
            }
            if iteration + 1 == settings.max_iterations {
                return Err(formulation.failure(
                    backend,
                    SolverStatus::IterationLimit.as_str(),
                    "least-squares iteration limit reached",
                ));
            }
        }

        // No descent step is left. Gradient rounding grows with curvature, so the stalled
        // point is checked with a curvature-scaled step.
        let stationarity = problem.stationarity(&x, &problem.gradient(&x), 1.0 / problem.curvature);
        if stationarity >= settings.tolerance {
            warn!(iterations, stationarity, "Least-squares stalled before reaching stationarity");
            return Err(formulation.failure(
                backend,
                SolverStatus::NumericalFailure.as_str(),
                "least-squares stalled before reaching stationarity",
            ));
        }
        let objective = problem.objective(&x);
        debug!(iterations, objective, "Least-squares converged after stalling");
        Ok(BackendSolution {
            objective,
            dosages: x,
            status: SolverStatus::Optimal,
            iterations,
        })
    }
}
