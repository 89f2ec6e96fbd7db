//! Projected Levenberg-Marquardt least squares.
//!
//! Minimises `Σ wᵢ (yᵢ - f(xᵢ; p))²` over the parameters of a
//! [`ParametricModel`]. Every trial point is projected onto the model's
//! feasible region before it is evaluated, so the returned parameters always
//! satisfy the model constraints.

use faer::Mat;
use faer::linalg::solvers::Solve;
use thiserror::Error;

use crate::config::FittingConfig;

use super::WeightedObservation;

/// Floor for diagonal entries of the damping term.
const MIN_DIAGONAL: f64 = 1e-300;

/// Damping beyond which the current point is treated as a constrained minimum.
const MAX_DAMPING: f64 = 1e16;

const DAMPING_UP: f64 = 10.0;
const DAMPING_DOWN: f64 = 10.0;

/// A differentiable model with a projection onto its feasible region.
pub trait ParametricModel {
    fn param_count(&self) -> usize;

    fn value(&self, x: f64, params: &[f64]) -> f64;

    /// Partial derivatives of `value` with respect to each parameter.
    fn gradient(&self, x: f64, params: &[f64]) -> Vec<f64>;

    /// Projects `params` onto the feasible region.
    fn validate(&self, params: Vec<f64>) -> Vec<f64>;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("no convergence after {0} iterations")]
    MaxIterations(usize),

    #[error("no convergence after {0} evaluations")]
    MaxEvaluations(usize),

    #[error("model produced a non-finite residual")]
    NonFinite,

    #[error("normal equations are singular")]
    Singular,
}

/// Converged solution.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimum {
    pub params: Vec<f64>,
    /// `sqrt(Σ wᵢ rᵢ² / m)` at `params`.
    pub rms: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

struct Evaluator<'a, M> {
    model: &'a M,
    observations: &'a [WeightedObservation],
    evaluations: usize,
    max_evaluations: usize,
}

impl<M: ParametricModel> Evaluator<'_, M> {
    /// Weighted sum of squared residuals, counted against the budget.
    fn cost(&mut self, params: &[f64]) -> Result<f64, SolverError> {
        if self.evaluations >= self.max_evaluations {
            return Err(SolverError::MaxEvaluations(self.evaluations));
        }
        self.evaluations += 1;

        let cost = self
            .observations
            .iter()
            .map(|o| {
                let r = o.y - self.model.value(o.x, params);
                o.weight * r * r
            })
            .sum::<f64>();
        Ok(cost)
    }

    /// `JᵀWJ` and `JᵀWr` at `params`.
    fn normal_equations(&self, params: &[f64]) -> Result<(Mat<f64>, Vec<f64>), SolverError> {
        let n = self.model.param_count();
        let mut jtwj = Mat::<f64>::zeros(n, n);
        let mut jtwr = vec![0.0; n];

        for o in self.observations {
            let r = o.y - self.model.value(o.x, params);
            let grad = self.model.gradient(o.x, params);
            if !r.is_finite() || grad.iter().any(|g| !g.is_finite()) {
                return Err(SolverError::NonFinite);
            }
            for i in 0..n {
                jtwr[i] += o.weight * grad[i] * r;
                for j in 0..n {
                    jtwj[(i, j)] += o.weight * grad[i] * grad[j];
                }
            }
        }

        Ok((jtwj, jtwr))
    }
}

/// Fits `model` to `observations` starting from `start`.
///
/// Terminates when the relative cost decrease falls below
/// `cost_tolerance`, the relative parameter change falls below
/// `parameter_tolerance`, the gradient is orthogonal to the residual within
/// `orthogonality_tolerance`, the fit is exact, or no damped step along the
/// feasible region reduces the cost any further.
pub fn least_squares<M: ParametricModel>(
    model: &M,
    observations: &[WeightedObservation],
    start: Vec<f64>,
    cfg: &FittingConfig,
) -> Result<Optimum, SolverError> {
    let n = model.param_count();
    let m = observations.len();
    let mut eval = Evaluator {
        model,
        observations,
        evaluations: 0,
        max_evaluations: cfg.max_evaluations,
    };

    let mut params = model.validate(start);
    let mut cost = eval.cost(&params)?;
    if !cost.is_finite() {
        return Err(SolverError::NonFinite);
    }

    let scale = observations
        .iter()
        .map(|o| o.weight * o.y * o.y)
        .sum::<f64>();
    let exact = f64::EPSILON * f64::EPSILON * scale.max(f64::MIN_POSITIVE);

    let mut damping = cfg.initial_damping;
    let mut iterations = 0;

    let converged = |params: Vec<f64>, cost: f64, iterations: usize, evaluations: usize| Optimum {
        params,
        rms: (cost / m as f64).sqrt(),
        iterations,
        evaluations,
    };

    while iterations < cfg.max_iterations {
        iterations += 1;

        if cost <= exact {
            return Ok(converged(params, cost, iterations, eval.evaluations));
        }

        let (jtwj, jtwr) = eval.normal_equations(&params)?;

        // Cosine between the residual and each Jacobian column.
        let residual_norm = cost.sqrt();
        let orthogonal = (0..n).all(|j| {
            let col_norm = jtwj[(j, j)].sqrt();
            col_norm == 0.0 || jtwr[j].abs() / (residual_norm * col_norm) <= cfg.orthogonality_tolerance
        });
        if orthogonal {
            return Ok(converged(params, cost, iterations, eval.evaluations));
        }

        loop {
            let step = damped_step(&jtwj, &jtwr, damping, &vec![None; n])?;
            let mut trial = model.validate(add(&params, &step));

            // Freeze coordinates the projection moved and re-solve for the rest.
            let fixed: Vec<Option<f64>> = (0..n)
                .map(|i| (trial[i] != params[i] + step[i]).then(|| trial[i] - params[i]))
                .collect();
            if fixed.iter().any(Option::is_some) && fixed.iter().any(Option::is_none) {
                let step = damped_step(&jtwj, &jtwr, damping, &fixed)?;
                trial = model.validate(add(&params, &step));
            }

            let trial_cost = eval.cost(&trial)?;

            if trial_cost.is_finite() && trial_cost < cost {
                let decrease = (cost - trial_cost) / cost;
                let change = relative_change(&params, &trial);

                params = trial;
                cost = trial_cost;
                damping = (damping / DAMPING_DOWN).max(f64::MIN_POSITIVE);

                if decrease <= cfg.cost_tolerance || change <= cfg.parameter_tolerance {
                    return Ok(converged(params, cost, iterations, eval.evaluations));
                }
                break;
            }

            damping *= DAMPING_UP;
            if damping > MAX_DAMPING {
                // Every feasible step increases the cost.
                return Ok(converged(params, cost, iterations, eval.evaluations));
            }
        }
    }

    Err(SolverError::MaxIterations(iterations))
}

/// Solves the damped normal equations for the coordinates not in `fixed`,
/// with the fixed ones pinned to the given step.
fn damped_step(
    jtwj: &Mat<f64>,
    jtwr: &[f64],
    damping: f64,
    fixed: &[Option<f64>],
) -> Result<Vec<f64>, SolverError> {
    let free: Vec<usize> = (0..fixed.len()).filter(|&i| fixed[i].is_none()).collect();
    let mut step: Vec<f64> = fixed.iter().map(|f| f.unwrap_or(0.0)).collect();
    if free.is_empty() {
        return Ok(step);
    }

    let k = free.len();
    let lhs = Mat::from_fn(k, k, |i, j| {
        let v = jtwj[(free[i], free[j])];
        if i == j {
            v + damping * v.max(MIN_DIAGONAL)
        } else {
            v
        }
    });
    let rhs = Mat::from_fn(k, 1, |i, _| {
        let row = free[i];
        let pinned = (0..fixed.len())
            .filter_map(|c| fixed[c].map(|d| jtwj[(row, c)] * d))
            .sum::<f64>();
        jtwr[row] - pinned
    });
    let delta = lhs.partial_piv_lu().solve(rhs);

    for (i, &idx) in free.iter().enumerate() {
        let d = delta[(i, 0)];
        if !d.is_finite() {
            return Err(SolverError::Singular);
        }
        step[idx] = d;
    }
    Ok(step)
}

fn add(params: &[f64], step: &[f64]) -> Vec<f64> {
    params.iter().zip(step).map(|(p, d)| p + d).collect()
}

fn relative_change(from: &[f64], to: &[f64]) -> f64 {
    let norm = from.iter().map(|p| p * p).sum::<f64>().sqrt();
    let diff = from
        .iter()
        .zip(to)
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt();
    if norm == 0.0 { diff } else { diff / norm }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitting::model::ModelKind;

    fn obs(points: &[(f64, f64)]) -> Vec<WeightedObservation> {
        points
            .iter()
            .map(|&(x, y)| WeightedObservation::new(x, y))
            .collect()
    }

    struct Poisoned;

    impl ParametricModel for Poisoned {
        fn param_count(&self) -> usize {
            1
        }
        fn value(&self, _x: f64, _params: &[f64]) -> f64 {
            f64::NAN
        }
        fn gradient(&self, _x: f64, _params: &[f64]) -> Vec<f64> {
            vec![1.0]
        }
        fn validate(&self, params: Vec<f64>) -> Vec<f64> {
            params
        }
    }

    #[test]
    fn test_exact_linear_fit() {
        let data = obs(&[(1.0, 7.0), (2.0, 9.0), (3.0, 11.0), (10.0, 25.0)]);
        let cfg = FittingConfig::default();

        let opt = least_squares(&ModelKind::Linear, &data, vec![1.0, 0.0], &cfg)
            .expect("converges");

        assert!((opt.params[0] - 2.0).abs() < 1e-6, "{:?}", opt.params);
        assert!((opt.params[1] - 5.0).abs() < 1e-6, "{:?}", opt.params);
        assert!(opt.rms < 1e-6);
        assert!(opt.evaluations <= cfg.max_evaluations);
    }

    #[test]
    fn test_weights_shift_the_optimum() {
        // Two inconsistent observations at the same x; the heavier one wins.
        let data = [
            WeightedObservation::new(1.0, 1.0),
            WeightedObservation::with_weight(1.0, 3.0, 3.0),
        ];

        let opt = least_squares(
            &ModelKind::Constant,
            &data,
            vec![1.0],
            &FittingConfig::default(),
        )
        .expect("converges");

        assert!((opt.params[0] - 2.5).abs() < 1e-6, "{:?}", opt.params);
        // sqrt((1 * 1.5² + 3 * 0.5²) / 2)
        assert!((opt.rms - 1.5f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_projection_stops_at_boundary() {
        // Decreasing data pulls the slope negative; it must stay positive.
        let data = obs(&[(1.0, 10.0), (2.0, 8.0), (3.0, 6.0), (4.0, 4.0)]);

        let opt = least_squares(
            &ModelKind::Linear,
            &data,
            vec![1.0, 0.0],
            &FittingConfig::default(),
        )
        .expect("converges at the boundary");

        assert!(opt.params.iter().all(|p| *p > 0.0), "{:?}", opt.params);
        assert!(opt.params[0] < 1e-6);
        assert!((opt.params[1] - 7.0).abs() < 1e-3, "{:?}", opt.params);
    }

    #[test]
    fn test_max_iterations() {
        let data: Vec<_> = (1..=10)
            .map(|x| {
                let x = x as f64;
                WeightedObservation::new(x, 2.0 * (0.3 * x).exp())
            })
            .collect();
        let cfg = FittingConfig {
            max_iterations: 1,
            ..FittingConfig::default()
        };

        let result = least_squares(&ModelKind::Exponential, &data, vec![1.0, 1e-3], &cfg);
        assert_eq!(result, Err(SolverError::MaxIterations(1)));
    }

    #[test]
    fn test_max_evaluations() {
        let data: Vec<_> = (1..=10)
            .map(|x| {
                let x = x as f64;
                WeightedObservation::new(x, 2.0 * (0.3 * x).exp())
            })
            .collect();
        let cfg = FittingConfig {
            max_evaluations: 2,
            ..FittingConfig::default()
        };

        let result = least_squares(&ModelKind::Exponential, &data, vec![1.0, 1e-3], &cfg);
        assert_eq!(result, Err(SolverError::MaxEvaluations(2)));
    }

    #[test]
    fn test_non_finite_model() {
        let data = obs(&[(1.0, 1.0), (2.0, 2.0)]);
        let result = least_squares(&Poisoned, &data, vec![1.0], &FittingConfig::default());
        assert_eq!(result, Err(SolverError::NonFinite));
    }
}
