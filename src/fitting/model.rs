//! # model
//!
//! Canonical growth-rate shapes and their parametric forms.
//!
//! Every shape is kept monotonically non-decreasing and positive over
//! `n >= 1` by [`ModelKind::validate`], which clamps offending parameters to
//! the feasible boundary instead of rejecting the solver step.

use std::fmt;

use super::solver::ParametricModel;

/// Smallest value a strictly positive parameter is clamped to.
pub const EPSILON: f64 = f64::MIN_POSITIVE;

/// Candidate growth-rate shapes, in order of increasing complexity.
///
/// The derived ordering is the tie-break preference used by model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelKind {
    /// `a`
    Constant,
    /// `a * ln(n) + b`
    Logarithmic,
    /// `a * n + b`
    Linear,
    /// `a * n * ln(n) + b`
    Linearithmic,
    /// `a * n^2 + b`
    Quadratic,
    /// `a * n^3 + b`
    Cubic,
    /// `a * e^(b * n)`
    Exponential,
}

impl ModelKind {
    /// All shapes, simplest first.
    pub const ALL: [ModelKind; 7] = [
        ModelKind::Constant,
        ModelKind::Logarithmic,
        ModelKind::Linear,
        ModelKind::Linearithmic,
        ModelKind::Quadratic,
        ModelKind::Cubic,
        ModelKind::Exponential,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Constant => "Constant",
            Self::Logarithmic => "Logarithmic",
            Self::Linear => "Linear",
            Self::Linearithmic => "Linearithmic",
            Self::Quadratic => "Quadratic",
            Self::Cubic => "Cubic",
            Self::Exponential => "Exponential",
        }
    }

    /// Big-O label for reports.
    pub fn big_o(self) -> &'static str {
        match self {
            Self::Constant => "O(1)",
            Self::Logarithmic => "O(log n)",
            Self::Linear => "O(n)",
            Self::Linearithmic => "O(n log n)",
            Self::Quadratic => "O(n^2)",
            Self::Cubic => "O(n^3)",
            Self::Exponential => "O(c^n)",
        }
    }

    /// Number of fitted parameters.
    pub fn param_count(self) -> usize {
        match self {
            Self::Constant => 1,
            _ => 2,
        }
    }

    /// Whether the shape is undefined for `x <= 0`.
    pub fn requires_positive_x(self) -> bool {
        matches!(
            self,
            Self::Logarithmic | Self::Linearithmic | Self::Exponential
        )
    }

    /// Fixed starting point for iterative refinement.
    pub fn initial_guess(self) -> Vec<f64> {
        match self {
            Self::Constant => vec![1.0],
            Self::Exponential => vec![1.0, EPSILON],
            _ => vec![1.0, 0.0],
        }
    }

    pub fn value(self, x: f64, params: &[f64]) -> f64 {
        match self {
            Self::Constant => params[0],
            Self::Logarithmic => params[0] * x.ln() + params[1],
            Self::Linear => params[0] * x + params[1],
            Self::Linearithmic => params[0] * x * x.ln() + params[1],
            Self::Quadratic => params[0] * x * x + params[1],
            Self::Cubic => params[0] * x * x * x + params[1],
            Self::Exponential => params[0] * (params[1] * x).exp(),
        }
    }

    /// Partial derivatives of [`ModelKind::value`] with respect to each parameter.
    pub fn gradient(self, x: f64, params: &[f64]) -> Vec<f64> {
        match self {
            Self::Constant => vec![1.0],
            Self::Logarithmic => vec![x.ln(), 1.0],
            Self::Linear => vec![x, 1.0],
            Self::Linearithmic => vec![x * x.ln(), 1.0],
            Self::Quadratic => vec![x * x, 1.0],
            Self::Cubic => vec![x * x * x, 1.0],
            Self::Exponential => {
                let e = (params[1] * x).exp();
                vec![e, params[0] * x * e]
            }
        }
    }

    /// Projects `params` onto the feasible region.
    ///
    /// Constraints for every shape:
    /// 1. increasing for n >= 1: leading coefficient `a > 0`
    /// 2. positive at n = 1 (or growth rate for the exponential): `b > 0`
    pub fn validate(self, mut params: Vec<f64>) -> Vec<f64> {
        for p in params.iter_mut() {
            *p = p.max(EPSILON);
        }
        params
    }

    /// Whether `params` satisfy the strict constraints enforced by `validate`.
    pub fn params_valid(self, params: &[f64]) -> bool {
        params.len() == self.param_count() && params.iter().all(|p| p.is_finite() && *p > 0.0)
    }

    /// Human readable form of the fitted function.
    pub fn describe(self, params: &[f64]) -> String {
        match self {
            Self::Constant => format!("{:.6}", params[0]),
            Self::Logarithmic => format!("{:.6} * ln(n) + {:.6}", params[0], params[1]),
            Self::Linear => format!("{:.6} * n + {:.6}", params[0], params[1]),
            Self::Linearithmic => format!("{:.6} * n * ln(n) + {:.6}", params[0], params[1]),
            Self::Quadratic => format!("{:.6} * n^2 + {:.6}", params[0], params[1]),
            Self::Cubic => format!("{:.6} * n^3 + {:.6}", params[0], params[1]),
            Self::Exponential => format!("{:.6} * e^({:.6} * n)", params[0], params[1]),
        }
    }
}

impl ParametricModel for ModelKind {
    fn param_count(&self) -> usize {
        ModelKind::param_count(*self)
    }

    fn value(&self, x: f64, params: &[f64]) -> f64 {
        ModelKind::value(*self, x, params)
    }

    fn gradient(&self, x: f64, params: &[f64]) -> Vec<f64> {
        ModelKind::gradient(*self, x, params)
    }

    fn validate(&self, params: Vec<f64>) -> Vec<f64> {
        ModelKind::validate(*self, params)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A fitted growth function: shape, parameters and goodness of fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FittingFunction {
    kind: ModelKind,
    params: Vec<f64>,
    rms: f64,
}

impl FittingFunction {
    pub fn new(kind: ModelKind, params: Vec<f64>, rms: f64) -> Self {
        debug_assert_eq!(params.len(), kind.param_count());
        Self { kind, params, rms }
    }

    /// Evaluates the fitted function at `n`.
    pub fn f(&self, n: f64) -> f64 {
        self.kind.value(n, &self.params)
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Root-mean-square residual at the fitted parameters.
    pub fn rms(&self) -> f64 {
        self.rms
    }

    /// Function text followed by its RMS.
    pub fn describe(&self) -> String {
        format!("{} [rms: {:.6}]", self, self.rms)
    }
}

impl fmt::Display for FittingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind.describe(&self.params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_order() {
        let mut sorted = ModelKind::ALL;
        sorted.sort();
        assert_eq!(sorted, ModelKind::ALL);
        assert!(ModelKind::Constant < ModelKind::Exponential);
    }

    #[test]
    fn test_initial_guess_matches_param_count() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.initial_guess().len(), kind.param_count(), "{kind}");
        }
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let x = 7.5;
        let params = [1.3, 0.02];
        for kind in ModelKind::ALL {
            let p = &params[..kind.param_count()];
            let grad = kind.gradient(x, p);
            for j in 0..p.len() {
                let h = 1e-7 * p[j].abs().max(1.0);
                let mut up = p.to_vec();
                up[j] += h;
                let mut down = p.to_vec();
                down[j] -= h;
                let numeric = (kind.value(x, &up) - kind.value(x, &down)) / (2.0 * h);
                let tol = 1e-5 * numeric.abs().max(1.0);
                assert!(
                    (numeric - grad[j]).abs() < tol,
                    "{kind} d/dp{j}: analytic {} numeric {}",
                    grad[j],
                    numeric
                );
            }
        }
    }

    #[test]
    fn test_validate_clamps_to_positive() {
        let projected = ModelKind::Linearithmic.validate(vec![-2.0, 0.0]);
        assert_eq!(projected, vec![EPSILON, EPSILON]);
        assert!(ModelKind::Linearithmic.params_valid(&projected));

        let untouched = ModelKind::Linear.validate(vec![3.0, 5.0]);
        assert_eq!(untouched, vec![3.0, 5.0]);
    }

    #[test]
    fn test_params_valid_rejects_wrong_arity_and_nan() {
        assert!(!ModelKind::Linear.params_valid(&[1.0]));
        assert!(!ModelKind::Linear.params_valid(&[f64::NAN, 1.0]));
        assert!(!ModelKind::Constant.params_valid(&[0.0]));
    }

    #[test]
    fn test_value() {
        let p = [3.0, 5.0];
        assert_eq!(ModelKind::Logarithmic.value(1.0, &p), 5.0);
        assert_eq!(ModelKind::Linear.value(2.0, &p), 11.0);
        assert_eq!(ModelKind::Quadratic.value(2.0, &p), 17.0);
        assert_eq!(ModelKind::Cubic.value(2.0, &p), 29.0);
        assert_eq!(ModelKind::Constant.value(100.0, &p[..1]), 3.0);
        assert!((ModelKind::Exponential.value(0.0, &p) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_display() {
        let f = FittingFunction::new(ModelKind::Linearithmic, vec![3.0, 5.0], 0.0);
        assert_eq!(f.to_string(), "3.000000 * n * ln(n) + 5.000000");
        assert_eq!(
            f.describe(),
            "3.000000 * n * ln(n) + 5.000000 [rms: 0.000000]"
        );

        let c = FittingFunction::new(ModelKind::Constant, vec![2.5], 0.125);
        assert_eq!(c.describe(), "2.500000 [rms: 0.125000]");
    }
}
