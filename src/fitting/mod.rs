//! Growth-rate curve fitting.
//!
//! Each [`ModelKind`] is fitted to `(input size, elapsed time)` observations
//! by a projected least-squares solver, and [`select_best`] picks the shape
//! that explains the data best.

pub mod finder;
pub mod model;
pub mod selector;
pub mod solver;

use thiserror::Error;

pub use self::finder::find_fitting_function;
pub use self::model::{FittingFunction, ModelKind};
pub use self::selector::{fit_all, select_best};
pub use self::solver::{Optimum, ParametricModel, SolverError};

/// One data point: input size `x`, measured cost `y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedObservation {
    pub x: f64,
    pub y: f64,
    pub weight: f64,
}

impl WeightedObservation {
    /// Observation with unit weight.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, weight: 1.0 }
    }

    pub fn with_weight(x: f64, y: f64, weight: f64) -> Self {
        Self { x, y, weight }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("no observations to fit")]
    NoObservations,

    #[error("observation at x = {x} is outside the domain of {kind}")]
    InvalidObservation { kind: ModelKind, x: f64 },

    #[error("{kind} fit did not converge")]
    ConvergenceFailure {
        kind: ModelKind,
        #[source]
        source: SolverError,
    },
}
