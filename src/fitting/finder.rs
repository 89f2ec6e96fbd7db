use tracing::debug;

use crate::config::FittingConfig;

use super::model::{FittingFunction, ModelKind};
use super::solver::{self, SolverError};
use super::{FitError, WeightedObservation};

/// Fits a single growth shape to `observations`.
///
/// Observations are checked up front: every coordinate and weight must be
/// finite, weights non-negative, and `x` strictly positive for shapes that
/// take a logarithm or grow exponentially.
pub fn find_fitting_function(
    kind: ModelKind,
    observations: &[WeightedObservation],
    cfg: &FittingConfig,
) -> Result<FittingFunction, FitError> {
    if observations.is_empty() {
        return Err(FitError::NoObservations);
    }

    for o in observations {
        let finite = o.x.is_finite() && o.y.is_finite() && o.weight.is_finite();
        if !finite || o.weight < 0.0 || (kind.requires_positive_x() && o.x <= 0.0) {
            return Err(FitError::InvalidObservation { kind, x: o.x });
        }
    }

    let optimum = solver::least_squares(&kind, observations, kind.initial_guess(), cfg)
        .map_err(|source| FitError::ConvergenceFailure { kind, source })?;

    if !kind.params_valid(&optimum.params) || !optimum.rms.is_finite() {
        return Err(FitError::ConvergenceFailure {
            kind,
            source: SolverError::NonFinite,
        });
    }

    debug!(
        model = %kind,
        iterations = optimum.iterations,
        evaluations = optimum.evaluations,
        rms = optimum.rms,
        "model fitted",
    );

    Ok(FittingFunction::new(kind, optimum.params, optimum.rms))
}
