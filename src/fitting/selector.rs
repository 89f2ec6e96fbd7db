use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::FittingConfig;

use super::finder::find_fitting_function;
use super::model::{FittingFunction, ModelKind};
use super::{FitError, WeightedObservation};

/// Fits every candidate shape, simplest first.
///
/// Fits are independent, so they run on the rayon pool when
/// `cfg.parallel` is set. The result order does not depend on scheduling.
pub fn fit_all(
    observations: &[WeightedObservation],
    cfg: &FittingConfig,
) -> Vec<(ModelKind, Result<FittingFunction, FitError>)> {
    let fit = |kind: &ModelKind| (*kind, find_fitting_function(*kind, observations, cfg));

    if cfg.parallel {
        ModelKind::ALL.as_slice().par_iter().map(fit).collect()
    } else {
        ModelKind::ALL.iter().map(fit).collect()
    }
}

/// Picks the candidate with the lowest RMS.
///
/// A more complex shape only displaces a simpler one when its RMS is lower
/// by more than `max(rms_abs_tolerance, rms_rel_tolerance * best_rms)`.
/// Failed fits are logged and skipped. Returns `None` when every fit failed.
pub fn select_best(
    observations: &[WeightedObservation],
    cfg: &FittingConfig,
) -> Option<FittingFunction> {
    pick(fit_all(observations, cfg), cfg)
}

pub(crate) fn pick(
    candidates: impl IntoIterator<Item = (ModelKind, Result<FittingFunction, FitError>)>,
    cfg: &FittingConfig,
) -> Option<FittingFunction> {
    let mut best: Option<FittingFunction> = None;

    for (kind, result) in candidates {
        let candidate = match result {
            Ok(f) => f,
            Err(e) => {
                warn!(model = %kind, error = %e, "model fit failed, skipping");
                continue;
            }
        };
        debug!(model = %kind, rms = candidate.rms(), "candidate fitted");

        best = match best {
            None => Some(candidate),
            Some(current) => {
                let margin = cfg
                    .rms_abs_tolerance
                    .max(cfg.rms_rel_tolerance * current.rms());
                if candidate.rms() < current.rms() - margin {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }

    best
}
