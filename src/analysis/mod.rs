//! Complexity analysis over recorded timings.
//!
//! Recorded snapshots, one per input size, are reduced to
//! `(input size, average elapsed time)` observations for a call path and
//! handed to the model selector.

pub mod runner;
pub mod workload;

use std::fmt;

use thiserror::Error;
use tracing::info;

use crate::config::FittingConfig;
use crate::fitting::{self, FitError, FittingFunction, ModelKind, WeightedObservation};
use crate::recorder::{CallPath, Measurement, Snapshot};

pub use self::runner::Runner;
pub use self::workload::Workload;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("no observations to analyse")]
    NoObservations,

    #[error("no candidate model could be fitted to {0} observations")]
    NoFitFound(usize),
}

/// Outcome of an analysis: the selected model and every candidate's result.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub best: FittingFunction,
    pub candidates: Vec<(ModelKind, Result<FittingFunction, FitError>)>,
}

impl AnalysisReport {
    /// Growth class of the selected model.
    pub fn complexity(&self) -> ModelKind {
        self.best.kind()
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.best.describe())
    }
}

/// One observation per run that recorded `path`, using the average elapsed
/// time at that exact node. Runs that never reached `path` are skipped.
pub fn observations_for_path(
    runs: &[(u64, Snapshot<Measurement>)],
    path: &CallPath,
) -> Vec<WeightedObservation> {
    runs.iter()
        .filter_map(|(size, snapshot)| {
            let average = snapshot.get(path)?.average()?;
            Some(WeightedObservation::new(*size as f64, average))
        })
        .collect()
}

/// Selects the growth model that best explains `observations`.
pub fn analyse(
    observations: &[WeightedObservation],
    cfg: &FittingConfig,
) -> Result<AnalysisReport, AnalysisError> {
    if observations.is_empty() {
        return Err(AnalysisError::NoObservations);
    }

    let candidates = fitting::fit_all(observations, cfg);
    let best = fitting::selector::pick(candidates.iter().cloned(), cfg)
        .ok_or(AnalysisError::NoFitFound(observations.len()))?;

    info!(
        model = %best.kind(),
        complexity = best.kind().big_o(),
        rms = best.rms(),
        observations = observations.len(),
        "analysis complete",
    );

    Ok(AnalysisReport { best, candidates })
}
