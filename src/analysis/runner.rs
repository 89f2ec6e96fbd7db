use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::{AnalysisConfig, Config, FittingConfig, RecorderConfig};
use crate::recorder::{Measurement, Snapshot, TimeRecorder};

use super::workload::Workload;
use super::{analyse, observations_for_path, AnalysisReport};

/// Runs a workload across a sweep of input sizes and analyses the timings.
///
/// Every input size gets its own [`TimeRecorder`], so each snapshot only
/// holds the repetitions at that size.
pub struct Runner {
    recorder: RecorderConfig,
    fitting: FittingConfig,
}

impl Runner {
    pub fn new(cfg: &Config) -> Self {
        Self {
            recorder: cfg.recorder.clone(),
            fitting: cfg.fitting.clone(),
        }
    }

    /// Sweeps `analysis.input_sizes` and selects the best growth model.
    pub fn run(&self, workload: Workload, analysis: &AnalysisConfig) -> Result<AnalysisReport> {
        let runs = self.sweep(workload, analysis)?;
        let observations = observations_for_path(&runs, &workload.call_path());

        let report = analyse(&observations, &self.fitting)
            .with_context(|| format!("analysing {workload} workload"))?;

        if report.complexity() != workload.expected() {
            warn!(
                %workload,
                expected = %workload.expected(),
                selected = %report.complexity(),
                "selected model differs from the workload's growth class",
            );
        }

        Ok(report)
    }

    /// Records `analysis.repetitions` timed runs per input size.
    pub fn sweep(
        &self,
        workload: Workload,
        analysis: &AnalysisConfig,
    ) -> Result<Vec<(u64, Snapshot<Measurement>)>> {
        let path = workload.call_path();
        let mut runs = Vec::with_capacity(analysis.input_sizes.len());

        info!(
            %workload,
            sizes = analysis.input_sizes.len(),
            repetitions = analysis.repetitions,
            "starting sweep",
        );

        for &n in &analysis.input_sizes {
            for _ in 0..analysis.warmup_runs {
                workload.run(n);
            }

            let recorder = TimeRecorder::start(&self.recorder)
                .with_context(|| format!("starting recorder for n = {n}"))?;
            for _ in 0..analysis.repetitions {
                recorder.time(&path, || workload.run(n));
            }

            let stats = recorder.handle().stats();
            let snapshot = recorder
                .stop()
                .with_context(|| format!("stopping recorder for n = {n}"))?;

            match snapshot.get(&path) {
                Some(m) => debug!(n, measurement = %m, rejected = stats.rejected, "input size recorded"),
                None => warn!(n, "no timings recorded for input size"),
            }

            runs.push((n, snapshot));
        }

        Ok(runs)
    }
}
