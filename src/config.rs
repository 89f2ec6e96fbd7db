use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::analysis::workload::Workload;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Logging verbosity (trace, debug, info, warn, error). Default: "info".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Recording service configuration.
    #[serde(default)]
    pub recorder: RecorderConfig,

    /// Curve fitting and model selection configuration.
    #[serde(default)]
    pub fitting: FittingConfig,

    /// Workload sweep configuration used by the `analyse` command.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Recording service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RecorderConfig {
    /// How long `stop` waits for the worker to flush and snapshot. Default: 60s.
    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,
}

/// Curve fitting and model selection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FittingConfig {
    /// Maximum solver iterations per candidate model. Default: 1000.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Maximum model evaluations per candidate model. Default: 10000.
    #[serde(default = "default_max_evaluations")]
    pub max_evaluations: usize,

    /// Relative cost decrease below which the solver stops. Default: 1e-10.
    #[serde(default = "default_tolerance")]
    pub cost_tolerance: f64,

    /// Relative parameter change below which the solver stops. Default: 1e-10.
    #[serde(default = "default_tolerance")]
    pub parameter_tolerance: f64,

    /// Gradient orthogonality threshold below which the solver stops. Default: 1e-10.
    #[serde(default = "default_tolerance")]
    pub orthogonality_tolerance: f64,

    /// Starting Levenberg-Marquardt damping factor. Default: 1e-3.
    #[serde(default = "default_initial_damping")]
    pub initial_damping: f64,

    /// Absolute RMS margin a more complex model must beat. Default: 1e-9.
    #[serde(default = "default_rms_abs_tolerance")]
    pub rms_abs_tolerance: f64,

    /// RMS margin relative to the current best. Default: 1e-6.
    #[serde(default = "default_rms_rel_tolerance")]
    pub rms_rel_tolerance: f64,

    /// Fit candidate models in parallel. Default: true.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

/// Workload sweep configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Sample workload to analyse. Default: linear.
    #[serde(default)]
    pub workload: Workload,

    /// Input sizes to run the workload at, in increasing order.
    #[serde(default = "default_input_sizes")]
    pub input_sizes: Vec<u64>,

    /// Timed runs per input size. Default: 5.
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,

    /// Untimed runs per input size before measuring. Default: 1.
    #[serde(default = "default_warmup_runs")]
    pub warmup_runs: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_iterations() -> usize {
    1000
}

fn default_max_evaluations() -> usize {
    10_000
}

fn default_tolerance() -> f64 {
    1e-10
}

fn default_initial_damping() -> f64 {
    1e-3
}

fn default_rms_abs_tolerance() -> f64 {
    1e-9
}

fn default_rms_rel_tolerance() -> f64 {
    1e-6
}

fn default_true() -> bool {
    true
}

fn default_input_sizes() -> Vec<u64> {
    vec![1_000, 2_000, 4_000, 8_000, 16_000, 32_000]
}

fn default_repetitions() -> usize {
    5
}

fn default_warmup_runs() -> usize {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            recorder: RecorderConfig::default(),
            fitting: FittingConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            stop_timeout: default_stop_timeout(),
        }
    }
}

impl Default for FittingConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_evaluations: default_max_evaluations(),
            cost_tolerance: default_tolerance(),
            parameter_tolerance: default_tolerance(),
            orthogonality_tolerance: default_tolerance(),
            initial_damping: default_initial_damping(),
            rms_abs_tolerance: default_rms_abs_tolerance(),
            rms_rel_tolerance: default_rms_rel_tolerance(),
            parallel: default_true(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            workload: Workload::default(),
            input_sizes: default_input_sizes(),
            repetitions: default_repetitions(),
            warmup_runs: default_warmup_runs(),
        }
    }
}

// --- Validation and loading ---

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let cfg = Self::from_yaml(&data)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        Ok(cfg)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(data: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(data).context("decoding YAML")?;

        cfg.validate()?;

        Ok(cfg)
    }

    /// Validate the configuration for required fields and consistency.
    pub fn validate(&self) -> Result<()> {
        if self.recorder.stop_timeout.is_zero() {
            bail!("recorder.stop_timeout must be positive");
        }

        self.fitting.validate()?;

        let analysis = &self.analysis;
        if analysis.repetitions == 0 {
            bail!("analysis.repetitions must be positive");
        }

        if analysis.input_sizes.iter().any(|&n| n == 0) {
            bail!("analysis.input_sizes must all be positive");
        }

        let distinct: HashSet<u64> = analysis.input_sizes.iter().copied().collect();
        if distinct.len() < 2 {
            bail!("analysis.input_sizes needs at least two distinct sizes");
        }

        Ok(())
    }
}

impl FittingConfig {
    /// Validate solver limits and tolerances.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            bail!("fitting.max_iterations must be positive");
        }
        if self.max_evaluations == 0 {
            bail!("fitting.max_evaluations must be positive");
        }

        for (name, value) in [
            ("cost_tolerance", self.cost_tolerance),
            ("parameter_tolerance", self.parameter_tolerance),
            ("orthogonality_tolerance", self.orthogonality_tolerance),
            ("rms_abs_tolerance", self.rms_abs_tolerance),
            ("rms_rel_tolerance", self.rms_rel_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("fitting.{name} must be a finite non-negative number");
            }
        }

        if !(self.initial_damping.is_finite() && self.initial_damping > 0.0) {
            bail!("fitting.initial_damping must be positive");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.recorder.stop_timeout, Duration::from_secs(60));
        assert_eq!(cfg.fitting.max_iterations, 1000);
        assert!(cfg.fitting.parallel);
        assert_eq!(cfg.analysis.workload, Workload::Linear);
        assert_eq!(cfg.analysis.repetitions, 5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let cfg = Config::from_yaml(
            r#"
log_level: debug
recorder:
  stop_timeout: 250ms
fitting:
  max_iterations: 50
  parallel: false
analysis:
  workload: linearithmic
  input_sizes: [10, 20, 40]
  repetitions: 3
"#,
        )
        .expect("valid config");

        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.recorder.stop_timeout, Duration::from_millis(250));
        assert_eq!(cfg.fitting.max_iterations, 50);
        assert_eq!(cfg.fitting.max_evaluations, 10_000);
        assert!(!cfg.fitting.parallel);
        assert_eq!(cfg.analysis.workload, Workload::Linearithmic);
        assert_eq!(cfg.analysis.input_sizes, vec![10, 20, 40]);
        assert_eq!(cfg.analysis.warmup_runs, 1);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let cfg = Config::from_yaml("{}").expect("defaults are valid");
        assert_eq!(cfg.analysis.input_sizes, default_input_sizes());
    }

    #[test]
    fn test_validate_rejects_zero_stop_timeout() {
        let mut cfg = Config::default();
        cfg.recorder.stop_timeout = Duration::ZERO;
        let err = cfg.validate().expect_err("zero timeout");
        assert!(err.to_string().contains("stop_timeout"));
    }

    #[test]
    fn test_validate_rejects_single_input_size() {
        let mut cfg = Config::default();
        cfg.analysis.input_sizes = vec![100, 100];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_input_size() {
        let mut cfg = Config::default();
        cfg.analysis.input_sizes = vec![0, 10, 20];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_tolerance() {
        let mut cfg = Config::default();
        cfg.fitting.cost_tolerance = -1.0;
        let err = cfg.validate().expect_err("negative tolerance");
        assert!(err.to_string().contains("cost_tolerance"));
    }

    #[test]
    fn test_validate_rejects_zero_damping() {
        let mut cfg = Config::default();
        cfg.fitting.initial_damping = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_unknown_workload_fails_to_parse() {
        assert!(Config::from_yaml("analysis:\n  workload: factorial\n").is_err());
    }
}
