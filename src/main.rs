use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use timecomplexity::analysis::{Runner, Workload};
use timecomplexity::config::Config;

/// Empirical time-complexity estimation from timing samples.
#[derive(Parser)]
#[command(name = "timecomplexity", about)]
struct Cli {
    /// Path to the YAML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print version information and exit.
    Version,

    /// Time a sample workload across the configured input sizes and report
    /// its growth model.
    Analyse {
        /// Workload to analyse; overrides `analysis.workload`.
        #[arg(short, long, value_enum)]
        workload: Option<Workload>,
    },
}

/// Build-time version info, injected via build.rs.
mod version {
    pub const RELEASE: &str = env!("CARGO_PKG_VERSION");

    /// Git commit hash, or "unknown" outside a checkout.
    pub fn git_commit() -> &'static str {
        option_env!("GIT_COMMIT").unwrap_or("unknown")
    }

    pub fn full() -> String {
        format!(
            "{} (commit: {}, {}/{})",
            RELEASE,
            git_commit(),
            std::env::consts::OS,
            std::env::consts::ARCH,
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let workload = match cli.command {
        Some(Command::Version) => {
            println!("timecomplexity {}", version::full());
            return Ok(());
        }
        Some(Command::Analyse { workload }) => workload,
        None => None,
    };

    let cfg = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    let log_level = cli.log_level.as_deref().unwrap_or(&cfg.log_level);
    let filter = EnvFilter::try_new(log_level)
        .with_context(|| format!("invalid log level: {log_level}"))?;

    fmt().with_env_filter(filter).with_target(true).init();

    tracing::info!(
        version = version::RELEASE,
        commit = version::git_commit(),
        "starting timecomplexity",
    );

    let workload = workload.unwrap_or(cfg.analysis.workload);
    let report = Runner::new(&cfg).run(workload, &cfg.analysis)?;

    println!("workload:   {workload}");
    println!("complexity: {}", report.complexity().big_o());
    println!("best fit:   {report}");
    for (kind, result) in &report.candidates {
        match result {
            Ok(f) => println!("  {kind:<13} {}", f.describe()),
            Err(e) => println!("  {kind:<13} failed: {e}"),
        }
    }

    Ok(())
}
