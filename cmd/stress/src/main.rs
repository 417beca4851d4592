//! boundbuf-stress - Producer/consumer soak tool for the bounded blocking buffer.

mod config;
mod runner;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use config::{Mode, StressConfig};

/// Producer/consumer soak tool for the bounded blocking buffer.
///
/// Spawns producer and consumer threads against one buffer, then checks that
/// every accepted item came out exactly once, in per-producer order, without
/// the buffer ever holding more than its capacity.
#[derive(Parser, Debug)]
#[command(name = "boundbuf-stress")]
#[command(about = "Producer/consumer soak tool for the bounded blocking buffer")]
#[command(version)]
struct Args {
    /// Config file (YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Buffer capacity
    #[arg(short = 'c', long)]
    capacity: Option<usize>,

    /// Number of producer threads
    #[arg(short = 'p', long)]
    producers: Option<usize>,

    /// Number of consumer threads
    #[arg(short = 'C', long)]
    consumers: Option<usize>,

    /// Items per producer
    #[arg(short = 'n', long = "items")]
    items_per_producer: Option<u64>,

    /// Operation flavour
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Per-operation timeout in timed mode (milliseconds)
    #[arg(long)]
    op_timeout_ms: Option<u64>,

    /// Whole-run deadline (seconds)
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Output JSON report to file
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Print the report as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Args {
    /// Resolves the run configuration: defaults, then file, then flags.
    fn resolve(&self) -> Result<StressConfig> {
        let mut cfg = match &self.config {
            Some(path) => StressConfig::load(path)?,
            None => StressConfig::default(),
        };

        if let Some(v) = self.capacity {
            cfg.capacity = v;
        }
        if let Some(v) = self.producers {
            cfg.producers = v;
        }
        if let Some(v) = self.consumers {
            cfg.consumers = v;
        }
        if let Some(v) = self.items_per_producer {
            cfg.items_per_producer = v;
        }
        if let Some(v) = self.mode {
            cfg.mode = v;
        }
        if let Some(v) = self.op_timeout_ms {
            cfg.op_timeout_ms = v;
        }
        if let Some(v) = self.deadline_secs {
            cfg.deadline_secs = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging; stderr keeps stdout clean for --json
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = args.resolve()?;
    let report = runner::run(&cfg)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        runner::print_summary(&report);
    }

    if let Some(output) = &args.output {
        runner::save_report(&report, output)?;
        eprintln!("Report saved to {}", output.display());
    }

    if report.stalled {
        anyhow::bail!("stress run stalled after {}s", cfg.deadline_secs);
    }
    if !report.violations.is_empty() {
        anyhow::bail!("stress run found {} violation(s)", report.violations.len());
    }
    Ok(())
}
