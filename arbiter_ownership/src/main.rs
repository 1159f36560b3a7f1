//! # Arbiter Simulator
//!
//! Drives an ownership registry from several concurrent control routines
//! described in a TOML scenario, then prints per-routine outcomes.

use std::path::PathBuf;
use std::process;

use arbiter_common::config::LogLevel;
use arbiter_common::consts::DEFAULT_CONFIG_PATH;
use arbiter_ownership::config::SimConfig;
use arbiter_ownership::sim::{SimReport, Simulator};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Arbiter Simulator: exclusive subsystem ownership under contention
#[derive(Parser, Debug)]
#[command(name = "arbiter_sim")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Run control routines competing for shared subsystems")]
struct Args {
    /// Path to the scenario TOML.
    #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the number of loop iterations per routine.
    #[arg(long)]
    iterations: Option<u32>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let mut config = match SimConfig::load_validated(&args.config) {
        Ok(config) => config,
        Err(e) => {
            setup_tracing(&args, LogLevel::Info);
            error!("FATAL: {}: {e}", args.config.display());
            process::exit(1);
        }
    };
    setup_tracing(&args, config.shared.log_level);

    info!(
        "Arbiter simulator v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    if let Some(iterations) = args.iterations {
        config.simulation.iterations = iterations;
    }

    match run(config) {
        Ok(report) => print_report(&report),
        Err(e) => {
            error!("FATAL: {e}");
            process::exit(1);
        }
    }
}

fn run(config: SimConfig) -> Result<SimReport, Box<dyn std::error::Error>> {
    let simulator = Simulator::new(config)?;
    let report = simulator.run()?;
    if !report.final_owners.is_empty() {
        warn!(
            "{} subsystem(s) still owned after shutdown",
            report.final_owners.len()
        );
    }
    Ok(report)
}

fn print_report(report: &SimReport) {
    println!(
        "{:<16} {:<10} {:>7} {:>9} {:>10} {:>7}",
        "routine", "owner", "cycles", "acquired", "contended", "active"
    );
    for r in &report.routines {
        println!(
            "{:<16} {:<10} {:>7} {:>9} {:>10} {:>7}",
            r.name,
            r.owner.as_deref().unwrap_or("-"),
            r.cycles,
            r.acquisitions,
            r.contended,
            r.active_cycles
        );
    }
    for (subsystem, owner) in &report.final_owners {
        println!("still owned: {subsystem} by {owner}");
    }
}

/// Setup tracing subscriber from CLI flags and the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::from(configured)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
