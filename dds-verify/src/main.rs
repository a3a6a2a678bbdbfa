//! DDS waveform verification CLI
//!
//! Hooks for the DDS carrier and I/Q demodulator simulation benches.
//!
//! # Usage
//!
//! ```bash
//! # Write the stimulus vector for a configuration
//! dds-verify prepare qpsk_snr3
//!
//! # Verify a recorded carrier pair
//! dds-verify check-carrier dds_14_41mhz
//!
//! # Characterize a baseband capture
//! dds-verify check-baseband output/demod
//!
//! # Check all carrier configurations with captures
//! dds-verify sweep --report report.json -d
//!
//! # List configured benches
//! dds-verify list
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dds_verify::{
    config::BenchConfig,
    logging,
    runner::{BenchRunner, RunnerConfig},
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dds-verify")]
#[command(about = "Stimulus generation and result checks for DDS and I/Q demodulator benches")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to bench config YAML
    #[arg(short, long, default_value = "bench.yaml")]
    config: PathBuf,

    /// Directory holding one subdirectory per bench
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Output JSON report path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Show detailed metrics table
    #[arg(long, short = 'd')]
    detailed: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write input.txt for a stimulus configuration
    Prepare {
        /// Stimulus entry name
        name: String,
    },

    /// Verify carrier.txt of a carrier configuration
    CheckCarrier {
        /// Carrier entry name
        name: String,
    },

    /// Characterize baseband.txt and render baseband.png
    CheckBaseband {
        /// Directory containing baseband.txt (defaults to the output directory)
        dir: Option<PathBuf>,
    },

    /// Check every carrier configuration with a capture on disk
    Sweep,

    /// List configured benches
    List,

    /// Generate default bench config
    Init,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match &cli.command {
        Some(Commands::Prepare { name }) => prepare(&cli, name)?,
        Some(Commands::CheckCarrier { name }) => check_carrier(&cli, name)?,
        Some(Commands::CheckBaseband { dir }) => {
            check_baseband(&cli, dir.as_deref().unwrap_or(&cli.output))?
        }
        Some(Commands::List) => list_benches(&cli)?,
        Some(Commands::Init) => init_config(&cli)?,
        Some(Commands::Sweep) | None => run_sweep(&cli)?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<BenchConfig> {
    if cli.config.exists() {
        BenchConfig::load(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))
    } else {
        println!("  {} Config not found, using defaults", "⚠".yellow());
        Ok(BenchConfig::default_config())
    }
}

fn runner(cli: &Cli) -> anyhow::Result<BenchRunner> {
    let config = RunnerConfig {
        output_dir: cli.output.clone(),
    };
    Ok(BenchRunner::new(config, load_config(cli)?))
}

fn prepare(cli: &Cli, name: &str) -> anyhow::Result<()> {
    println!("{} Generating stimulus '{}'...", "▶".blue(), name);
    let path = runner(cli)?.prepare(name)?;
    println!("{} Wrote {}", "✓".green(), path.display());
    Ok(())
}

fn check_carrier(cli: &Cli, name: &str) -> anyhow::Result<()> {
    println!("{} Checking carrier '{}'...", "▶".blue(), name);
    let report = runner(cli)?.check_carrier(name)?;
    report.print_trace();

    if report.passed {
        println!("\n{}", "PASS".green().bold());
        Ok(())
    } else {
        println!("\n{}", "FAIL".red().bold());
        std::process::exit(1);
    }
}

fn check_baseband(cli: &Cli, dir: &Path) -> anyhow::Result<()> {
    println!("{} Characterizing baseband in {}...", "▶".blue(), dir.display());
    let trajectory = runner(cli)?.check_baseband(dir)?;
    let summary = trajectory.summary();

    println!("\n{}", "Baseband".bold());
    println!("{}", "─".repeat(40));
    println!("Samples:         {}", summary.samples);
    println!("Duration:        {:.2} us", summary.duration_us);
    println!("Mean amplitude:  {:.4}", summary.mean_amplitude);
    println!(
        "Amplitude range: {:.4} .. {:.4}",
        summary.min_amplitude, summary.max_amplitude
    );
    Ok(())
}

fn run_sweep(cli: &Cli) -> anyhow::Result<()> {
    println!("{} Loading configuration...", "▶".blue());
    let runner = runner(cli)?;

    println!("{} Checking carriers in {}...\n", "▶".blue(), cli.output.display());
    let report = runner.run_carrier_sweep();
    report.print_summary();

    if cli.detailed {
        report.print_detailed();
    }

    if let Some(ref path) = cli.report {
        report.save_json(path)?;
        println!("Report saved to: {}", path.display());
    }

    if report.summary.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn list_benches(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;

    println!("{}", "Carrier benches".bold());
    println!("{}", "─".repeat(50));
    for (name, t) in &config.carrier {
        println!(
            "  • {} - {:.4} MHz ±{} Hz, SFDR ≥ {} dB, phase {}° ±{}°",
            name.green(),
            t.target_frequency / 1e6,
            t.target_frequency_tolerance,
            t.sfdr_min,
            t.expected_phase,
            t.expected_phase_tolerance
        );
    }

    println!("\n{}", "Stimulus vectors".bold());
    println!("{}", "─".repeat(50));
    for (name, s) in &config.stimulus {
        println!(
            "  • {} - {} samples, {:.3} MHz, {} symbols, SNR {} dB",
            name.green(),
            s.samples,
            s.freq / 1e6,
            s.data.len(),
            s.snr_db
        );
    }

    Ok(())
}

fn init_config(cli: &Cli) -> anyhow::Result<()> {
    let config = BenchConfig::default_config();
    let yaml = serde_yaml::to_string(&config)?;

    let path = &cli.config;
    std::fs::write(path, &yaml)?;
    println!("{} Created default config at: {}", "✓".green(), path.display());

    std::fs::create_dir_all(&cli.output)?;
    println!("{} Created output directory: {}", "✓".green(), cli.output.display());

    Ok(())
}
