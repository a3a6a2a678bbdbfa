//! Verification outcomes and report generation.
//!
//! Tolerance breaches are not errors: every check records what it measured,
//! what it expected and whether it passed, and the verdicts roll up into
//! per-signal and per-bench results.
//!
//! # Report Structure
//!
//! - [`SweepReport`] - Top-level report for a sweep over named carrier configs
//!   - [`BenchResult`] - Result (or error) of one named config
//!     - [`CarrierReport`] - Both carrier paths plus their phase relation
//!       - [`SignalReport`] - Spectrum figures and checks for one path
//!         - [`VerificationOutcome`] / [`MetricCheck`] - Individual checks
//!
//! # Example
//!
//! ```rust,ignore
//! use dds_verify::report::SweepReport;
//!
//! let report = SweepReport::new(results, 100e6);
//! report.print_summary();
//! report.print_detailed();
//! report.save_json("report.json").unwrap();
//! ```

use crate::spectrum::SpectrumSummary;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// How a measurement is compared with its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    /// `|measured - target| <= tolerance`
    Within,
    /// `measured >= target`
    AtLeast,
}

/// One measured figure judged against its tolerance band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricCheck {
    pub metric: String,
    pub measured: f64,
    pub target: f64,
    pub tolerance: f64,
    pub bound: Bound,
    pub unit: String,
    pub passed: bool,
}

impl MetricCheck {
    /// Passes when the measurement lies within `tolerance` of `target`.
    /// A non-finite measurement never passes.
    pub fn within(metric: &str, unit: &str, measured: f64, target: f64, tolerance: f64) -> Self {
        let passed = (measured - target).abs() <= tolerance;
        Self {
            metric: metric.to_string(),
            measured,
            target,
            tolerance,
            bound: Bound::Within,
            unit: unit.to_string(),
            passed,
        }
    }

    /// Passes when the measurement reaches `minimum`.
    pub fn at_least(metric: &str, unit: &str, measured: f64, minimum: f64) -> Self {
        Self {
            metric: metric.to_string(),
            measured,
            target: minimum,
            tolerance: 0.0,
            bound: Bound::AtLeast,
            unit: unit.to_string(),
            passed: measured >= minimum,
        }
    }

    pub fn error(&self) -> f64 {
        self.measured - self.target
    }
}

impl fmt::Display for MetricCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed { "OK" } else { "FAILED" };
        match self.bound {
            Bound::Within => write!(
                f,
                "{}: {:.3} {} (target {:.3} ± {:.3}, error {:.3}) {}",
                self.metric,
                self.measured,
                self.unit,
                self.target,
                self.tolerance,
                self.error(),
                verdict
            ),
            Bound::AtLeast => write!(
                f,
                "{}: {:.2} {} (min {:.2}) {}",
                self.metric, self.measured, self.unit, self.target, verdict
            ),
        }
    }
}

/// Verdict of a group of checks on one signal or signal pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub label: String,
    pub passed: bool,
    pub checks: Vec<MetricCheck>,
}

impl VerificationOutcome {
    /// Every check is evaluated; the outcome passes only if all of them do.
    pub fn new(label: impl Into<String>, checks: Vec<MetricCheck>) -> Self {
        let passed = checks.iter().all(|c| c.passed);
        Self {
            label: label.into(),
            passed,
            checks,
        }
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &MetricCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

/// Analysis figures and verdict for one carrier path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalReport {
    pub spectrum: SpectrumSummary,
    pub outcome: VerificationOutcome,
}

/// Full result of one carrier bench run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierReport {
    pub cos: SignalReport,
    pub sin: SignalReport,
    pub relation: VerificationOutcome,
    pub passed: bool,
}

impl CarrierReport {
    pub fn new(cos: SignalReport, sin: SignalReport, relation: VerificationOutcome) -> Self {
        let passed = cos.outcome.passed && sin.outcome.passed && relation.passed;
        Self {
            cos,
            sin,
            relation,
            passed,
        }
    }

    pub fn outcomes(&self) -> [&VerificationOutcome; 3] {
        [&self.cos.outcome, &self.sin.outcome, &self.relation]
    }

    /// Print the per-check trace to the terminal.
    pub fn print_trace(&self) {
        for outcome in self.outcomes() {
            println!("\n{} '{}'", "Results for".bold(), outcome.label);
            for check in &outcome.checks {
                let status = if check.passed { "✓".green() } else { "✗".red() };
                println!("  {} {}", status, check);
            }
        }
    }
}

/// Result of one named bench within a sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchResult {
    pub passed: bool,
    pub error: Option<String>,
    pub carrier: Option<CarrierReport>,
}

impl BenchResult {
    pub fn from_report(report: CarrierReport) -> Self {
        Self {
            passed: report.passed,
            error: None,
            carrier: Some(report),
        }
    }

    pub fn from_error(error: String) -> Self {
        Self {
            passed: false,
            error: Some(error),
            carrier: None,
        }
    }
}

/// Summary of all bench results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
}

/// Report over a sweep of named carrier configurations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    /// Seconds since the Unix epoch.
    pub timestamp: String,
    pub git_commit: Option<String>,
    pub sampling_freq: f64,
    pub benches: BTreeMap<String, BenchResult>,
    pub summary: ReportSummary,
}

impl SweepReport {
    pub fn new(benches: BTreeMap<String, BenchResult>, sampling_freq: f64) -> Self {
        let total = benches.len();
        let passed = benches.values().filter(|b| b.passed).count();
        let pass_rate = if total > 0 {
            passed as f64 / total as f64
        } else {
            0.0
        };

        Self {
            timestamp: unix_timestamp(),
            git_commit: get_git_commit(),
            sampling_freq,
            benches,
            summary: ReportSummary {
                total,
                passed,
                failed: total - passed,
                pass_rate,
            },
        }
    }

    /// Save report to JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }

    /// Print human-readable summary to terminal.
    pub fn print_summary(&self) {
        println!("\n{}", "═".repeat(60).bold());
        println!("{}", " DDS CARRIER VERIFICATION REPORT ".bold().on_blue());
        println!("{}", "═".repeat(60).bold());

        if let Some(ref commit) = self.git_commit {
            println!("Git commit: {}", commit.dimmed());
        }
        println!("Timestamp:  {}", self.timestamp.dimmed());
        println!("Clock:      {:.3} MHz", self.sampling_freq / 1e6);
        println!();

        for (name, bench) in &self.benches {
            let status = if bench.passed {
                "PASS".green().bold()
            } else {
                "FAIL".red().bold()
            };
            println!("[{}] {}", status, name.bold());

            if let Some(ref err) = bench.error {
                println!("    {} {}", "Error:".red(), err);
            }

            if let Some(ref carrier) = bench.carrier {
                for outcome in carrier.outcomes() {
                    for check in outcome.failed_checks() {
                        println!("    {} {}: {}", "✗".red(), outcome.label.dimmed(), check);
                    }
                }
            }
        }

        println!("{}", "─".repeat(60));
        let overall_status = if self.summary.failed == 0 {
            "ALL BENCHES PASSED".green().bold()
        } else {
            format!("{} BENCHES FAILED", self.summary.failed).red().bold()
        };
        println!(
            "{} | {}/{} passed ({:.1}%)",
            overall_status,
            self.summary.passed,
            self.summary.total,
            self.summary.pass_rate * 100.0
        );
        println!("{}\n", "═".repeat(60).bold());
    }

    /// Print detailed metrics table.
    pub fn print_detailed(&self) {
        use tabled::{Table, Tabled};

        #[derive(Tabled)]
        struct MetricRow {
            bench: String,
            signal: String,
            metric: String,
            measured: String,
            target: String,
            tolerance: String,
            status: String,
        }

        let mut rows = vec![];
        for (name, bench) in &self.benches {
            let Some(ref carrier) = bench.carrier else {
                continue;
            };
            for outcome in carrier.outcomes() {
                for check in &outcome.checks {
                    rows.push(MetricRow {
                        bench: name.clone(),
                        signal: outcome.label.clone(),
                        metric: check.metric.clone(),
                        measured: format!("{:.3} {}", check.measured, check.unit),
                        target: format!("{:.3}", check.target),
                        tolerance: match check.bound {
                            Bound::Within => format!("± {:.3}", check.tolerance),
                            Bound::AtLeast => "min".to_string(),
                        },
                        status: if check.passed {
                            "PASS".to_string()
                        } else {
                            "FAIL".to_string()
                        },
                    });
                }
            }
        }

        if !rows.is_empty() {
            let table = Table::new(rows);
            println!("\nDetailed Metrics:\n{}", table);
        }
    }
}

fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", duration.as_secs())
}

/// Try to get the current git commit hash.
fn get_git_commit() -> Option<String> {
    std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .and_then(|o| {
            if o.status.success() {
                String::from_utf8(o.stdout).ok().map(|s| s.trim().to_string())
            } else {
                None
            }
        })
}
