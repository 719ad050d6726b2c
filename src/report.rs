//! Terminal rendering and structured export of a run.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use serde::Serialize;

use crate::compare::DeltaVerdict;
use crate::units::UnitOutcome;
use crate::BenchResult;

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub cpu_count: usize,
    pub timestamp: u64,
}

impl SystemInfo {
    pub fn collect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs(),
        }
    }
}

/// A unit that did not produce an outcome, kept apart from ordinary
/// operation failures.
#[derive(Debug, Clone, Serialize)]
pub struct UnitFailure {
    pub unit: String,
    pub invariant: bool,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub system: SystemInfo,
    pub outcomes: Vec<UnitOutcome>,
    pub failures: Vec<UnitFailure>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            system: SystemInfo::collect(),
            outcomes: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.failures.is_empty() {
            0
        } else {
            1
        }
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Terminal output
// ────────────────────────────────────────────────────────────────────────────

pub fn print_unit(outcome: &UnitOutcome) {
    println!();
    println!("{}", format!("━━━ {} ━━━", outcome.unit).cyan().bold());

    for subject in &outcome.subjects {
        let failed = subject.failures().count();
        let total = subject.measurements.len();
        println!(
            "  {:<10} {} operations, {} failed, {:.3}s",
            subject.label.to_string(),
            total,
            failed,
            subject.total_duration_secs()
        );
        for failure in subject.failures() {
            println!(
                "    {} {}: {}",
                "✗".red(),
                failure.operation,
                failure.error_text.as_deref().unwrap_or("unknown").dimmed()
            );
        }
    }

    if let (Some(first), Some(last)) = (outcome.snapshots.first(), outcome.snapshots.last()) {
        println!(
            "  snapshots   v{} → v{} across {} commits",
            first.version,
            last.version,
            outcome.snapshots.len()
        );
    }

    if let Some(stats) = &outcome.update_stats {
        println!(
            "  updates     {} ops, {:.1}/s, p50 {}µs, p99 {}µs",
            stats.ops, stats.per_sec, stats.p50_us, stats.p99_us
        );
    }

    if !outcome.comparisons.is_empty() {
        println!("{}", comparison_table(outcome));
    }
}

fn comparison_table(outcome: &UnitOutcome) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Metric", "Baseline", "Candidate", "Delta", "Verdict"]);
    for judged in &outcome.comparisons {
        let c = &judged.comparison;
        let color = match judged.verdict {
            DeltaVerdict::Improvement => Color::Green,
            DeltaVerdict::Acceptable => Color::Yellow,
            DeltaVerdict::Regression => Color::Red,
        };
        table.add_row(vec![
            Cell::new(&c.metric_name),
            Cell::new(format_value(&c.metric_name, c.baseline_value)),
            Cell::new(format_value(&c.metric_name, c.candidate_value)),
            Cell::new(format!("{:+.2}%", c.delta_pct)).fg(color),
            Cell::new(judged.verdict.to_string()).fg(color),
        ]);
    }
    table
}

pub fn print_failure(failure: &UnitFailure) {
    println!();
    if failure.invariant {
        println!(
            "{}",
            format!("━━━ {} ━━━", failure.unit).red().bold()
        );
        println!(
            "  {} {}",
            "INVARIANT VIOLATION".red().bold(),
            failure.error
        );
    } else {
        println!("{}", format!("━━━ {} ━━━", failure.unit).yellow().bold());
        println!("  {} {}", "unit error:".yellow(), failure.error);
    }
}

pub fn print_run_summary(summary: &RunSummary) {
    println!();
    println!("{}", "━━━ summary ━━━".cyan().bold());
    let mut improvements = 0usize;
    let mut acceptable = 0usize;
    let mut regressions = 0usize;
    for outcome in &summary.outcomes {
        for judged in &outcome.comparisons {
            match judged.verdict {
                DeltaVerdict::Improvement => improvements += 1,
                DeltaVerdict::Acceptable => acceptable += 1,
                DeltaVerdict::Regression => regressions += 1,
            }
        }
    }
    println!(
        "  {} units completed, {} failed",
        summary.outcomes.len(),
        summary.failures.len()
    );
    println!(
        "  comparisons: {} {} / {} {} / {} {}",
        improvements,
        "improved".green(),
        acceptable,
        "acceptable".yellow(),
        regressions,
        "regressed".red()
    );
    for failure in &summary.failures {
        let tag = if failure.invariant {
            "invariant".red().bold()
        } else {
            "error".yellow().bold()
        };
        println!("  {} {}: {}", tag, failure.unit, failure.error);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Structured export
// ────────────────────────────────────────────────────────────────────────────

pub fn export_json(summary: &RunSummary, path: &Path) -> BenchResult<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json)?;
    tracing::info!(path = %path.display(), "wrote json export");
    Ok(())
}

/// One row per measurement.
pub fn export_measurements_csv(summary: &RunSummary, path: &Path) -> BenchResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "unit",
        "subject",
        "operation",
        "duration_secs",
        "byte_size",
        "file_count",
        "snapshot_version",
        "failed",
        "error",
    ])?;
    for outcome in &summary.outcomes {
        for subject in &outcome.subjects {
            for m in &subject.measurements {
                writer.write_record(&[
                    outcome.unit.clone(),
                    subject.label.to_string(),
                    m.operation.clone(),
                    format!("{:.6}", m.duration_secs),
                    m.byte_size.to_string(),
                    m.file_count.to_string(),
                    m.snapshot_version.map(|v| v.to_string()).unwrap_or_default(),
                    m.failed.to_string(),
                    m.error_text.clone().unwrap_or_default(),
                ])?;
            }
        }
    }
    writer.flush().map_err(crate::BenchError::from)?;
    tracing::info!(path = %path.display(), "wrote measurements csv");
    Ok(())
}

/// One row per judged comparison.
pub fn export_comparisons_csv(summary: &RunSummary, path: &Path) -> BenchResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "unit",
        "metric",
        "baseline",
        "candidate",
        "delta_abs",
        "delta_pct",
        "verdict",
    ])?;
    for outcome in &summary.outcomes {
        for judged in &outcome.comparisons {
            let c = &judged.comparison;
            writer.write_record(&[
                outcome.unit.clone(),
                c.metric_name.clone(),
                c.baseline_value.to_string(),
                c.candidate_value.to_string(),
                c.delta_abs.to_string(),
                format!("{:.4}", c.delta_pct),
                judged.verdict.to_string(),
            ])?;
        }
    }
    writer.flush().map_err(crate::BenchError::from)?;
    tracing::info!(path = %path.display(), "wrote comparisons csv");
    Ok(())
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

fn format_value(metric: &str, value: f64) -> String {
    if metric.ends_with("bytes") {
        format_bytes(value as u64)
    } else if metric.ends_with("secs") {
        format!("{:.3}s", value)
    } else {
        format!("{:.0}", value)
    }
}
