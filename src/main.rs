use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use tempfile::TempDir;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use ducklake_bench::catalog::{CatalogSession, DuckLakeSession};
use ducklake_bench::compare::OverheadPolicy;
use ducklake_bench::report::{self, RunSummary, SystemInfo, UnitFailure};
use ducklake_bench::storage::StoreLayout;
use ducklake_bench::units::{self, UnitConfig, ALL_UNITS};
use ducklake_bench::{BenchError, BenchResult};

#[derive(Parser, Debug)]
#[command(
    name = "ducklake-bench",
    about = "Measures a DuckLake lakehouse against a traditional file-per-commit layout",
    version
)]
struct Cli {
    /// Comma-separated units to run (default: all of
    /// small_files,time_travel,rollback,schema_evolution,portability)
    #[arg(long, value_delimiter = ',')]
    units: Vec<String>,

    /// Single-row commits in the small-file unit
    #[arg(long, default_value_t = 100)]
    updates: usize,

    /// Rows seeded for the time-travel unit
    #[arg(long, default_value_t = 50_000)]
    seed_rows: u64,

    /// Data generator seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Candidate overhead tolerated on elapsed/storage metrics, in
    /// percent. File counts are always judged strictly.
    #[arg(long, default_value_t = 100.0)]
    allow_overhead_pct: f64,

    /// Directory to create stores under (default: a scratch temp dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Keep store artifacts after the run
    #[arg(long)]
    keep: bool,

    /// Directory to write run.json and csv exports into
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {}", "fatal:".red().bold(), e);
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> BenchResult<i32> {
    banner();

    let selected: Vec<String> = if cli.units.is_empty() {
        ALL_UNITS.iter().map(|s| s.to_string()).collect()
    } else {
        cli.units.clone()
    };
    for name in &selected {
        if !ALL_UNITS.contains(&name.as_str()) {
            return Err(BenchError::Config(format!(
                "unknown unit '{}', expected one of: {}",
                name,
                ALL_UNITS.join(", ")
            )));
        }
    }

    // A scratch TempDir cleans up on drop; --keep or --data-dir pins
    // the artifacts instead.
    let mut _scratch: Option<TempDir> = None;
    let data_root: PathBuf = match &cli.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            dir.clone()
        }
        None if cli.keep => {
            let dir = std::env::temp_dir().join(format!("ducklake-bench-{}", std::process::id()));
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => {
            let tmp = TempDir::new()?;
            let path = tmp.path().to_path_buf();
            _scratch = Some(tmp);
            path
        }
    };

    // Attach once up front so a missing extension fails the run before
    // any unit starts.
    let probe_layout = StoreLayout::for_catalog(data_root.join("probe.ducklake"));
    probe_layout.scrub()?;
    match DuckLakeSession::attach(&probe_layout, "probe") {
        Ok(session) => {
            let functions = session.extension_functions().unwrap_or_default();
            println!(
                "  engine ready, {} catalog functions registered",
                functions.len()
            );
            drop(session);
            probe_layout.scrub()?;
        }
        Err(e) => {
            eprintln!("{} {}", "engine unavailable:".red().bold(), e);
            return Err(e);
        }
    }

    let mut cfg = UnitConfig::new(&data_root);
    cfg.updates = cli.updates;
    cfg.seed_rows = cli.seed_rows;
    cfg.seed = cli.seed;
    cfg.overhead_policy = OverheadPolicy::allowing(cli.allow_overhead_pct);

    let open = |layout: &StoreLayout| -> BenchResult<Box<dyn CatalogSession>> {
        DuckLakeSession::attach(layout, "lake").map(|s| Box::new(s) as Box<dyn CatalogSession>)
    };

    let mut summary = RunSummary::new();
    for name in &selected {
        match units::run_unit(name, &cfg, &open) {
            Ok(outcome) => {
                report::print_unit(&outcome);
                summary.outcomes.push(outcome);
            }
            Err(e) => {
                let failure = UnitFailure {
                    unit: name.clone(),
                    invariant: e.is_invariant(),
                    error: e.to_string(),
                };
                report::print_failure(&failure);
                summary.failures.push(failure);
            }
        }
    }

    report::print_run_summary(&summary);

    if let Some(dir) = &cli.export {
        std::fs::create_dir_all(dir)?;
        report::export_json(&summary, &dir.join("run.json"))?;
        report::export_measurements_csv(&summary, &dir.join("measurements.csv"))?;
        report::export_comparisons_csv(&summary, &dir.join("comparisons.csv"))?;
        println!("\n  exports written to {}", dir.display());
    }

    if cli.keep || cli.data_dir.is_some() {
        println!("  store artifacts kept under {}", data_root.display());
    }

    Ok(summary.exit_code())
}

fn banner() {
    let sys = SystemInfo::collect();
    println!("{}", "═".repeat(64).cyan());
    println!("{}", "  DuckLake Measurement Harness".cyan().bold());
    println!("  {} / {} / {} cpus", sys.os, sys.arch, sys.cpu_count);
    println!("{}", "═".repeat(64).cyan());
}
