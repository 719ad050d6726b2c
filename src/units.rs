//! Measurement units.
//!
//! Each unit scrubs its own store, drives a scripted set of operations
//! through a [`CatalogSession`], and returns everything it measured:
//! per-operation timings and footprints, the snapshot trail, and any
//! baseline/candidate comparisons. An invariant violation aborts the
//! unit that saw it; engine failures are recorded and the unit keeps
//! going.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use crate::baseline;
use crate::catalog::CatalogSession;
use crate::compare::{judge, JudgedComparison, OverheadPolicy};
use crate::ops::{Column, Filter, Operation, Statement, Value};
use crate::runner::OperationRunner;
use crate::snapshot::{SnapshotRecord, SnapshotTracker};
use crate::storage::{
    self, count_files, store_file_total, StorageAccountant, StoreLayout, DATA_FILE_EXT,
};
use crate::{
    BenchError, BenchResult, DataGen, Measurement, Subject, SubjectLabel, UpdateRecorder,
};

/// Opens a session on a store. Production wires this to a DuckLake
/// attach; tests substitute scripted sessions.
pub type SessionFactory<'a> = dyn Fn(&StoreLayout) -> BenchResult<Box<dyn CatalogSession>> + 'a;

pub const ALL_UNITS: &[&str] = &[
    "small_files",
    "time_travel",
    "rollback",
    "schema_evolution",
    "portability",
];

#[derive(Debug, Clone)]
pub struct UnitConfig {
    /// Directory all unit stores are created under.
    pub data_root: PathBuf,
    /// Single-row commits in the small-file unit.
    pub updates: usize,
    /// Rows seeded for the time-travel unit.
    pub seed_rows: u64,
    /// Data generator seed.
    pub seed: u64,
    /// Tolerance applied to metrics where candidate overhead is
    /// expected (elapsed seconds, storage bytes). File counts are
    /// always judged strictly.
    pub overhead_policy: OverheadPolicy,
}

impl UnitConfig {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            updates: 100,
            seed_rows: 50_000,
            seed: 42,
            overhead_policy: OverheadPolicy::allowing(100.0),
        }
    }
}

/// Throughput and latency profile of the small-update loop.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateStats {
    pub ops: u64,
    pub elapsed_secs: f64,
    pub per_sec: f64,
    pub p50_us: u64,
    pub p99_us: u64,
    pub mean_us: f64,
}

impl UpdateStats {
    fn from_recorder(recorder: &UpdateRecorder) -> Self {
        Self {
            ops: recorder.ops(),
            elapsed_secs: recorder.elapsed_secs(),
            per_sec: recorder.per_sec(),
            p50_us: recorder.percentile_us(50.0),
            p99_us: recorder.percentile_us(99.0),
            mean_us: recorder.mean_us(),
        }
    }
}

/// Everything one unit produced.
#[derive(Debug, Clone, Serialize)]
pub struct UnitOutcome {
    pub unit: String,
    pub subjects: Vec<Subject>,
    pub comparisons: Vec<JudgedComparison>,
    pub snapshots: Vec<SnapshotRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_stats: Option<UpdateStats>,
    pub audit: Vec<String>,
}

pub fn run_unit(name: &str, cfg: &UnitConfig, open: &SessionFactory) -> BenchResult<UnitOutcome> {
    match name {
        "small_files" => small_files(cfg, open),
        "time_travel" => time_travel(cfg, open),
        "rollback" => rollback(cfg, open),
        "schema_evolution" => schema_evolution(cfg, open),
        "portability" => portability(cfg, open),
        other => Err(BenchError::Config(format!("unknown unit '{}'", other))),
    }
}

/// Executes one autocommitted mutating operation and runs the full
/// pipeline behind it: storage accounting, file census, snapshot
/// recording. Returns the enriched measurement; a failed operation is
/// recorded as-is and skips the pipeline.
#[allow(clippy::too_many_arguments)]
fn run_tracked(
    runner: &mut OperationRunner,
    session: &mut dyn CatalogSession,
    tracker: &mut SnapshotTracker,
    accountant: &StorageAccountant,
    layout: &StoreLayout,
    subject: &mut Subject,
    op: &Operation,
    capture_rows: bool,
) -> BenchResult<Measurement> {
    let m = runner.execute(session, op)?;
    if m.failed {
        subject.record(m.clone())?;
        return Ok(m);
    }
    let bytes = accountant.size_of_layout(layout)?;
    let files = count_files(&layout.data_dir, DATA_FILE_EXT)?;
    let version = if capture_rows {
        tracker.record_table_state(session, &op.name)?
    } else {
        tracker.record(session, &op.name)?
    };
    let m = m.with_storage(bytes, files).with_version(version);
    subject.record(m.clone())?;
    Ok(m)
}

// ────────────────────────────────────────────────────────────────────────────
// small_files: many single-row commits vs the four-files-per-commit
// baseline layout
// ────────────────────────────────────────────────────────────────────────────

fn small_files(cfg: &UnitConfig, open: &SessionFactory) -> BenchResult<UnitOutcome> {
    tracing::info!(unit = "small_files", updates = cfg.updates, "starting");
    let layout = StoreLayout::for_catalog(cfg.data_root.join("small_files.ducklake"));
    layout.scrub()?;
    let baseline_root = cfg.data_root.join("small_files_baseline");
    baseline::scrub(&baseline_root)?;

    let mut baseline_subject = Subject::new(SubjectLabel::Baseline);
    for m in baseline::simulate(&baseline_root, cfg.updates)? {
        baseline_subject.record(m)?;
    }

    let mut session = open(&layout)?;
    let mut runner = OperationRunner::new();
    let mut tracker = SnapshotTracker::new("sensor_data");
    let accountant = StorageAccountant::new();
    let mut candidate = Subject::new(SubjectLabel::Candidate);
    let mut gen = DataGen::new(cfg.seed);

    let sensor_columns = vec![
        "sensor_id".to_string(),
        "recorded_at".to_string(),
        "temperature".to_string(),
        "humidity".to_string(),
        "location".to_string(),
    ];
    let reading_row = |r: &crate::SensorReading| {
        vec![
            Value::Text(r.sensor_id.clone()),
            Value::Int(r.recorded_at),
            Value::Float(r.temperature),
            Value::Float(r.humidity),
            Value::Text(r.location.clone()),
        ]
    };

    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &layout,
        &mut candidate,
        &Operation::new(
            "create_sensor_data",
            Statement::CreateTable {
                table: "sensor_data".into(),
                columns: vec![
                    Column::new("sensor_id", "VARCHAR"),
                    Column::new("recorded_at", "BIGINT"),
                    Column::new("temperature", "DOUBLE"),
                    Column::new("humidity", "DOUBLE"),
                    Column::new("location", "VARCHAR"),
                ],
            },
        ),
        false,
    )?;

    let bootstrap_rows: Vec<Vec<Value>> = (0..2).map(|i| reading_row(&gen.sensor_reading(i))).collect();
    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &layout,
        &mut candidate,
        &Operation::new(
            "bootstrap_readings",
            Statement::Insert {
                table: "sensor_data".into(),
                columns: sensor_columns.clone(),
                rows: bootstrap_rows,
            },
        ),
        false,
    )?;

    let mut recorder = UpdateRecorder::new();
    for i in 0..cfg.updates {
        let reading = gen.sensor_reading(i as u64 + 2);
        let op = Operation::new(
            format!("small_update_{:03}", i),
            Statement::Insert {
                table: "sensor_data".into(),
                columns: sensor_columns.clone(),
                rows: vec![reading_row(&reading)],
            },
        );
        let m = run_tracked(
            &mut runner,
            session.as_mut(),
            &mut tracker,
            &accountant,
            &layout,
            &mut candidate,
            &op,
            false,
        )?;
        if !m.failed {
            recorder.record_secs(m.duration_secs);
        }
    }
    let update_stats = UpdateStats::from_recorder(&recorder);

    let mut audit = runner.take_audit();
    audit.push(format!(
        "catalog holds {} snapshots after {} commits",
        session.snapshot_count()?,
        tracker.records().len()
    ));

    let comparisons = vec![
        judge(
            "elapsed_secs",
            baseline_subject.total_duration_secs(),
            candidate.total_duration_secs(),
            cfg.overhead_policy,
        ),
        judge(
            "storage_bytes",
            storage::dir_size(&baseline_root)? as f64,
            accountant.size_of_layout(&layout)? as f64,
            cfg.overhead_policy,
        ),
        judge(
            "total_files",
            storage::count_all_files(&baseline_root)? as f64,
            store_file_total(&layout)? as f64,
            OverheadPolicy::strict(),
        ),
    ];

    session.detach()?;
    Ok(UnitOutcome {
        unit: "small_files".into(),
        subjects: vec![baseline_subject, candidate],
        comparisons,
        snapshots: tracker.into_records(),
        update_stats: Some(update_stats),
        audit,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// time_travel: seed, mutate, destroy, then read history back and
// recover from it
// ────────────────────────────────────────────────────────────────────────────

fn time_travel(cfg: &UnitConfig, open: &SessionFactory) -> BenchResult<UnitOutcome> {
    tracing::info!(unit = "time_travel", rows = cfg.seed_rows, "starting");
    let layout = StoreLayout::for_catalog(cfg.data_root.join("time_travel.ducklake"));
    layout.scrub()?;

    let mut session = open(&layout)?;
    let mut runner = OperationRunner::new();
    let mut tracker = SnapshotTracker::new("users");
    let accountant = StorageAccountant::new();
    let mut candidate = Subject::new(SubjectLabel::Candidate);

    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &layout,
        &mut candidate,
        &Operation::new(
            "create_users",
            Statement::CreateTable {
                table: "users".into(),
                columns: vec![
                    Column::new("id", "BIGINT"),
                    Column::new("username", "VARCHAR"),
                    Column::new("score", "DOUBLE"),
                ],
            },
        ),
        false,
    )?;

    let seed = run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &layout,
        &mut candidate,
        &Operation::new(
            "bulk_seed",
            Statement::BulkSeed {
                table: "users".into(),
                rows: cfg.seed_rows,
            },
        ),
        true,
    )?;
    let seed_version = seed.snapshot_version;

    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &layout,
        &mut candidate,
        &Operation::new(
            "touch_one_row",
            Statement::Update {
                table: "users".into(),
                assignments: vec![("score".into(), Value::Float(99.5))],
                filter: Filter::Eq("id".into(), Value::Int(1)),
            },
        ),
        true,
    )?;

    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &layout,
        &mut candidate,
        &Operation::new(
            "delete_all",
            Statement::Delete {
                table: "users".into(),
                filter: Filter::All,
            },
        ),
        true,
    )?;

    // every captured state must still be readable as written
    tracker.verify_history(session.as_mut())?;

    if let Some(version) = seed_version {
        let recovery = run_tracked(
            &mut runner,
            session.as_mut(),
            &mut tracker,
            &accountant,
            &layout,
            &mut candidate,
            &Operation::new(
                "recover_from_seed",
                Statement::RestoreFrom {
                    table: "users".into(),
                    version,
                },
            ),
            true,
        )?;
        if !recovery.failed {
            let recovered = session.row_count("users")?;
            if recovered != cfg.seed_rows {
                return Err(BenchError::Invariant(format!(
                    "recovery from version {} restored {} rows, expected {}",
                    version, recovered, cfg.seed_rows
                )));
            }
        }
        tracker.verify_history(session.as_mut())?;
    } else {
        tracing::warn!(unit = "time_travel", "seed failed, recovery skipped");
    }

    session.detach()?;
    Ok(UnitOutcome {
        unit: "time_travel".into(),
        subjects: vec![candidate],
        comparisons: Vec::new(),
        snapshots: tracker.into_records(),
        update_stats: None,
        audit: runner.take_audit(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// rollback: a committed transaction, an aborted one, and proof the
// abort left no trace
// ────────────────────────────────────────────────────────────────────────────

fn rollback(cfg: &UnitConfig, open: &SessionFactory) -> BenchResult<UnitOutcome> {
    tracing::info!(unit = "rollback", "starting");
    let layout = StoreLayout::for_catalog(cfg.data_root.join("rollback.ducklake"));
    layout.scrub()?;

    let mut session = open(&layout)?;
    let mut runner = OperationRunner::new();
    let mut tracker = SnapshotTracker::new("inventory");
    let accountant = StorageAccountant::new();
    let mut candidate = Subject::new(SubjectLabel::Candidate);
    let mut gen = DataGen::new(cfg.seed);

    let inventory_columns = vec![
        "product_id".to_string(),
        "product_name".to_string(),
        "quantity".to_string(),
        "price".to_string(),
    ];
    let product_row = |p: &crate::ProductRow| {
        vec![
            Value::Int(p.product_id),
            Value::Text(p.product_name.clone()),
            Value::Int(p.quantity),
            Value::Float(p.price),
        ]
    };

    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &layout,
        &mut candidate,
        &Operation::new(
            "create_inventory",
            Statement::CreateTable {
                table: "inventory".into(),
                columns: vec![
                    Column::new("product_id", "BIGINT"),
                    Column::new("product_name", "VARCHAR"),
                    Column::new("quantity", "BIGINT"),
                    Column::new("price", "DOUBLE"),
                ],
            },
        ),
        false,
    )?;

    let stock_rows: Vec<Vec<Value>> = (1..=4).map(|i| product_row(&gen.product(i))).collect();
    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &layout,
        &mut candidate,
        &Operation::new(
            "stock_inventory",
            Statement::Insert {
                table: "inventory".into(),
                columns: inventory_columns.clone(),
                rows: stock_rows,
            },
        ),
        true,
    )?;
    let stocked_rows = session.row_count("inventory")?;

    // committed transaction: stays visible and commits one snapshot
    let begin = runner.execute(
        session.as_mut(),
        &Operation::new("txn_begin", Statement::Begin),
    )?;
    candidate.record(begin)?;
    let update = runner.execute(
        session.as_mut(),
        &Operation::new(
            "txn_adjust_quantity",
            Statement::Update {
                table: "inventory".into(),
                assignments: vec![("quantity".into(), Value::Int(95))],
                filter: Filter::Eq("product_id".into(), Value::Int(1)),
            },
        ),
    )?;
    candidate.record(update)?;
    let commit = runner.execute(
        session.as_mut(),
        &Operation::new("txn_commit", Statement::Commit),
    )?;
    if commit.failed {
        candidate.record(commit)?;
    } else {
        let bytes = accountant.size_of_layout(&layout)?;
        let files = count_files(&layout.data_dir, DATA_FILE_EXT)?;
        let version = tracker.record_table_state(session.as_mut(), "txn_commit")?;
        candidate.record(commit.with_storage(bytes, files).with_version(version))?;
    }

    // aborted transaction: the failing statement is recorded as an
    // operation failure, then everything staged is rolled back
    let begin = runner.execute(
        session.as_mut(),
        &Operation::new("txn_begin_doomed", Statement::Begin),
    )?;
    candidate.record(begin)?;
    let doomed = runner.execute(
        session.as_mut(),
        &Operation::new(
            "archive_order",
            Statement::Insert {
                table: "orders_archive".into(),
                columns: inventory_columns.clone(),
                rows: vec![product_row(&gen.product(90))],
            },
        ),
    )?;
    candidate.record(doomed)?;
    let rolled_back = runner.execute(
        session.as_mut(),
        &Operation::new("txn_rollback", Statement::Rollback),
    )?;
    candidate.record(rolled_back)?;

    let rows_after_abort = session.row_count("inventory")?;
    if rows_after_abort != stocked_rows {
        return Err(BenchError::Invariant(format!(
            "aborted transaction changed inventory: {} rows, expected {}",
            rows_after_abort, stocked_rows
        )));
    }
    let version_after_abort = session.current_version()?;
    if tracker.latest_version() != Some(version_after_abort) {
        return Err(BenchError::Invariant(format!(
            "aborted transaction advanced the snapshot version to {}",
            version_after_abort
        )));
    }

    // the unit keeps working after the failure
    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &layout,
        &mut candidate,
        &Operation::new(
            "restock_after_abort",
            Statement::Insert {
                table: "inventory".into(),
                columns: inventory_columns,
                rows: vec![product_row(&gen.product(5))],
            },
        ),
        true,
    )?;

    session.detach()?;
    Ok(UnitOutcome {
        unit: "rollback".into(),
        subjects: vec![candidate],
        comparisons: Vec::new(),
        snapshots: tracker.into_records(),
        update_stats: None,
        audit: runner.take_audit(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// schema_evolution: live schema changes, all versioned, none touching
// committed rows
// ────────────────────────────────────────────────────────────────────────────

fn schema_evolution(cfg: &UnitConfig, open: &SessionFactory) -> BenchResult<UnitOutcome> {
    tracing::info!(unit = "schema_evolution", "starting");
    let layout = StoreLayout::for_catalog(cfg.data_root.join("schema_evolution.ducklake"));
    layout.scrub()?;

    let mut session = open(&layout)?;
    let mut runner = OperationRunner::new();
    let mut tracker = SnapshotTracker::new("events");
    let accountant = StorageAccountant::new();
    let mut candidate = Subject::new(SubjectLabel::Candidate);
    let mut gen = DataGen::new(cfg.seed);

    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &layout,
        &mut candidate,
        &Operation::new(
            "create_events",
            Statement::CreateTable {
                table: "events".into(),
                columns: vec![
                    Column::new("event_id", "BIGINT"),
                    Column::new("event_type", "VARCHAR"),
                    Column::new("event_data", "VARCHAR"),
                ],
            },
        ),
        false,
    )?;

    let event_rows: Vec<Vec<Value>> = (1..=3)
        .map(|i| {
            let e = gen.event(i);
            vec![
                Value::Int(e.event_id),
                Value::Text(e.event_type),
                Value::Text(e.payload),
            ]
        })
        .collect();
    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &layout,
        &mut candidate,
        &Operation::new(
            "seed_events",
            Statement::Insert {
                table: "events".into(),
                columns: vec!["event_id".into(), "event_type".into(), "event_data".into()],
                rows: event_rows,
            },
        ),
        true,
    )?;

    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &layout,
        &mut candidate,
        &Operation::new(
            "add_priority_column",
            Statement::AddColumn {
                table: "events".into(),
                column: Column::new("priority", "INTEGER"),
            },
        ),
        true,
    )?;

    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &layout,
        &mut candidate,
        &Operation::new(
            "backfill_priority",
            Statement::Update {
                table: "events".into(),
                assignments: vec![("priority".into(), Value::Int(5))],
                filter: Filter::All,
            },
        ),
        true,
    )?;

    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &layout,
        &mut candidate,
        &Operation::new(
            "rename_event_data",
            Statement::RenameColumn {
                table: "events".into(),
                from: "event_data".into(),
                to: "payload".into(),
            },
        ),
        true,
    )?;

    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &layout,
        &mut candidate,
        &Operation::new(
            "drop_priority_column",
            Statement::DropColumn {
                table: "events".into(),
                column: "priority".into(),
            },
        ),
        true,
    )?;

    // schema churn must leave committed history readable
    tracker.verify_history(session.as_mut())?;

    session.detach()?;
    Ok(UnitOutcome {
        unit: "schema_evolution".into(),
        subjects: vec![candidate],
        comparisons: Vec::new(),
        snapshots: tracker.into_records(),
        update_stats: None,
        audit: runner.take_audit(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// portability: the whole store is the catalog file plus its data
// directory, so a byte copy must be a working store
// ────────────────────────────────────────────────────────────────────────────

fn portability(cfg: &UnitConfig, open: &SessionFactory) -> BenchResult<UnitOutcome> {
    tracing::info!(unit = "portability", "starting");
    let source_layout = StoreLayout::for_catalog(cfg.data_root.join("portability_source.ducklake"));
    source_layout.scrub()?;
    let copy_layout = StoreLayout::for_catalog(cfg.data_root.join("portability_copy.ducklake"));
    copy_layout.scrub()?;

    let mut runner = OperationRunner::new();
    let mut tracker = SnapshotTracker::new("products");
    let accountant = StorageAccountant::new();
    let mut source_subject = Subject::new(SubjectLabel::Baseline);
    let mut gen = DataGen::new(cfg.seed);

    let mut session = open(&source_layout)?;
    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &source_layout,
        &mut source_subject,
        &Operation::new(
            "create_products",
            Statement::CreateTable {
                table: "products".into(),
                columns: vec![
                    Column::new("product_id", "BIGINT"),
                    Column::new("product_name", "VARCHAR"),
                    Column::new("quantity", "BIGINT"),
                    Column::new("price", "DOUBLE"),
                ],
            },
        ),
        false,
    )?;
    let product_rows: Vec<Vec<Value>> = (1..=5)
        .map(|i| {
            let p = gen.product(i);
            vec![
                Value::Int(p.product_id),
                Value::Text(p.product_name),
                Value::Int(p.quantity),
                Value::Float(p.price),
            ]
        })
        .collect();
    run_tracked(
        &mut runner,
        session.as_mut(),
        &mut tracker,
        &accountant,
        &source_layout,
        &mut source_subject,
        &Operation::new(
            "stock_products",
            Statement::Insert {
                table: "products".into(),
                columns: vec![
                    "product_id".into(),
                    "product_name".into(),
                    "quantity".into(),
                    "price".into(),
                ],
                rows: product_rows,
            },
        ),
        true,
    )?;
    let source_rows = session.row_count("products")?;
    let source_version = session.current_version()?;
    session.detach()?;
    drop(session);

    let source_bytes = accountant.size_of_layout(&source_layout)?;
    let source_files = store_file_total(&source_layout)?;

    let mut copy_subject = Subject::new(SubjectLabel::Candidate);
    let started = Instant::now();
    storage::copy_store(&source_layout, &copy_layout)?;
    copy_subject.record(
        Measurement::success("copy_store", started.elapsed()).with_storage(
            accountant.size_of_layout(&copy_layout)?,
            count_files(&copy_layout.data_dir, DATA_FILE_EXT)?,
        ),
    )?;

    let started = Instant::now();
    let mut copy_session = open(&copy_layout)?;
    let copy_rows = copy_session.row_count("products")?;
    let copy_version = copy_session.current_version()?;
    copy_subject.record(
        Measurement::success("verify_copy", started.elapsed())
            .with_storage(
                accountant.size_of_layout(&copy_layout)?,
                count_files(&copy_layout.data_dir, DATA_FILE_EXT)?,
            )
            .with_version(copy_version),
    )?;
    copy_session.detach()?;

    if copy_rows != source_rows {
        return Err(BenchError::Invariant(format!(
            "copied store lost rows: {} in source, {} in copy",
            source_rows, copy_rows
        )));
    }
    if copy_version != source_version {
        return Err(BenchError::Invariant(format!(
            "copied store lost snapshot history: version {} in source, {} in copy",
            source_version, copy_version
        )));
    }

    let comparisons = vec![
        judge(
            "row_count",
            source_rows as f64,
            copy_rows as f64,
            OverheadPolicy::strict(),
        ),
        judge(
            "storage_bytes",
            source_bytes as f64,
            accountant.size_of_layout(&copy_layout)? as f64,
            OverheadPolicy::strict(),
        ),
        judge(
            "total_files",
            source_files as f64,
            store_file_total(&copy_layout)? as f64,
            OverheadPolicy::strict(),
        ),
    ];

    Ok(UnitOutcome {
        unit: "portability".into(),
        subjects: vec![source_subject, copy_subject],
        comparisons,
        snapshots: tracker.into_records(),
        update_stats: None,
        audit: runner.take_audit(),
    })
}
