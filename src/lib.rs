//! DuckLake measurement harness.
//!
//! Compares a DuckLake-backed lakehouse against a traditional
//! file-per-commit layout across a set of measurement units: small-file
//! churn, time travel, transactional rollback, schema evolution, and
//! catalog portability. Each unit drives real operations through a
//! [`catalog::CatalogSession`], times them, accounts the bytes and files
//! they leave on disk, and tracks the snapshot versions they commit.

pub mod baseline;
pub mod catalog;
pub mod compare;
pub mod ops;
pub mod report;
pub mod runner;
pub mod snapshot;
pub mod storage;
pub mod units;

use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, LogNormal, Normal};
use serde::Serialize;

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Error type shared across the harness.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// The engine rejected or failed an operation. Recorded on the
    /// measurement; the unit keeps running.
    #[error("engine: {0}")]
    Engine(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Bad harness input, e.g. an identifier that fails validation.
    #[error("config: {0}")]
    Config(String),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("export: {0}")]
    Export(#[from] csv::Error),

    /// A correctness property did not hold. Fatal to the unit that
    /// observed it and never downgraded to an operation failure.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

pub type BenchResult<T> = Result<T, BenchError>;

impl BenchError {
    pub fn is_invariant(&self) -> bool {
        matches!(self, BenchError::Invariant(_))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Core measurement types
// ────────────────────────────────────────────────────────────────────────────

/// Snapshot version assigned by the catalog at commit time.
pub type SnapshotId = u64;

/// Outcome of one executed operation: wall-clock duration plus the
/// storage footprint and snapshot version observed right after it ran.
#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    pub operation: String,
    pub duration_secs: f64,
    pub byte_size: u64,
    pub file_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_version: Option<SnapshotId>,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl Measurement {
    pub fn success(operation: &str, duration: Duration) -> Self {
        Self {
            operation: operation.to_string(),
            duration_secs: duration.as_secs_f64(),
            byte_size: 0,
            file_count: 0,
            snapshot_version: None,
            failed: false,
            error_text: None,
        }
    }

    pub fn failure(operation: &str, duration: Duration, error_text: String) -> Self {
        let error_text = if error_text.is_empty() {
            "unspecified operation failure".to_string()
        } else {
            error_text
        };
        Self {
            operation: operation.to_string(),
            duration_secs: duration.as_secs_f64(),
            byte_size: 0,
            file_count: 0,
            snapshot_version: None,
            failed: true,
            error_text: Some(error_text),
        }
    }

    pub fn with_storage(mut self, byte_size: u64, file_count: u64) -> Self {
        self.byte_size = byte_size;
        self.file_count = file_count;
        self
    }

    pub fn with_version(mut self, version: SnapshotId) -> Self {
        self.snapshot_version = Some(version);
        self
    }
}

/// Which side of a comparison a set of measurements belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectLabel {
    Baseline,
    Candidate,
}

impl std::fmt::Display for SubjectLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubjectLabel::Baseline => write!(f, "baseline"),
            SubjectLabel::Candidate => write!(f, "candidate"),
        }
    }
}

/// One side of a comparison and everything measured for it.
#[derive(Debug, Clone, Serialize)]
pub struct Subject {
    pub label: SubjectLabel,
    pub measurements: Vec<Measurement>,
}

impl Subject {
    pub fn new(label: SubjectLabel) -> Self {
        Self {
            label,
            measurements: Vec::new(),
        }
    }

    /// Appends a measurement after checking it is well formed: durations
    /// must be finite and non-negative, and failures must carry text.
    pub fn record(&mut self, m: Measurement) -> BenchResult<()> {
        if !m.duration_secs.is_finite() || m.duration_secs < 0.0 {
            return Err(BenchError::Invariant(format!(
                "measurement '{}' has a negative or non-finite duration: {}",
                m.operation, m.duration_secs
            )));
        }
        if m.failed && m.error_text.as_deref().map_or(true, str::is_empty) {
            return Err(BenchError::Invariant(format!(
                "failed measurement '{}' carries no error text",
                m.operation
            )));
        }
        self.measurements.push(m);
        Ok(())
    }

    /// Total wall-clock time across successful operations. Failed
    /// operations are excluded rather than counted as zero.
    pub fn total_duration_secs(&self) -> f64 {
        self.measurements
            .iter()
            .filter(|m| !m.failed)
            .map(|m| m.duration_secs)
            .sum()
    }

    /// Storage footprint after the most recent successful operation.
    pub fn final_byte_size(&self) -> Option<u64> {
        self.measurements
            .iter()
            .rev()
            .find(|m| !m.failed)
            .map(|m| m.byte_size)
    }

    /// Data-file count after the most recent successful operation.
    pub fn final_file_count(&self) -> Option<u64> {
        self.measurements
            .iter()
            .rev()
            .find(|m| !m.failed)
            .map(|m| m.file_count)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Measurement> {
        self.measurements.iter().filter(|m| m.failed)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Deterministic data generation
// ────────────────────────────────────────────────────────────────────────────

const LOCATIONS: &[&str] = &["warehouse_a", "warehouse_b", "loading_dock", "cold_room"];
const EVENT_TYPES: &[&str] = &["click", "view", "purchase", "signup", "logout"];
const PRODUCT_NAMES: &[&str] = &["Widget", "Gadget", "Doohickey", "Gizmo", "Sprocket"];

#[derive(Debug, Clone)]
pub struct SensorReading {
    pub sensor_id: String,
    pub recorded_at: i64,
    pub temperature: f64,
    pub humidity: f64,
    pub location: String,
}

#[derive(Debug, Clone)]
pub struct ProductRow {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct EventRow {
    pub event_id: i64,
    pub event_type: String,
    pub payload: String,
}

/// Deterministic test data generator. Same seed, same rows.
pub struct DataGen {
    rng: ChaCha8Rng,
}

impl DataGen {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn sensor_reading(&mut self, seq: u64) -> SensorReading {
        let temp_dist: Normal<f64> = Normal::new(21.0, 4.0).unwrap();
        SensorReading {
            sensor_id: format!("sensor_{:03}", self.rng.gen_range(0..48)),
            recorded_at: 1_700_000_000 + (seq as i64) * 60,
            temperature: (temp_dist.sample(&mut self.rng) * 100.0).round() / 100.0,
            humidity: (self.rng.gen_range(25.0..75.0_f64) * 10.0).round() / 10.0,
            location: LOCATIONS[self.rng.gen_range(0..LOCATIONS.len())].to_string(),
        }
    }

    pub fn product(&mut self, seq: u64) -> ProductRow {
        let price_dist: LogNormal<f64> = LogNormal::new(3.0, 0.8).unwrap();
        ProductRow {
            product_id: seq as i64,
            product_name: format!(
                "{} {:03}",
                PRODUCT_NAMES[self.rng.gen_range(0..PRODUCT_NAMES.len())],
                seq
            ),
            quantity: self.rng.gen_range(10..500),
            price: (price_dist.sample(&mut self.rng) * 100.0).round() / 100.0,
        }
    }

    pub fn event(&mut self, seq: u64) -> EventRow {
        EventRow {
            event_id: seq as i64,
            event_type: EVENT_TYPES[self.rng.gen_range(0..EVENT_TYPES.len())].to_string(),
            payload: format!(
                r#"{{"session":"s_{:06}","step":{}}}"#,
                self.rng.gen_range(0..1_000_000),
                self.rng.gen_range(1..20)
            ),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Latency recording for repeated-operation loops
// ────────────────────────────────────────────────────────────────────────────

/// HDR-histogram recorder for the small-update loop. Tracks per-update
/// latency percentiles and overall throughput.
pub struct UpdateRecorder {
    hist: Histogram<u64>,
    started: Instant,
    ops: u64,
}

impl UpdateRecorder {
    pub fn new() -> Self {
        Self {
            // 1ns to 60s, 3 significant figures
            hist: Histogram::new_with_bounds(1, 60_000_000_000, 3).unwrap(),
            started: Instant::now(),
            ops: 0,
        }
    }

    pub fn record(&mut self, duration: Duration) {
        let nanos = duration.as_nanos().min(u64::MAX as u128) as u64;
        let _ = self.hist.record(nanos.max(1));
        self.ops += 1;
    }

    pub fn record_secs(&mut self, secs: f64) {
        self.record(Duration::from_secs_f64(secs.max(0.0)));
    }

    pub fn ops(&self) -> u64 {
        self.ops
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn per_sec(&self) -> f64 {
        self.ops as f64 / self.elapsed_secs().max(1e-9)
    }

    pub fn percentile_us(&self, pct: f64) -> u64 {
        self.hist.value_at_quantile(pct / 100.0) / 1_000
    }

    pub fn mean_us(&self) -> f64 {
        self.hist.mean() / 1_000.0
    }
}

impl Default for UpdateRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datagen_is_deterministic_per_seed() {
        let mut a = DataGen::new(42);
        let mut b = DataGen::new(42);
        for i in 0..20 {
            let ra = a.sensor_reading(i);
            let rb = b.sensor_reading(i);
            assert_eq!(ra.sensor_id, rb.sensor_id);
            assert_eq!(ra.temperature, rb.temperature);
            assert_eq!(ra.location, rb.location);
        }
    }

    #[test]
    fn datagen_seeds_diverge() {
        let mut a = DataGen::new(1);
        let mut b = DataGen::new(2);
        let differs = (0..10).any(|i| {
            let ra = a.sensor_reading(i);
            let rb = b.sensor_reading(i);
            ra.sensor_id != rb.sensor_id || ra.temperature != rb.temperature
        });
        assert!(differs);
    }

    #[test]
    fn failure_measurement_always_carries_text() {
        let m = Measurement::failure("op", Duration::from_millis(1), String::new());
        assert!(m.failed);
        assert!(!m.error_text.unwrap().is_empty());
    }

    #[test]
    fn subject_rejects_negative_duration() {
        let mut s = Subject::new(SubjectLabel::Candidate);
        let mut m = Measurement::success("op", Duration::from_millis(1));
        m.duration_secs = -0.5;
        let err = s.record(m).unwrap_err();
        assert!(err.is_invariant());
    }

    #[test]
    fn subject_excludes_failures_from_totals() {
        let mut s = Subject::new(SubjectLabel::Candidate);
        s.record(Measurement::success("a", Duration::from_secs(1)).with_storage(100, 2))
            .unwrap();
        s.record(Measurement::failure(
            "b",
            Duration::from_secs(5),
            "boom".into(),
        ))
        .unwrap();
        assert!((s.total_duration_secs() - 1.0).abs() < 1e-9);
        assert_eq!(s.final_byte_size(), Some(100));
        assert_eq!(s.final_file_count(), Some(2));
        assert_eq!(s.failures().count(), 1);
    }

    #[test]
    fn recorder_tracks_ops_and_percentiles() {
        let mut rec = UpdateRecorder::new();
        for ms in [1u64, 2, 3, 4, 50] {
            rec.record(Duration::from_millis(ms));
        }
        assert_eq!(rec.ops(), 5);
        assert!(rec.percentile_us(99.0) >= rec.percentile_us(50.0));
        assert!(rec.mean_us() > 0.0);
    }
}
