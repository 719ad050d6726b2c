//! Snapshot version tracking.
//!
//! Every committed mutation must advance the catalog's snapshot
//! version. The tracker records the version observed after each
//! operation, rejects any version that fails to advance, and can later
//! re-read historical row counts to verify that committed history never
//! drifted.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::catalog::CatalogSession;
use crate::{BenchError, BenchResult, SnapshotId};

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotRecord {
    pub operation: String,
    pub version: SnapshotId,
    pub recorded_at: u64,
    /// Row count the tracked table held when this snapshot was taken,
    /// when the caller asked for it to be captured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_rows: Option<u64>,
}

pub struct SnapshotTracker {
    table: String,
    records: Vec<SnapshotRecord>,
}

impl SnapshotTracker {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            records: Vec::new(),
        }
    }

    /// Records the version the catalog reports after `operation`.
    pub fn record(
        &mut self,
        session: &mut dyn CatalogSession,
        operation: &str,
    ) -> BenchResult<SnapshotId> {
        self.push(session, operation, None)
    }

    /// Like [`record`](Self::record), additionally capturing the
    /// current row count so history can be verified later.
    pub fn record_table_state(
        &mut self,
        session: &mut dyn CatalogSession,
        operation: &str,
    ) -> BenchResult<SnapshotId> {
        let rows = session.row_count(&self.table)?;
        self.push(session, operation, Some(rows))
    }

    fn push(
        &mut self,
        session: &mut dyn CatalogSession,
        operation: &str,
        expected_rows: Option<u64>,
    ) -> BenchResult<SnapshotId> {
        let version = session.current_version()?;
        if let Some(last) = self.records.last() {
            if version <= last.version {
                return Err(BenchError::Invariant(format!(
                    "snapshot version did not advance after '{}': {} -> {}",
                    operation, last.version, version
                )));
            }
        }
        tracing::debug!(operation, version, ?expected_rows, "snapshot recorded");
        self.records.push(SnapshotRecord {
            operation: operation.to_string(),
            version,
            recorded_at: epoch_secs(),
            expected_rows,
        });
        Ok(version)
    }

    /// Row count of the tracked table as of `version`, read through the
    /// session's time-travel query.
    pub fn row_count_at(
        &self,
        session: &mut dyn CatalogSession,
        version: SnapshotId,
    ) -> BenchResult<u64> {
        session.row_count_at(&self.table, version)
    }

    /// Re-reads every captured table state through time travel and
    /// checks it against what was seen at commit time.
    pub fn verify_history(&self, session: &mut dyn CatalogSession) -> BenchResult<()> {
        for record in &self.records {
            let Some(expected) = record.expected_rows else {
                continue;
            };
            let seen = session.row_count_at(&self.table, record.version)?;
            if seen != expected {
                return Err(BenchError::Invariant(format!(
                    "history drifted for '{}' at version {}: expected {} rows, read {}",
                    self.table, record.version, expected, seen
                )));
            }
        }
        Ok(())
    }

    pub fn latest_version(&self) -> Option<SnapshotId> {
        self.records.last().map(|r| r.version)
    }

    pub fn records(&self) -> &[SnapshotRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<SnapshotRecord> {
        self.records
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Statement;
    use std::collections::{HashMap, VecDeque};

    struct HistorySession {
        versions: VecDeque<SnapshotId>,
        rows_now: u64,
        history: HashMap<SnapshotId, u64>,
    }

    impl HistorySession {
        fn new(versions: Vec<SnapshotId>) -> Self {
            Self {
                versions: versions.into(),
                rows_now: 0,
                history: HashMap::new(),
            }
        }
    }

    impl CatalogSession for HistorySession {
        fn label(&self) -> &str {
            "history"
        }
        fn execute(&mut self, _statement: &Statement) -> BenchResult<u64> {
            Ok(0)
        }
        fn current_version(&mut self) -> BenchResult<SnapshotId> {
            let v = self.versions.pop_front().unwrap_or(0);
            self.history.insert(v, self.rows_now);
            Ok(v)
        }
        fn snapshot_count(&mut self) -> BenchResult<u64> {
            Ok(self.history.len() as u64)
        }
        fn row_count(&mut self, _table: &str) -> BenchResult<u64> {
            Ok(self.rows_now)
        }
        fn row_count_at(&mut self, _table: &str, version: SnapshotId) -> BenchResult<u64> {
            self.history
                .get(&version)
                .copied()
                .ok_or_else(|| BenchError::Engine(format!("no snapshot {}", version)))
        }
        fn detach(&mut self) -> BenchResult<()> {
            Ok(())
        }
    }

    #[test]
    fn versions_advance_across_commits() {
        let mut session = HistorySession::new(vec![1, 2, 3]);
        let mut tracker = SnapshotTracker::new("users");
        assert_eq!(tracker.record(&mut session, "create").unwrap(), 1);
        assert_eq!(tracker.record(&mut session, "seed").unwrap(), 2);
        assert_eq!(tracker.record(&mut session, "update").unwrap(), 3);
        assert_eq!(tracker.latest_version(), Some(3));
        assert_eq!(tracker.records().len(), 3);
    }

    #[test]
    fn stuck_version_is_an_invariant_violation() {
        let mut session = HistorySession::new(vec![2, 2]);
        let mut tracker = SnapshotTracker::new("users");
        tracker.record(&mut session, "create").unwrap();
        let err = tracker.record(&mut session, "insert").unwrap_err();
        assert!(err.is_invariant());
        assert!(err.to_string().contains("did not advance"));
    }

    #[test]
    fn regressed_version_is_an_invariant_violation() {
        let mut session = HistorySession::new(vec![5, 3]);
        let mut tracker = SnapshotTracker::new("users");
        tracker.record(&mut session, "create").unwrap();
        assert!(tracker.record(&mut session, "insert").unwrap_err().is_invariant());
    }

    #[test]
    fn seeded_count_survives_later_mutations() {
        let mut session = HistorySession::new(vec![1, 2, 3]);
        let mut tracker = SnapshotTracker::new("users");

        session.rows_now = 50_000;
        tracker.record_table_state(&mut session, "bulk_seed").unwrap();
        session.rows_now = 49_000;
        tracker.record_table_state(&mut session, "delete_some").unwrap();
        session.rows_now = 0;
        tracker.record_table_state(&mut session, "delete_all").unwrap();

        tracker.verify_history(&mut session).unwrap();
        assert_eq!(tracker.row_count_at(&mut session, 1).unwrap(), 50_000);
    }

    #[test]
    fn drifted_history_is_fatal() {
        let mut session = HistorySession::new(vec![1]);
        let mut tracker = SnapshotTracker::new("users");
        session.rows_now = 10;
        tracker.record_table_state(&mut session, "insert").unwrap();

        session.history.insert(1, 9);
        let err = tracker.verify_history(&mut session).unwrap_err();
        assert!(err.is_invariant());
        assert!(err.to_string().contains("version 1"));
    }
}
