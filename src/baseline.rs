//! Traditional lakehouse-format baseline.
//!
//! Simulates the write amplification of a classic table format where
//! every commit lays down a new data file, a manifest, a re-written
//! manifest list, and a snapshot pointer. Only sizes and counts matter
//! here, so file bodies are synthetic payloads of realistic
//! proportions rather than real Parquet and Avro.

use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::storage::{count_all_files, dir_size};
use crate::{BenchResult, Measurement};

const INITIAL_DATA_REPEATS: usize = 200;
const UPDATE_DATA_REPEATS: usize = 20;
const METADATA_REPEATS: usize = 10;

/// Removes a previous baseline tree. Idempotent.
pub fn scrub(root: &Path) -> BenchResult<()> {
    match fs::remove_dir_all(root) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Builds the baseline store under `root`: one bootstrap commit and
/// `updates` single-row commits, each paying the full four-file cost.
/// Returns the timed measurements for both phases.
pub fn simulate(root: &Path, updates: usize) -> BenchResult<Vec<Measurement>> {
    let data = root.join("data");
    let manifests = root.join("metadata").join("manifests");
    let snapshots = root.join("metadata").join("snapshots");
    fs::create_dir_all(&data)?;
    fs::create_dir_all(&manifests)?;
    fs::create_dir_all(&snapshots)?;

    let started = Instant::now();
    fs::write(
        data.join("data-00000.parquet"),
        "PARQUET".repeat(INITIAL_DATA_REPEATS),
    )?;
    fs::write(manifests.join("manifest-0.json"), manifest_body(0))?;
    fs::write(
        root.join("metadata").join("manifest-list-0.json"),
        manifest_list_body(0),
    )?;
    fs::write(snapshots.join("snapshot-v0.json"), snapshot_body(0))?;
    let bootstrap = Measurement::success("baseline_bootstrap", started.elapsed())
        .with_storage(dir_size(root)?, count_all_files(root)?);

    let started = Instant::now();
    for commit in 1..=updates {
        fs::write(
            data.join(format!("data-{:05}.parquet", commit)),
            "PARQUET".repeat(UPDATE_DATA_REPEATS),
        )?;
        fs::write(
            manifests.join(format!("manifest-{}.json", commit)),
            manifest_body(commit),
        )?;
        // the manifest list is rewritten in full on every commit
        fs::write(
            root.join("metadata").join(format!("manifest-list-{}.json", commit)),
            manifest_list_body(commit),
        )?;
        fs::write(
            snapshots.join(format!("snapshot-v{}.json", commit)),
            snapshot_body(commit),
        )?;
    }
    let update_phase = Measurement::success("baseline_small_updates", started.elapsed())
        .with_storage(dir_size(root)?, count_all_files(root)?);

    tracing::debug!(
        root = %root.display(),
        updates,
        files = update_phase.file_count,
        bytes = update_phase.byte_size,
        "baseline store written"
    );
    Ok(vec![bootstrap, update_phase])
}

// Bodies are repeated so they carry metadata-like weight; nothing
// parses them.

fn manifest_body(commit: usize) -> String {
    format!(
        r#"{{"manifest": {c}, "added-files": 1, "data-file": "data-{c:05}.parquet"}}"#,
        c = commit
    )
    .repeat(METADATA_REPEATS)
}

fn manifest_list_body(upto: usize) -> String {
    let entries: Vec<String> = (0..=upto)
        .map(|c| format!(r#""manifest-{}.json""#, c))
        .collect();
    format!(r#"{{"snapshot": {}, "manifests": [{}]}}"#, upto, entries.join(", "))
        .repeat(METADATA_REPEATS)
}

fn snapshot_body(commit: usize) -> String {
    format!(
        r#"{{"snapshot-id": {c}, "parent": {p}, "manifest-list": "manifest-list-{c}.json"}}"#,
        c = commit,
        p = commit as i64 - 1
    )
    .repeat(METADATA_REPEATS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::count_files;

    #[test]
    fn ten_updates_cost_forty_four_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("baseline");
        let measurements = simulate(&root, 10).unwrap();

        // 4 bootstrap files + 4 per update
        assert_eq!(count_all_files(&root).unwrap(), 44);
        assert_eq!(count_files(&root, "parquet").unwrap(), 11);

        assert_eq!(measurements.len(), 2);
        assert!(measurements.iter().all(|m| !m.failed));
        assert_eq!(measurements[1].file_count, 44);
        assert!(measurements[1].byte_size > measurements[0].byte_size);
    }

    #[test]
    fn bootstrap_alone_costs_four_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("baseline");
        let measurements = simulate(&root, 0).unwrap();
        assert_eq!(count_all_files(&root).unwrap(), 4);
        assert_eq!(measurements[0].file_count, 4);
        assert_eq!(measurements[1].file_count, 4);
    }

    #[test]
    fn manifest_list_grows_with_history() {
        assert!(manifest_list_body(9).len() > manifest_list_body(1).len());
    }

    #[test]
    fn scrub_then_resimulate_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("baseline");
        simulate(&root, 3).unwrap();
        let first = dir_size(&root).unwrap();
        scrub(&root).unwrap();
        assert_eq!(count_all_files(&root).unwrap(), 0);
        simulate(&root, 3).unwrap();
        assert_eq!(dir_size(&root).unwrap(), first);
    }
}
