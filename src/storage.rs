//! Storage accounting for a catalog-backed store.
//!
//! A store is a metadata file (the catalog database, plus its WAL
//! sibling while one exists) and a data directory of immutable data
//! files. Accounting never follows symlinks and treats missing
//! artifacts as zero bytes so that freshly scrubbed or partially
//! created stores measure cleanly.

use std::fs;
use std::path::{Path, PathBuf};

use crate::BenchResult;

/// Extension used by the engine for data files.
pub const DATA_FILE_EXT: &str = "parquet";

/// On-disk locations of one store.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    pub metadata_path: PathBuf,
    pub data_dir: PathBuf,
}

impl StoreLayout {
    /// Derives the layout from a catalog path. Data files live in the
    /// `<catalog>.files` sibling directory, the engine default.
    pub fn for_catalog(metadata_path: impl Into<PathBuf>) -> Self {
        let metadata_path = metadata_path.into();
        let data_dir = PathBuf::from(format!("{}.files", metadata_path.display()));
        Self {
            metadata_path,
            data_dir,
        }
    }

    /// Removes every artifact of the store so a unit starts from
    /// nothing. Idempotent.
    pub fn scrub(&self) -> BenchResult<()> {
        remove_file_if_present(&self.metadata_path)?;
        remove_file_if_present(&wal_sibling(&self.metadata_path))?;
        match fs::remove_dir_all(&self.data_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Sums the storage footprint of a store: metadata bytes plus the bytes
/// of data files carrying the configured extension.
#[derive(Debug, Clone)]
pub struct StorageAccountant {
    data_extension: String,
}

impl StorageAccountant {
    pub fn new() -> Self {
        Self::with_extension(DATA_FILE_EXT)
    }

    pub fn with_extension(extension: &str) -> Self {
        Self {
            data_extension: extension.to_string(),
        }
    }

    /// Total bytes attributable to the store rooted at `catalog_path`.
    /// Counts the catalog file, its WAL sibling if present, and every
    /// data file under the derived data directory.
    pub fn size_of(&self, catalog_path: &Path) -> BenchResult<u64> {
        let layout = StoreLayout::for_catalog(catalog_path);
        self.size_of_layout(&layout)
    }

    pub fn size_of_layout(&self, layout: &StoreLayout) -> BenchResult<u64> {
        let metadata = file_len_no_follow(&layout.metadata_path)?;
        let wal = file_len_no_follow(&wal_sibling(&layout.metadata_path))?;
        let (_, data_bytes) = census_tree(&layout.data_dir, Some(&self.data_extension))?;
        Ok(metadata + wal + data_bytes)
    }
}

impl Default for StorageAccountant {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts regular files under `path` whose extension matches
/// `extension`. Symlinks are skipped; a missing tree counts zero.
pub fn count_files(path: &Path, extension: &str) -> BenchResult<u64> {
    Ok(census_tree(path, Some(extension))?.0)
}

/// Counts every regular file under `path`, any extension.
pub fn count_all_files(path: &Path) -> BenchResult<u64> {
    Ok(census_tree(path, None)?.0)
}

/// Total bytes of every regular file under `path`.
pub fn dir_size(path: &Path) -> BenchResult<u64> {
    Ok(census_tree(path, None)?.1)
}

/// File count of a whole store: one for the metadata file when present,
/// plus everything in the data directory.
pub fn store_file_total(layout: &StoreLayout) -> BenchResult<u64> {
    let metadata = match fs::symlink_metadata(&layout.metadata_path) {
        Ok(meta) if meta.is_file() => 1,
        _ => 0,
    };
    Ok(metadata + count_all_files(&layout.data_dir)?)
}

/// Clones a store byte for byte: catalog file, WAL sibling if one
/// exists, and the full data directory. The destination is scrubbed
/// first.
pub fn copy_store(source: &StoreLayout, dest: &StoreLayout) -> BenchResult<()> {
    dest.scrub()?;
    if fs::symlink_metadata(&source.metadata_path).is_ok() {
        if let Some(parent) = dest.metadata_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source.metadata_path, &dest.metadata_path)?;
    }
    let source_wal = wal_sibling(&source.metadata_path);
    if fs::symlink_metadata(&source_wal).is_ok() {
        fs::copy(&source_wal, &wal_sibling(&dest.metadata_path))?;
    }
    copy_tree(&source.data_dir, &dest.data_dir)
}

fn copy_tree(source: &Path, dest: &Path) -> BenchResult<()> {
    let meta = match fs::symlink_metadata(source) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if !meta.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            continue;
        }
        let target = dest.join(entry.file_name());
        if file_type.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn wal_sibling(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.wal", path.display()))
}

fn remove_file_if_present(path: &Path) -> BenchResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn file_len_no_follow(path: &Path) -> BenchResult<u64> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        Ok(_) => Ok(0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "artifact absent, counted as 0 bytes");
            Ok(0)
        }
        Err(e) => Err(e.into()),
    }
}

/// Walks a tree and returns `(file_count, byte_total)` over regular
/// files, filtered by extension when one is given.
fn census_tree(path: &Path, extension: Option<&str>) -> BenchResult<(u64, u64)> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "tree absent, counted as empty");
            return Ok((0, 0));
        }
        Err(e) => return Err(e.into()),
    };
    if meta.is_symlink() {
        return Ok((0, 0));
    }
    if meta.is_file() {
        return Ok(if extension_matches(path, extension) {
            (1, meta.len())
        } else {
            (0, 0)
        });
    }
    if !meta.is_dir() {
        return Ok((0, 0));
    }

    let mut files = 0u64;
    let mut bytes = 0u64;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            continue;
        }
        if file_type.is_dir() {
            let (sub_files, sub_bytes) = census_tree(&entry.path(), extension)?;
            files += sub_files;
            bytes += sub_bytes;
        } else if file_type.is_file() && extension_matches(&entry.path(), extension) {
            files += 1;
            bytes += entry.metadata()?.len();
        }
    }
    Ok((files, bytes))
}

fn extension_matches(path: &Path, extension: Option<&str>) -> bool {
    match extension {
        None => true,
        Some(ext) => path.extension().map(|e| e == ext).unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, bytes: usize) {
        fs::write(path, vec![b'x'; bytes]).unwrap();
    }

    #[test]
    fn missing_tree_counts_zero() {
        let dir = tempfile::tempdir().unwrap();
        let ghost = dir.path().join("nope");
        assert_eq!(count_files(&ghost, "parquet").unwrap(), 0);
        assert_eq!(dir_size(&ghost).unwrap(), 0);
        let accountant = StorageAccountant::new();
        assert_eq!(accountant.size_of(&ghost.join("cat.ducklake")).unwrap(), 0);
    }

    #[test]
    fn census_filters_by_extension_and_recurses() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("part=0");
        fs::create_dir(&sub).unwrap();
        write(&dir.path().join("a.parquet"), 10);
        write(&sub.join("b.parquet"), 20);
        write(&sub.join("note.txt"), 999);

        assert_eq!(count_files(dir.path(), "parquet").unwrap(), 2);
        assert_eq!(count_all_files(dir.path()).unwrap(), 3);
        assert_eq!(dir_size(dir.path()).unwrap(), 10 + 20 + 999);
    }

    #[test]
    fn repeated_census_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..12 {
            write(&dir.path().join(format!("f{i}.parquet")), 7 * (i + 1));
        }
        let first = census_tree(dir.path(), Some("parquet")).unwrap();
        let second = census_tree(dir.path(), Some("parquet")).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.0, 12);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_excluded() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("real.parquet"), 64);
        std::os::unix::fs::symlink(
            dir.path().join("real.parquet"),
            dir.path().join("alias.parquet"),
        )
        .unwrap();

        assert_eq!(count_files(dir.path(), "parquet").unwrap(), 1);
        assert_eq!(dir_size(dir.path()).unwrap(), 64);
    }

    #[test]
    fn accountant_counts_catalog_wal_and_data() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("lake.ducklake");
        let layout = StoreLayout::for_catalog(&catalog);
        write(&layout.metadata_path, 100);
        write(&PathBuf::from(format!("{}.wal", catalog.display())), 30);
        fs::create_dir(&layout.data_dir).unwrap();
        write(&layout.data_dir.join("d0.parquet"), 50);
        write(&layout.data_dir.join("scratch.tmp"), 500);

        let accountant = StorageAccountant::new();
        assert_eq!(accountant.size_of(&catalog).unwrap(), 100 + 30 + 50);
        assert_eq!(store_file_total(&layout).unwrap(), 1 + 2);
    }

    #[test]
    fn copy_store_clones_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let source = StoreLayout::for_catalog(dir.path().join("src.ducklake"));
        let dest = StoreLayout::for_catalog(dir.path().join("dst.ducklake"));
        write(&source.metadata_path, 80);
        fs::create_dir_all(source.data_dir.join("nested")).unwrap();
        write(&source.data_dir.join("a.parquet"), 40);
        write(&source.data_dir.join("nested").join("b.parquet"), 60);

        copy_store(&source, &dest).unwrap();

        let accountant = StorageAccountant::new();
        assert_eq!(
            accountant.size_of_layout(&dest).unwrap(),
            accountant.size_of_layout(&source).unwrap()
        );
        assert_eq!(
            store_file_total(&dest).unwrap(),
            store_file_total(&source).unwrap()
        );
    }

    #[test]
    fn scrub_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::for_catalog(dir.path().join("lake.ducklake"));
        write(&layout.metadata_path, 10);
        fs::create_dir(&layout.data_dir).unwrap();
        write(&layout.data_dir.join("d.parquet"), 10);

        layout.scrub().unwrap();
        assert!(!layout.metadata_path.exists());
        assert!(!layout.data_dir.exists());
        layout.scrub().unwrap();
    }
}
