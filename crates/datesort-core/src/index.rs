use ahash::AHashMap;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::error::Error;
use crate::hasher::{self, CompareError};
use crate::progress::ProgressReporter;
use crate::scanner::Walker;

/// A file identified by its path and the fingerprint of its full content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub fingerprint: u64,
    pub len: u64,
}

impl FileRecord {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let len = path
            .metadata()
            .map_err(|e| Error::file_access(path, e))?
            .len();
        let fingerprint = hasher::hash_file(path).map_err(|e| Error::file_access(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            fingerprint,
            len,
        })
    }

    /// Full byte comparison. Fingerprint and length only rule candidates out.
    /// A read failure is reported against whichever file could not be read.
    pub fn content_equals(&self, other: &FileRecord) -> Result<bool, Error> {
        if self.fingerprint != other.fingerprint || self.len != other.len {
            return Ok(false);
        }
        hasher::contents_equal(&self.path, &other.path).map_err(|e| match e {
            CompareError::Left(e) => Error::file_access(&self.path, e),
            CompareError::Right(e) => Error::file_access(&other.path, e),
        })
    }

    /// Same content, different location.
    pub fn relocated(&self, path: PathBuf) -> Self {
        Self {
            path,
            fingerprint: self.fingerprint,
            len: self.len,
        }
    }
}

/// Content-addressed view of every file in the destination tree plus every
/// file copied during the current run. Records are only ever added.
#[derive(Debug, Default)]
pub struct ContentIndex {
    records: AHashMap<u64, Vec<FileRecord>>,
    len: usize,
    build_errors: usize,
}

impl ContentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint every file below `root`. Returns once the whole tree is
    /// indexed. Files that cannot be read are logged and counted but do not
    /// fail the build.
    pub fn build(root: &Path, reporter: &dyn ProgressReporter) -> Result<Self, Error> {
        let walker = Walker::new(root)?;
        let start = Instant::now();
        reporter.on_index_start(root);

        let mut index = Self::new();
        let mut paths = Vec::new();
        for entry in walker.walk() {
            match entry {
                Ok(path) => paths.push(path),
                Err(e) => {
                    error!("Error indexing: {}", e);
                    index.build_errors += 1;
                }
            }
        }

        let total = paths.len();
        let hashed = AtomicUsize::new(0);
        let records: Vec<Result<FileRecord, Error>> = paths
            .par_iter()
            .map(|path| {
                let record = FileRecord::from_path(path);
                let done = hashed.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.on_index_progress(done, total);
                record
            })
            .collect();

        for record in records {
            match record {
                Ok(record) => {
                    trace!("Indexed {} ({:016x})", record.path.display(), record.fingerprint);
                    index.insert_record(record);
                }
                Err(e) => {
                    error!("Error indexing: {}", e);
                    index.build_errors += 1;
                }
            }
        }

        let duration = start.elapsed();
        info!(
            "Indexed {} files in {} in {:.2}s",
            index.len(),
            root.display(),
            duration.as_secs_f64()
        );
        debug!(
            "{} distinct fingerprints, {} unreadable entries",
            index.records.len(),
            index.build_errors
        );
        reporter.on_index_complete(index.len(), duration.as_secs_f64());

        Ok(index)
    }

    /// Whether a file with the same content as `path` is already indexed,
    /// regardless of its name or location.
    pub fn lookup(&self, path: &Path) -> Result<bool, Error> {
        let record = FileRecord::from_path(path)?;
        Ok(self.find(&record)?.is_some())
    }

    /// The indexed record whose content equals `record`'s, if any.
    ///
    /// An indexed file that can no longer be read does not match; only a
    /// failure to read `record` itself is an error.
    pub fn find(&self, record: &FileRecord) -> Result<Option<&FileRecord>, Error> {
        let Some(candidates) = self.records.get(&record.fingerprint) else {
            return Ok(None);
        };

        for candidate in candidates {
            if candidate.path == record.path {
                return Ok(Some(candidate));
            }
            match record.content_equals(candidate) {
                Ok(true) => return Ok(Some(candidate)),
                Ok(false) => trace!(
                    "Fingerprint collision between {} and {}",
                    record.path.display(),
                    candidate.path.display()
                ),
                Err(Error::FileAccess { path, source }) if path == candidate.path => {
                    warn!("Indexed file {} is unreadable: {}", path.display(), source);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    pub fn insert(&mut self, path: &Path) -> Result<(), Error> {
        let record = FileRecord::from_path(path)?;
        self.insert_record(record);
        Ok(())
    }

    pub fn insert_record(&mut self, record: FileRecord) {
        self.records.entry(record.fingerprint).or_default().push(record);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entries skipped during [`ContentIndex::build`] because they could not
    /// be read.
    pub fn build_errors(&self) -> usize {
        self.build_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_build_indexes_nested_files() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("2023/June/15")).unwrap();
        fs::write(root.join("2023/June/15/a.txt"), "a").unwrap();
        fs::write(root.join("2023/June/15/b.txt"), "b").unwrap();
        fs::write(root.join("top.txt"), "a").unwrap();
        fs::write(root.join(".hidden"), "hidden").unwrap();

        let index = ContentIndex::build(root, &SilentReporter).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.build_errors(), 0);
    }

    #[test]
    fn test_build_rejects_missing_root() {
        let tmp = tempdir().unwrap();
        assert!(matches!(
            ContentIndex::build(&tmp.path().join("nope"), &SilentReporter),
            Err(Error::InvalidRoot(_))
        ));
    }

    #[test]
    fn test_lookup_matches_content_anywhere() {
        let tmp = tempdir().unwrap();
        let dst = tmp.path().join("dst");
        fs::create_dir_all(dst.join("deep/er")).unwrap();
        fs::write(dst.join("deep/er/stored.jpg"), "jpeg bytes").unwrap();

        let candidate = tmp.path().join("renamed.jpg");
        fs::write(&candidate, "jpeg bytes").unwrap();
        let other = tmp.path().join("other.jpg");
        fs::write(&other, "other bytes").unwrap();

        let index = ContentIndex::build(&dst, &SilentReporter).unwrap();
        assert!(index.lookup(&candidate).unwrap());
        assert!(!index.lookup(&other).unwrap());
    }

    #[test]
    fn test_fingerprint_collision_needs_byte_equality() {
        let tmp = tempdir().unwrap();
        let stored = tmp.path().join("stored.bin");
        let incoming = tmp.path().join("incoming.bin");
        fs::write(&stored, "content one").unwrap();
        fs::write(&incoming, "content two").unwrap();

        let incoming_record = FileRecord::from_path(&incoming).unwrap();

        // Forge a record that shares the incoming fingerprint and length but
        // not its bytes.
        let mut index = ContentIndex::new();
        index.insert_record(FileRecord {
            path: stored.clone(),
            fingerprint: incoming_record.fingerprint,
            len: incoming_record.len,
        });

        assert!(index.find(&incoming_record).unwrap().is_none());
        assert!(!index.lookup(&incoming).unwrap());
    }

    #[test]
    fn test_insert_makes_content_visible() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.txt");
        let b = tmp.path().join("b.txt");
        fs::write(&a, "same").unwrap();
        fs::write(&b, "same").unwrap();

        let mut index = ContentIndex::new();
        assert!(index.is_empty());
        assert!(!index.lookup(&b).unwrap());

        index.insert(&a).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.lookup(&b).unwrap());

        let found = index.find(&FileRecord::from_path(&b).unwrap()).unwrap();
        assert_eq!(found.map(|r| r.path.as_path()), Some(a.as_path()));
    }

    #[test]
    fn test_empty_files_share_a_bucket() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("empty_a");
        let b = tmp.path().join("empty_b");
        fs::write(&a, "").unwrap();
        fs::write(&b, "").unwrap();

        let mut index = ContentIndex::new();
        index.insert(&a).unwrap();
        assert!(index.lookup(&b).unwrap());
    }

    #[test]
    fn test_vanished_indexed_file_is_not_a_match() {
        let tmp = tempdir().unwrap();
        let dst = tmp.path().join("dst");
        fs::create_dir_all(dst.join("x")).unwrap();
        fs::write(dst.join("x/old.txt"), "payload").unwrap();
        let incoming = tmp.path().join("a.txt");
        fs::write(&incoming, "payload").unwrap();

        let index = ContentIndex::build(&dst, &SilentReporter).unwrap();
        fs::remove_file(dst.join("x/old.txt")).unwrap();

        let record = FileRecord::from_path(&incoming).unwrap();
        assert!(index.find(&record).unwrap().is_none());
        assert!(!index.lookup(&incoming).unwrap());
    }

    #[test]
    fn test_unreadable_source_error_names_the_source() {
        let tmp = tempdir().unwrap();
        let stored = tmp.path().join("stored.txt");
        let incoming = tmp.path().join("incoming.txt");
        fs::write(&stored, "payload").unwrap();
        fs::write(&incoming, "payload").unwrap();

        let mut index = ContentIndex::new();
        index.insert(&stored).unwrap();
        let record = FileRecord::from_path(&incoming).unwrap();
        fs::remove_file(&incoming).unwrap();

        match index.find(&record) {
            Err(Error::FileAccess { path, .. }) => assert_eq!(path, incoming),
            other => panic!("expected a file access error, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_file_is_a_file_access_error() {
        let tmp = tempdir().unwrap();
        let index = ContentIndex::new();
        assert!(matches!(
            index.lookup(&tmp.path().join("gone.txt")),
            Err(Error::FileAccess { .. })
        ));
    }
}
