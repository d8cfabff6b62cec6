use filetime::FileTime;
use std::ffi::{OsStr, OsString};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Error;
use crate::hasher::{self, CompareError};
use crate::index::{ContentIndex, FileRecord};

/// Where a file not yet in the index ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Copied to `destination`. `renamed` is set when the original name was
    /// taken by different content.
    Copied { destination: PathBuf, renamed: bool },
    /// A byte-identical file already sat at this name.
    AlreadyPresent(PathBuf),
}

/// Copy `record` into `destination_dir`, choosing `name_<n>.ext` names until
/// one is free or already holds the same bytes. The index learns about the
/// resulting destination file.
pub fn place(
    record: &FileRecord,
    destination_dir: &Path,
    index: &mut ContentIndex,
) -> Result<Placement, Error> {
    let src = record.path.as_path();
    let file_name = src.file_name().ok_or_else(|| {
        Error::file_access(
            src,
            io::Error::new(ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;

    let mut attempt: Option<u64> = None;
    loop {
        let candidate = destination_dir.join(candidate_name(file_name, attempt));

        if copy_new(src, &candidate)? {
            debug!("Copied {} -> {}", src.display(), candidate.display());
            index.insert_record(record.relocated(candidate.clone()));
            return Ok(Placement::Copied {
                destination: candidate,
                renamed: attempt.is_some(),
            });
        }

        if is_regular_file(&candidate) && same_content(src, &candidate)? {
            debug!(
                "{} already present as {}",
                src.display(),
                candidate.display()
            );
            if index.find(record)?.is_none() {
                index.insert_record(record.relocated(candidate.clone()));
            }
            return Ok(Placement::AlreadyPresent(candidate));
        }

        debug!("Name collision at {}", candidate.display());
        attempt = Some(attempt.map_or(0, |n| n + 1));
    }
}

/// `photo.jpg` with attempt `Some(1)` becomes `photo_1.jpg`; `None` keeps the
/// name. Only the last extension is kept after the suffix.
pub fn candidate_name(file_name: &OsStr, attempt: Option<u64>) -> OsString {
    let Some(n) = attempt else {
        return file_name.to_os_string();
    };

    let path = Path::new(file_name);
    let mut name = path.file_stem().unwrap_or(file_name).to_os_string();
    name.push(format!("_{}", n));
    if let Some(extension) = path.extension() {
        name.push(".");
        name.push(extension);
    }
    name
}

fn same_content(src: &Path, candidate: &Path) -> Result<bool, Error> {
    hasher::contents_equal(src, candidate).map_err(|e| match e {
        CompareError::Left(e) => Error::file_access(src, e),
        CompareError::Right(e) => Error::file_access(candidate, e),
    })
}

fn is_regular_file(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_file())
        .unwrap_or(false)
}

/// Copy `src` to `dst` only if nothing exists at `dst`, carrying over access
/// and modification times and permissions. Returns `Ok(false)` when `dst` is
/// taken. A failed copy leaves no file behind.
fn copy_new(src: &Path, dst: &Path) -> Result<bool, Error> {
    let metadata = fs::metadata(src).map_err(|e| Error::file_access(src, e))?;
    let mut reader = File::open(src).map_err(|e| Error::file_access(src, e))?;

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::file_access(parent, e))?;
    }

    let writer = match OpenOptions::new().write(true).create_new(true).open(dst) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(Error::file_access(dst, e)),
    };

    if let Err(e) = write_copy(&mut reader, writer, dst, &metadata) {
        if let Err(remove_err) = fs::remove_file(dst) {
            warn!(
                "Could not remove partial copy {}: {}",
                dst.display(),
                remove_err
            );
        }
        return Err(Error::file_access(dst, e));
    }

    Ok(true)
}

fn write_copy(
    reader: &mut File,
    mut writer: File,
    dst: &Path,
    metadata: &fs::Metadata,
) -> io::Result<()> {
    io::copy(reader, &mut writer)?;
    writer.sync_all()?;
    drop(writer);

    filetime::set_file_times(
        dst,
        FileTime::from_last_access_time(metadata),
        FileTime::from_last_modification_time(metadata),
    )?;
    fs::set_permissions(dst, metadata.permissions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record_for(path: &Path, content: &str) -> FileRecord {
        fs::write(path, content).unwrap();
        FileRecord::from_path(path).unwrap()
    }

    #[test]
    fn test_candidate_names() {
        assert_eq!(candidate_name(OsStr::new("photo.jpg"), None), "photo.jpg");
        assert_eq!(candidate_name(OsStr::new("photo.jpg"), Some(0)), "photo_0.jpg");
        assert_eq!(candidate_name(OsStr::new("photo.jpg"), Some(12)), "photo_12.jpg");
        assert_eq!(candidate_name(OsStr::new("README"), Some(0)), "README_0");
        assert_eq!(
            candidate_name(OsStr::new("archive.tar.gz"), Some(1)),
            "archive.tar_1.gz"
        );
        assert_eq!(candidate_name(OsStr::new("collis.ion"), Some(0)), "collis_0.ion");
    }

    #[test]
    fn test_place_creates_missing_directories() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("photo.jpg");
        let record = record_for(&src, "jpeg");
        let dir = tmp.path().join("out/2023/June/15");

        let mut index = ContentIndex::new();
        let placement = place(&record, &dir, &mut index).unwrap();

        assert_eq!(
            placement,
            Placement::Copied {
                destination: dir.join("photo.jpg"),
                renamed: false
            }
        );
        assert_eq!(fs::read_to_string(dir.join("photo.jpg")).unwrap(), "jpeg");
        assert_eq!(index.len(), 1);
        assert!(index.lookup(&src).unwrap());
    }

    #[test]
    fn test_place_renames_on_collision() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("out");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("photo.jpg"), "first").unwrap();
        fs::write(dir.join("photo_0.jpg"), "second").unwrap();

        let src = tmp.path().join("photo.jpg");
        let record = record_for(&src, "third");

        let mut index = ContentIndex::new();
        let placement = place(&record, &dir, &mut index).unwrap();

        assert_eq!(
            placement,
            Placement::Copied {
                destination: dir.join("photo_1.jpg"),
                renamed: true
            }
        );
        assert_eq!(fs::read_to_string(dir.join("photo.jpg")).unwrap(), "first");
        assert_eq!(fs::read_to_string(dir.join("photo_0.jpg")).unwrap(), "second");
        assert_eq!(fs::read_to_string(dir.join("photo_1.jpg")).unwrap(), "third");
    }

    #[test]
    fn test_place_detects_identical_file_at_name() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("out");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("photo.jpg"), "other").unwrap();
        fs::write(dir.join("photo_0.jpg"), "same").unwrap();

        let src = tmp.path().join("photo.jpg");
        let record = record_for(&src, "same");

        let mut index = ContentIndex::new();
        let placement = place(&record, &dir, &mut index).unwrap();

        assert_eq!(placement, Placement::AlreadyPresent(dir.join("photo_0.jpg")));
        assert!(!dir.join("photo_1.jpg").exists());
        assert_eq!(index.len(), 1);

        // Already indexed: a second placement must not register it again.
        place(&record, &dir, &mut index).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_place_preserves_modification_time() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("old.txt");
        let record = record_for(&src, "old content");
        let mtime = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&src, mtime).unwrap();

        let dir = tmp.path().join("out");
        let mut index = ContentIndex::new();
        place(&record, &dir, &mut index).unwrap();

        let copied = fs::metadata(dir.join("old.txt")).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&copied), mtime);
    }

    #[test]
    fn test_place_directory_in_the_way_is_a_collision() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("out");
        fs::create_dir_all(dir.join("photo.jpg")).unwrap();

        let src = tmp.path().join("photo.jpg");
        let record = record_for(&src, "jpeg");

        let mut index = ContentIndex::new();
        let placement = place(&record, &dir, &mut index).unwrap();
        assert_eq!(
            placement,
            Placement::Copied {
                destination: dir.join("photo_0.jpg"),
                renamed: true
            }
        );
    }

    #[test]
    fn test_place_failed_copy_removes_partial_file() {
        let tmp = tempdir().unwrap();
        // Opening a directory succeeds, reading from it does not.
        let src = tmp.path().join("album");
        fs::create_dir_all(&src).unwrap();
        let record = FileRecord {
            path: src,
            fingerprint: 0,
            len: 0,
        };

        let dir = tmp.path().join("out");
        let mut index = ContentIndex::new();
        let err = place(&record, &dir, &mut index).unwrap_err();

        match err {
            Error::FileAccess { path, .. } => assert_eq!(path, dir.join("album")),
            other => panic!("expected a file access error, got {:?}", other),
        }
        assert!(dir.is_dir());
        assert!(!dir.join("album").exists());
        assert!(index.is_empty());
    }

    #[test]
    fn test_place_missing_source_leaves_nothing_behind() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("vanished.txt");
        let record = record_for(&src, "soon gone");
        fs::remove_file(&src).unwrap();

        let dir = tmp.path().join("out");
        let mut index = ContentIndex::new();
        let err = place(&record, &dir, &mut index).unwrap_err();

        assert!(matches!(err, Error::FileAccess { .. }));
        assert!(!dir.join("vanished.txt").exists());
        assert!(index.is_empty());
    }
}
