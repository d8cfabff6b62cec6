use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use walkdir::{DirEntry, WalkDir};

use crate::error::Error;

/// Recursive enumeration of the regular files under a root directory.
///
/// Hidden entries (base name starting with `.`) and entries matching an
/// exclude pattern are skipped, directories included, so nothing below them
/// is visited. Symlinks are never followed and never yielded.
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
    excludes: Vec<Pattern>,
}

impl Walker {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::InvalidRoot(root));
        }

        Ok(Self {
            root,
            excludes: Vec::new(),
        })
    }

    pub fn with_excludes(mut self, patterns: &[Pattern]) -> Self {
        self.excludes = patterns.to_vec();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily walk the tree in file-name order. Every call scans the
    /// filesystem again.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, Error>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| entry.depth() == 0 || self.is_included(entry))
            .filter_map(|entry_result| match entry_result {
                Ok(entry) if entry.file_type().is_file() => Some(Ok(entry.into_path())),
                Ok(_) => None,
                Err(err) => Some(Err(Error::Walk(err))),
            })
    }

    /// Number of files a full walk currently yields. Unreadable entries are
    /// not counted.
    pub fn count_files(&self) -> usize {
        self.walk().filter(Result::is_ok).count()
    }

    fn is_included(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return false;
        }

        let excluded = self
            .excludes
            .iter()
            .any(|pattern| pattern.matches(&name) || pattern.matches_path(entry.path()));
        if excluded {
            debug!("Excluding {}", entry.path().display());
        }
        !excluded
    }
}

/// Compile glob patterns, dropping (and logging) the invalid ones.
pub fn compile_patterns(globs: &[String]) -> Vec<Pattern> {
    globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}
