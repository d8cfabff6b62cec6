use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::config::{self, AppConfig};
use crate::error::Error;
use crate::index::{ContentIndex, FileRecord};
use crate::planner::DatePlanner;
use crate::progress::ProgressReporter;
use crate::resolver::{self, Placement};
use crate::scanner::{self, Walker};

/// Sorts the configured sources into the destination tree, one file at a
/// time, against a content index of the whole destination.
pub struct SortEngine {
    config: AppConfig,
    planner: DatePlanner,
    excludes: Vec<Pattern>,
}

/// What happened to a single source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Copied(PathBuf),
    /// Copied under a `_<n>` name because the planned name held other content.
    Renamed(PathBuf),
    /// Same content already indexed at this path.
    Duplicate(PathBuf),
    /// A byte-identical file already existed under the planned name.
    AlreadyPresent(PathBuf),
}

impl FileOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FileOutcome::Copied(_) => "copied",
            FileOutcome::Renamed(_) => "renamed",
            FileOutcome::Duplicate(_) => "duplicate",
            FileOutcome::AlreadyPresent(_) => "already present",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SortSummary {
    pub processed: usize,
    pub copied: usize,
    pub renamed: usize,
    pub duplicates: usize,
    pub already_present: usize,
    pub failed: usize,
}

impl SortSummary {
    fn record(&mut self, outcome: &FileOutcome) {
        self.processed += 1;
        match outcome {
            FileOutcome::Copied(_) => self.copied += 1,
            FileOutcome::Renamed(_) => self.renamed += 1,
            FileOutcome::Duplicate(_) => self.duplicates += 1,
            FileOutcome::AlreadyPresent(_) => self.already_present += 1,
        }
    }

    fn record_failure(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }
}

#[derive(Debug)]
pub struct FileFailure {
    pub path: Option<PathBuf>,
    pub error: Error,
}

#[derive(Debug)]
pub struct SortResult {
    pub index_duration: Duration,
    pub sort_duration: Duration,
    pub indexed_files: usize,
    /// Destination entries that could not be indexed. Content they hold may
    /// have been copied again.
    pub index_errors: usize,
    pub summary: SortSummary,
    pub failures: Vec<FileFailure>,
}

#[derive(Debug)]
pub struct VerifyResult {
    pub checked: usize,
    /// Destination entries that could not be indexed.
    pub index_errors: usize,
    /// Source files whose content exists nowhere in the destination.
    pub missing: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

impl SortResult {
    /// Every source file was handled and the whole destination was indexed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.index_errors == 0
    }
}

impl SortEngine {
    /// Fails on an incomplete configuration, an unsupported locale or an
    /// invalid layout. Invalid exclude globs are logged and ignored.
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        config.validate()?;
        let planner = DatePlanner::with_layout(&config.locale, &config.layout)?;
        let excludes = scanner::compile_patterns(&config.exclude_patterns);

        Ok(Self {
            config,
            planner,
            excludes,
        })
    }

    /// Run the full sort:
    /// 1. Validate destination and sources
    /// 2. Index every file already in the destination
    /// 3. Walk each source and copy whatever content is not indexed yet
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<SortResult, Error> {
        let (destination, walkers) = self.prepare()?;

        info!("Indexing destination {}...", destination.display());
        let index_start = Instant::now();
        let mut index = ContentIndex::build(&destination, reporter)?;
        let index_duration = index_start.elapsed();
        let indexed_files = index.len();
        let index_errors = index.build_errors();

        let sort_start = Instant::now();
        let mut summary = SortSummary::default();
        let mut failures = Vec::new();

        for walker in &walkers {
            let label = format!("{} -> {}", walker.root().display(), destination.display());
            let total = walker.count_files();
            info!("Sorting {} file(s) from {}", total, walker.root().display());
            reporter.on_sort_start(walker.root(), total);

            for (i, entry) in walker.walk().enumerate() {
                let result = match entry {
                    Ok(path) => self
                        .process_file(&path, &destination, &mut index)
                        .map_err(|error| failure(Some(path), error)),
                    Err(error) => Err(failure(None, error)),
                };
                match result {
                    Ok(outcome) => {
                        debug!("{}: {:?}", outcome.label(), outcome);
                        summary.record(&outcome);
                    }
                    Err(file_failure) => {
                        summary.record_failure();
                        failures.push(file_failure);
                    }
                }
                reporter.on_file_processed(i + 1, total.max(i + 1), &label);
            }
        }

        let sort_duration = sort_start.elapsed();
        info!(
            "{} copied, {} renamed, {} duplicates, {} already present, {} failed",
            summary.copied,
            summary.renamed,
            summary.duplicates,
            summary.already_present,
            summary.failed,
        );
        reporter.on_sort_complete(&summary, sort_duration.as_secs_f64());

        Ok(SortResult {
            index_duration,
            sort_duration,
            indexed_files,
            index_errors,
            summary,
            failures,
        })
    }

    /// Decide and carry out what happens to one source file.
    pub fn process_file(
        &self,
        path: &Path,
        destination: &Path,
        index: &mut ContentIndex,
    ) -> Result<FileOutcome, Error> {
        let record = FileRecord::from_path(path)?;

        if let Some(existing) = index.find(&record)? {
            debug!(
                "Skipping {}: same content as {}",
                path.display(),
                existing.path.display()
            );
            return Ok(FileOutcome::Duplicate(existing.path.clone()));
        }

        let mtime = fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| Error::file_access(path, e))?;
        let target_dir = self.planner.plan(destination, mtime);

        let outcome = match resolver::place(&record, &target_dir, index)? {
            Placement::Copied {
                destination,
                renamed: false,
            } => FileOutcome::Copied(destination),
            Placement::Copied {
                destination,
                renamed: true,
            } => FileOutcome::Renamed(destination),
            Placement::AlreadyPresent(existing) => FileOutcome::AlreadyPresent(existing),
        };
        Ok(outcome)
    }

    /// Report every source file whose content is not anywhere in the
    /// destination. Nothing is written.
    pub fn verify(&self, reporter: &dyn ProgressReporter) -> Result<VerifyResult, Error> {
        let (destination, walkers) = self.prepare()?;
        let index = ContentIndex::build(&destination, reporter)?;

        let mut checked = 0;
        let mut missing = Vec::new();
        let mut failures = Vec::new();

        for walker in &walkers {
            let label = format!("verify {}", walker.root().display());
            let total = walker.count_files();
            reporter.on_sort_start(walker.root(), total);

            for (i, entry) in walker.walk().enumerate() {
                checked += 1;
                match entry {
                    Ok(path) => match index.lookup(&path) {
                        Ok(true) => {}
                        Ok(false) => {
                            debug!("Missing from destination: {}", path.display());
                            missing.push(path);
                        }
                        Err(error) => failures.push(failure(Some(path), error)),
                    },
                    Err(error) => failures.push(failure(None, error)),
                }
                reporter.on_file_processed(i + 1, total.max(i + 1), &label);
            }
        }

        info!(
            "Verified {} file(s): {} missing, {} unreadable",
            checked,
            missing.len(),
            failures.len()
        );

        Ok(VerifyResult {
            checked,
            index_errors: index.build_errors(),
            missing,
            failures,
        })
    }

    /// Every root must be an existing directory before anything is read or
    /// written.
    fn prepare(&self) -> Result<(PathBuf, Vec<Walker>), Error> {
        let destination = PathBuf::from(&self.config.destination);
        if !destination.is_dir() {
            return Err(Error::InvalidRoot(destination));
        }

        let sources = config::non_overlapping_directories(self.config.sources.clone());
        debug!("Processing sources: {:?}", sources);

        let walkers = sources
            .iter()
            .map(|source| Walker::new(source).map(|w| w.with_excludes(&self.excludes)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((destination, walkers))
    }
}

fn failure(path: Option<PathBuf>, error: Error) -> FileFailure {
    error!("Error: {}", error);
    FileFailure { path, error }
}
