mod commands;
mod logging;
mod progress;

use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use datesort_core::{AppConfig, SortEngine};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info, warn};

/// Exit status when the run finished but some files could not be processed.
const EXIT_FILE_FAILURES: i32 = 2;

fn main() {
    dotenv().ok();

    let args = Cli::parse();

    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return;
    };

    let _guard = logging::init_logger();

    let config = match datesort_core::config::load_configuration(&args.paths.overrides()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let status = match command {
        Commands::Sort => run_sort(config),
        Commands::Verify => run_verify(config),
        Commands::PrintConfig => {
            println!("Configuration: {:#?}", config);
            Ok(0)
        }
    };

    match status {
        Ok(0) => {}
        Ok(code) => process::exit(code),
        Err(err) => {
            error!("Error: {:#}", err);
            process::exit(1);
        }
    }
}

fn run_sort(config: AppConfig) -> anyhow::Result<i32> {
    let engine = SortEngine::new(config).context("invalid configuration")?;
    let reporter = CliReporter::new();
    let result = engine.run(&reporter)?;
    let summary = &result.summary;

    println!();
    info!(
        "Index: {}, Sort: {}",
        format!("{:.2}s", result.index_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.sort_duration.as_secs_f64()).green(),
    );
    info!(
        "{} files already in destination, {} processed",
        format!("{}", result.indexed_files).cyan(),
        format!("{}", summary.processed).cyan(),
    );
    info!(
        "{} copied, {} renamed, {} duplicates skipped, {} already present",
        format!("{}", summary.copied).green(),
        format!("{}", summary.renamed).yellow(),
        format!("{}", summary.duplicates).cyan(),
        format!("{}", summary.already_present).cyan(),
    );

    if result.is_complete() {
        return Ok(0);
    }

    if result.index_errors > 0 {
        warn!(
            "{} destination entr(ies) could not be indexed, their content may be copied twice",
            format!("{}", result.index_errors).red(),
        );
    }
    if !result.failures.is_empty() {
        warn!("{} file(s) failed:", format!("{}", summary.failed).red());
        for failure in &result.failures {
            warn!("  {}", failure.error);
        }
    }
    Ok(EXIT_FILE_FAILURES)
}

fn run_verify(config: AppConfig) -> anyhow::Result<i32> {
    let engine = SortEngine::new(config).context("invalid configuration")?;
    let reporter = CliReporter::new();
    let result = engine.verify(&reporter)?;

    println!();
    if result.missing.is_empty() && result.failures.is_empty() && result.index_errors == 0 {
        info!(
            "All {} source file(s) exist in the destination",
            format!("{}", result.checked).green()
        );
        return Ok(0);
    }

    if !result.missing.is_empty() {
        warn!(
            "Missing {} of {} file(s) in the destination:",
            format!("{}", result.missing.len()).red(),
            result.checked
        );
        for path in &result.missing {
            println!("  {} {}", "×".red(), path.display());
        }
    }
    if result.index_errors > 0 {
        warn!(
            "{} destination entr(ies) could not be indexed",
            format!("{}", result.index_errors).red(),
        );
    }
    for failure in &result.failures {
        warn!("  {}", failure.error);
    }

    Ok(EXIT_FILE_FAILURES)
}
