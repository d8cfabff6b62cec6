use clap::{Args, Parser, Subcommand};
use datesort_core::ConfigOverrides;

#[derive(Debug, Parser)]
#[command(name = "datesort")]
#[command(
    about = "Sort files into year/month/day folders without duplicating content",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub paths: PathArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Args)]
pub struct PathArgs {
    /// Source folder(s) to sort
    #[arg(short, long = "input", value_name = "DIR", global = true)]
    pub inputs: Vec<String>,

    /// Destination folder
    #[arg(short, long, value_name = "DIR", global = true)]
    pub output: Option<String>,

    /// Locale used for month names (e.g. en_US, de-DE)
    #[arg(short, long, global = true)]
    pub locale: Option<String>,

    /// Glob pattern for file or folder names to leave out
    #[arg(short, long, value_name = "GLOB", global = true)]
    pub exclude: Vec<String>,

    /// Folder layout below the destination, `/` separated strftime fields
    #[arg(long, value_name = "FORMAT", global = true)]
    pub layout: Option<String>,
}

impl PathArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            sources: self.inputs.clone(),
            destination: self.output.clone(),
            locale: self.locale.clone(),
            layout: self.layout.clone(),
            exclude_patterns: self.exclude.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Copy every file whose content is not yet in the destination
    Sort,
    /// List source files whose content is missing from the destination
    Verify,
    /// Print configuration values
    PrintConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort_with_repeated_inputs() {
        let cli = Cli::try_parse_from([
            "datesort", "sort", "-i", "/a", "--input", "/b", "-o", "/out", "-l", "de-DE", "-e",
            "*.tmp",
        ])
        .unwrap();

        assert!(matches!(cli.command, Some(Commands::Sort)));
        let overrides = cli.paths.overrides();
        assert_eq!(overrides.sources, vec!["/a".to_string(), "/b".to_string()]);
        assert_eq!(overrides.destination.as_deref(), Some("/out"));
        assert_eq!(overrides.locale.as_deref(), Some("de-DE"));
        assert_eq!(overrides.exclude_patterns, vec!["*.tmp".to_string()]);
        assert_eq!(overrides.layout, None);
    }

    #[test]
    fn test_parse_without_subcommand() {
        let cli = Cli::try_parse_from(["datesort"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.paths.inputs.is_empty());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
