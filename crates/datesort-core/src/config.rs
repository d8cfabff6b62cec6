use config::{Config, ConfigError, Environment, File as ConfigFile, Source};
use serde::Deserialize;
use std::path::Path;

use crate::planner::{DEFAULT_LAYOUT, DEFAULT_LOCALE};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub destination: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_layout")]
    pub layout: String,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

fn default_layout() -> String {
    DEFAULT_LAYOUT.to_string()
}

/// Values given on the command line. They take precedence over the config
/// file and the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub sources: Vec<String>,
    pub destination: Option<String>,
    pub locale: Option<String>,
    pub layout: Option<String>,
    pub exclude_patterns: Vec<String>,
}

/// Load `Config.{toml,yaml,json,...}` from the working directory if present,
/// then `DATESORT_*` environment variables, then the command line overrides.
pub fn load_configuration(overrides: &ConfigOverrides) -> Result<AppConfig, ConfigError> {
    build_configuration(ConfigFile::with_name("Config").required(false), overrides)
}

pub fn load_configuration_from(
    path: &Path,
    overrides: &ConfigOverrides,
) -> Result<AppConfig, ConfigError> {
    build_configuration(ConfigFile::from(path).required(false), overrides)
}

fn build_configuration<S>(file: S, overrides: &ConfigOverrides) -> Result<AppConfig, ConfigError>
where
    S: Source + Send + Sync + 'static,
{
    let mut builder = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("DATESORT")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("sources")
                .with_list_parse_key("exclude_patterns"),
        )
        .set_override_option("destination", overrides.destination.clone())?
        .set_override_option("locale", overrides.locale.clone())?
        .set_override_option("layout", overrides.layout.clone())?;

    if !overrides.sources.is_empty() {
        builder = builder.set_override("sources", overrides.sources.clone())?;
    }
    if !overrides.exclude_patterns.is_empty() {
        builder = builder.set_override("exclude_patterns", overrides.exclude_patterns.clone())?;
    }

    builder.build()?.try_deserialize::<AppConfig>()
}

impl AppConfig {
    /// Checks that the configuration names at least one source and a
    /// destination. Whether those are existing directories is checked when a
    /// run starts.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.sources.is_empty() {
            return Err(crate::Error::Configuration(
                "at least one input directory is required".to_string(),
            ));
        }
        if self.destination.trim().is_empty() {
            return Err(crate::Error::Configuration(
                "an output directory is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for dir in dirs {
        let dir_path = Path::new(&dir);

        if result
            .iter()
            .any(|res_dir| dir_path.starts_with(Path::new(res_dir)))
        {
            continue;
        }

        result.retain(|res_dir| !Path::new(res_dir).starts_with(dir_path));
        result.push(dir);
    }

    result
}
