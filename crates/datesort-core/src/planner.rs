use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Locale, TimeZone};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::Error;

pub const DEFAULT_LOCALE: &str = "en_US";

/// `<year>/<full month name>/<day of month, not padded>`
pub const DEFAULT_LAYOUT: &str = "%Y/%B/%-d";

/// Maps a modification time to the destination directory it belongs in.
///
/// Month names come from the configured locale, never from the host, so the
/// same timestamp gives the same directory on every machine.
#[derive(Debug, Clone)]
pub struct DatePlanner {
    locale: Locale,
    layout: String,
}

impl DatePlanner {
    pub fn new(locale: &str) -> Result<Self, Error> {
        Self::with_layout(locale, DEFAULT_LAYOUT)
    }

    pub fn with_layout(locale: &str, layout: &str) -> Result<Self, Error> {
        let locale = parse_locale(locale)?;

        if layout.split('/').all(|segment| segment.trim().is_empty()) {
            return Err(Error::Configuration(format!(
                "directory layout '{}' has no segments",
                layout
            )));
        }
        if StrftimeItems::new(layout).any(|item| matches!(item, Item::Error)) {
            return Err(Error::Configuration(format!(
                "invalid directory layout '{}'",
                layout
            )));
        }

        Ok(Self {
            locale,
            layout: layout.to_string(),
        })
    }

    /// Destination directory for a file last modified at `mtime`, in the
    /// host's local time zone.
    pub fn plan(&self, output_root: &Path, mtime: SystemTime) -> PathBuf {
        let date: DateTime<Local> = mtime.into();
        self.plan_datetime(output_root, &date)
    }

    pub fn plan_datetime<Tz>(&self, output_root: &Path, date: &DateTime<Tz>) -> PathBuf
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        output_root.join(self.relative_dir(date))
    }

    /// The layout rendered for `date`, one path component per `/` segment.
    /// Empty segments are dropped.
    pub fn relative_dir<Tz>(&self, date: &DateTime<Tz>) -> PathBuf
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let rendered = date.format_localized(&self.layout, self.locale).to_string();
        rendered
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect()
    }
}

/// Accepts `en_US`, `en-US` and `en_US.UTF-8` spellings.
fn parse_locale(name: &str) -> Result<Locale, Error> {
    let normalized = name
        .split('.')
        .next()
        .unwrap_or_default()
        .trim()
        .replace('-', "_");

    Locale::try_from(normalized.as_str()).map_err(|_| Error::Locale(name.to_string()))
}
