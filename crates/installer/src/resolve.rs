//! File-or-inline input resolution.
//!
//! Some options (main page content, database password) can be given inline or
//! as a path to a file. A readable file always wins; an unreadable one is a
//! configuration error and never falls back to the inline value.

use std::io;
use std::path::{Path, PathBuf};

use crate::config::ConfigError;

/// Raw file access used by [`resolve_with`].
pub trait FileReader {
    /// Read a whole file as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be read.
    fn read_file(&self, path: &Path) -> io::Result<String>;
}

/// [`FileReader`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl FileReader for FsReader {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Inline,
    Absent,
}

/// Outcome of resolving one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    value: Option<String>,
    source: InputSource,
    overrode_inline: bool,
}

impl ResolvedInput {
    fn absent() -> Self {
        Self {
            value: None,
            source: InputSource::Absent,
            overrode_inline: false,
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    #[must_use]
    pub fn into_value(self) -> Option<String> {
        self.value
    }

    #[must_use]
    pub fn source(&self) -> &InputSource {
        &self.source
    }

    /// True when an inline value was supplied but the file value replaced it.
    #[must_use]
    pub fn overrode_inline(&self) -> bool {
        self.overrode_inline
    }
}

/// Resolve an input against the local filesystem.
///
/// # Errors
///
/// Returns [`ConfigError::Unreadable`] if `file_path` is set and cannot be read,
/// or [`ConfigError::NotText`] if it is not UTF-8.
pub fn resolve(file_path: Option<&Path>, inline: Option<&str>) -> Result<ResolvedInput, ConfigError> {
    resolve_with(&FsReader, file_path, inline)
}

/// Resolve an input using the given reader.
///
/// # Errors
///
/// Returns [`ConfigError::Unreadable`] if `file_path` is set and cannot be read,
/// or [`ConfigError::NotText`] if it is not UTF-8.
pub fn resolve_with(
    reader: &dyn FileReader,
    file_path: Option<&Path>,
    inline: Option<&str>,
) -> Result<ResolvedInput, ConfigError> {
    let Some(path) = file_path else {
        return Ok(match inline {
            Some(value) => ResolvedInput {
                value: Some(value.to_string()),
                source: InputSource::Inline,
                overrode_inline: false,
            },
            None => ResolvedInput::absent(),
        });
    };

    let raw = reader
        .read_file(path)
        .map_err(|source| match source.kind() {
            io::ErrorKind::InvalidData => ConfigError::NotText {
                path: path.to_path_buf(),
                source,
            },
            _ => ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            },
        })?;

    Ok(ResolvedInput {
        value: Some(strip_line_endings(&raw).to_string()),
        source: InputSource::File(path.to_path_buf()),
        overrode_inline: inline.is_some(),
    })
}

/// Strip trailing carriage returns and newlines.
fn strip_line_endings(raw: &str) -> &str {
    raw.trim_end_matches(|c: char| c == '\r' || c == '\n')
}
