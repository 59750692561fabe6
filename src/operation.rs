//! File operations applied to matched files.
//!
//! The operation is chosen once per run and applied to every rule. Each
//! batch is processed in order and stops at the first failing file.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

/// The operation performed on every matched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Move,
    Copy,
    Delete,
}

impl OperationKind {
    /// All supported operations, in the order shown to users.
    pub const ALL: [OperationKind; 3] = [
        OperationKind::Move,
        OperationKind::Copy,
        OperationKind::Delete,
    ];

    /// Keyword used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Move => "move",
            OperationKind::Copy => "copy",
            OperationKind::Delete => "delete",
        }
    }

    /// Whether the operation writes into a destination directory.
    pub fn needs_destination(&self) -> bool {
        !matches!(self, OperationKind::Delete)
    }

    /// Apply the operation to `files` inside `source`.
    ///
    /// `destination` is ignored for [`OperationKind::Delete`]. A move whose
    /// name already exists in the destination is skipped. A copy is skipped
    /// only while the existing copy is current; a stale copy of a regular
    /// file is replaced. On error, files before the failing one have been
    /// handled and the rest are left untouched.
    pub fn apply(
        &self,
        source: &Path,
        destination: Option<&Path>,
        files: &[OsString],
    ) -> Result<BatchSummary, OperationError> {
        let target = match (self.needs_destination(), destination) {
            (true, Some(dir)) => Some(dir),
            (true, None) => return Err(OperationError::MissingDestination { kind: *self }),
            (false, _) => None,
        };

        let mut summary = BatchSummary::default();
        for name in files {
            let from = source.join(name);
            let done = match target {
                Some(dir) => self.transfer(&from, &dir.join(name), name)?,
                None => {
                    remove_file(&from, name)?;
                    true
                }
            };
            if done {
                summary.processed += 1;
            } else {
                summary.skipped += 1;
            }
        }

        Ok(summary)
    }

    /// Move or copy one file. Returns false when skipped.
    fn transfer(&self, from: &Path, to: &Path, name: &OsStr) -> Result<bool, OperationError> {
        if let Ok(existing) = to.symlink_metadata() {
            let stale = *self == OperationKind::Copy
                && existing.is_file()
                && !copy_is_current(from, &existing);
            if !stale {
                crate::debug_event!(self.as_str(), "skipped", "{} exists", to.display());
                return Ok(false);
            }
            crate::debug_event!(self.as_str(), "refresh", "{} is stale", to.display());
        }

        let result = if *self == OperationKind::Copy {
            fs::copy(from, to).map(|_| ())
        } else {
            move_file(from, to)
        };

        result.map_err(|source| OperationError::Io {
            kind: *self,
            file: name.to_os_string(),
            source,
        })?;

        crate::debug_event!(self.as_str(), "done", "{} -> {}", from.display(), to.display());
        Ok(true)
    }
}

/// Outcome of a batch that ran to completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files moved, copied or deleted.
    pub processed: usize,
    /// Files left alone because the destination name was taken.
    pub skipped: usize,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = InvalidOperationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| InvalidOperationKind {
                value: s.to_string(),
            })
    }
}

/// Whether `existing` still mirrors `from`: same length and not older.
///
/// A source that grew or changed after it was copied fails this check, so
/// the next rescan copies it again.
fn copy_is_current(from: &Path, existing: &fs::Metadata) -> bool {
    let Ok(source) = fs::metadata(from) else {
        return false;
    };
    if source.len() != existing.len() {
        return false;
    }
    match (source.modified(), existing.modified()) {
        (Ok(source_time), Ok(copy_time)) => copy_time >= source_time,
        _ => true,
    }
}

/// Rename, falling back to copy + remove when crossing filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(from, to),
        other => other,
    }
}

/// Cross-device move.
///
/// If the remove fails the file exists in both places and the error is
/// returned, so the batch stops at this file.
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)?;
    fs::remove_file(from)
}

fn remove_file(path: &Path, name: &OsStr) -> Result<(), OperationError> {
    fs::remove_file(path).map_err(|source| OperationError::Io {
        kind: OperationKind::Delete,
        file: name.to_os_string(),
        source,
    })?;
    crate::debug_event!("delete", "done", "{}", path.display());
    Ok(())
}

/// An operation keyword outside `move`, `copy`, `delete`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported operation '{value}': expected one of move, copy, delete")]
pub struct InvalidOperationKind {
    pub value: String,
}

/// Failure while applying an operation to a batch.
#[derive(Error, Debug)]
pub enum OperationError {
    #[error("{kind} failed for {}: {source}", .file.to_string_lossy())]
    Io {
        kind: OperationKind,
        file: OsString,
        #[source]
        source: io::Error,
    },

    #[error("{kind} requires a destination directory")]
    MissingDestination { kind: OperationKind },
}

impl OperationError {
    /// Name of the file the batch stopped at, if any.
    pub fn file(&self) -> Option<&OsStr> {
        match self {
            OperationError::Io { file, .. } => Some(file),
            OperationError::MissingDestination { .. } => None,
        }
    }
}
