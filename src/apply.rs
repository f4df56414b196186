//! Atomic replacement of a file's contents.
//!
//! A write goes through two phases. [`PreparedWrite::prepare`] stats the
//! target, takes the optional backup, and writes the new content to a temp
//! file in the same directory with the original permissions, flushed to disk
//! and closed. [`PreparedWrite::commit`] renames the temp file over the target and then
//! flushes the directory. The original is never touched before the rename,
//! and a prepared write that is dropped removes its temp file.

use crate::backup::{self, DEFAULT_BACKUP_SUFFIX};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOptions {
    pub backup: bool,
    /// Appended to the file name of the backup; empty means `.bak`
    pub backup_suffix: String,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            backup: false,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}

impl ApplyOptions {
    pub fn with_backup() -> Self {
        Self {
            backup: true,
            ..Self::default()
        }
    }

    fn suffix(&self) -> &str {
        if self.backup_suffix.is_empty() {
            DEFAULT_BACKUP_SUFFIX
        } else {
            &self.backup_suffix
        }
    }
}

/// Failure of one apply stage. The original file is unchanged for every
/// variant: only a successful rename replaces it.
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("apply: stat: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("apply: backup: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("apply: temp: {source}")]
    TempCreate {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("apply: write temp: {0}")]
    Write(#[source] io::Error),

    #[error("apply: chmod temp: {0}")]
    Chmod(#[source] io::Error),

    #[error("apply: fsync temp: {0}")]
    Fsync(#[source] io::Error),

    #[error("apply: rename: {source}")]
    Rename {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ApplyError {
    pub fn stage(&self) -> &'static str {
        match self {
            ApplyError::Stat { .. } => "stat",
            ApplyError::Backup { .. } => "backup",
            ApplyError::TempCreate { .. } => "temp",
            ApplyError::Write(_) => "write",
            ApplyError::Chmod(_) => "chmod",
            ApplyError::Fsync(_) => "fsync",
            ApplyError::Rename { .. } => "rename",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub path: PathBuf,
    pub backup: Option<PathBuf>,
    pub bytes_written: usize,
}

/// New content staged next to its target, durable but not yet visible.
#[must_use = "a prepared write does nothing until commit() is called"]
#[derive(Debug)]
pub struct PreparedWrite {
    target: PathBuf,
    temp: TempPath,
    backup: Option<PathBuf>,
    bytes_written: usize,
}

impl PreparedWrite {
    pub fn prepare(path: &Path, data: &[u8], options: &ApplyOptions) -> Result<Self, ApplyError> {
        let metadata = fs::metadata(path).map_err(|source| ApplyError::Stat {
            path: path.to_path_buf(),
            source,
        })?;
        let permissions = metadata.permissions();
        let dir = parent_dir(path);

        let backup = if options.backup {
            let backup_path = backup::create_backup(path, options.suffix(), &permissions)
                .map_err(|source| ApplyError::Backup {
                    path: path.to_path_buf(),
                    source,
                })?;
            Some(backup_path)
        } else {
            None
        };

        let prefix = match path.file_name() {
            Some(name) => format!("{}.tmp-", name.to_string_lossy()),
            None => ".tmp-".to_string(),
        };
        let mut temp = tempfile::Builder::new()
            .prefix(&prefix)
            .tempfile_in(dir)
            .map_err(|source| ApplyError::TempCreate {
                dir: dir.to_path_buf(),
                source,
            })?;

        temp.write_all(data).map_err(ApplyError::Write)?;
        temp.as_file()
            .set_permissions(permissions)
            .map_err(ApplyError::Chmod)?;
        temp.as_file().sync_all().map_err(ApplyError::Fsync)?;
        // Close the handle; the path still removes itself on drop
        let temp = temp.into_temp_path();

        debug!(
            file = %path.display(),
            temp = %temp.display(),
            bytes = data.len(),
            "staged replacement"
        );

        Ok(Self {
            target: path.to_path_buf(),
            temp,
            backup,
            bytes_written: data.len(),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    pub fn backup_path(&self) -> Option<&Path> {
        self.backup.as_deref()
    }

    /// Rename the staged file over the target, then flush the directory
    /// entry on a best-effort basis.
    pub fn commit(self) -> Result<ApplyOutcome, ApplyError> {
        let Self {
            target,
            temp,
            backup,
            bytes_written,
        } = self;

        // On failure the returned temp path is dropped, which removes the file
        temp.persist(&target).map_err(|err| ApplyError::Rename {
            path: target.clone(),
            source: err.error,
        })?;

        if let Err(err) = sync_dir(parent_dir(&target)) {
            debug!(dir = %parent_dir(&target).display(), error = %err, "directory fsync skipped");
        }

        info!(path = %target.display(), bytes = bytes_written, "file replaced");
        Ok(ApplyOutcome {
            path: target,
            backup,
            bytes_written,
        })
    }
}

/// Atomically replace the contents of an existing file, preserving its
/// permissions and optionally keeping a backup of the previous contents.
pub fn write_atomic(
    path: &Path,
    data: &[u8],
    options: &ApplyOptions,
) -> Result<ApplyOutcome, ApplyError> {
    PreparedWrite::prepare(path, data, options)?.commit()
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let handle = fs::OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_DIRECTORY)
        .open(dir)?;
    handle.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    // No reliable directory fsync outside unix
    Ok(())
}
