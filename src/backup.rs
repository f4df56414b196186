//! Sibling backups taken before a file is replaced.
//!
//! A backup of `notes.txt` is written next to it as `notes.txt.bak`. Existing
//! backups are never overwritten: when the name is taken the next free of
//! `notes.txt.bak.1`, `notes.txt.bak.2`, ... is used instead.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions, Permissions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_BACKUP_SUFFIX: &str = ".bak";

/// Numbered candidates probed after the plain suffix is taken.
const MAX_BACKUP_ATTEMPTS: usize = 1000;

/// First free backup path for `path`, or `None` once every candidate is taken.
pub fn unique_backup_path(path: &Path, suffix: &str) -> Option<PathBuf> {
    let mut base: OsString = path.file_name()?.to_os_string();
    base.push(suffix);

    let plain = path.with_file_name(&base);
    if is_free(&plain) {
        return Some(plain);
    }

    (1..MAX_BACKUP_ATTEMPTS)
        .map(|n| {
            let mut numbered = base.clone();
            numbered.push(format!(".{n}"));
            path.with_file_name(numbered)
        })
        .find(|candidate| is_free(candidate))
}

fn is_free(candidate: &Path) -> bool {
    matches!(fs::symlink_metadata(candidate), Err(e) if e.kind() == io::ErrorKind::NotFound)
}

/// Copy `path` to a fresh backup with the given permissions and flush it to
/// stable storage. Returns the backup path.
pub fn create_backup(path: &Path, suffix: &str, permissions: &Permissions) -> io::Result<PathBuf> {
    let backup_path = unique_backup_path(path, suffix).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("too many existing backups for {}", path.display()),
        )
    })?;

    let mut source = File::open(path)?;
    // create_new: a backup that appeared since probing is left alone
    let mut backup = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&backup_path)?;

    let copied = io::copy(&mut source, &mut backup)
        .and_then(|_| backup.set_permissions(permissions.clone()))
        .and_then(|_| backup.sync_all());

    if let Err(err) = copied {
        drop(backup);
        let _ = fs::remove_file(&backup_path);
        return Err(err);
    }

    debug!(
        original = %path.display(),
        backup = %backup_path.display(),
        "backup written"
    );
    Ok(backup_path)
}
