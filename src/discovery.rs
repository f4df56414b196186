//! File discovery for safereplace
//!
//! Resolves a [`Selector`] into the set of regular files a run will touch.
//! Three mechanisms feed one deduplicated set: an explicit file list, a glob,
//! and a recursive extension walk. Excludes are applied last and the result is
//! sorted so runs are deterministic.
//!
//! Only the empty selector (and an unresolvable root) is fatal. Malformed globs
//! and unreadable directories are collected in [`Discovered::errors`] so the
//! caller can still process everything that was found.

use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::io;
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Shell-style matching shared by `--glob` and `--exclude`: `*` never crosses a
/// path separator and dotfiles need no explicit leading dot.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Selection criteria for one invocation.
///
/// At least one of `glob`, `ext` or `files` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    /// Glob pattern, relative to the discovery root unless absolute
    pub glob: Option<String>,
    /// File extension, with or without a leading dot, compared case-insensitively
    pub ext: Option<String>,
    /// Explicit files, relative to the discovery root unless absolute
    pub files: Vec<PathBuf>,
    /// Patterns matched against the relative path, the base name, or (when the
    /// pattern itself is absolute) the absolute path
    pub exclude: Vec<String>,
}

impl Selector {
    pub fn with_glob(mut self, pattern: impl Into<String>) -> Self {
        self.glob = Some(pattern.into());
        self
    }

    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = Some(ext.into());
        self
    }

    pub fn with_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn with_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// True when none of the three selection mechanisms is set.
    pub fn is_empty(&self) -> bool {
        self.glob.as_deref().is_none_or(str::is_empty)
            && self.ext.as_deref().is_none_or(str::is_empty)
            && self.files.is_empty()
    }

    /// Strip one leading dot from the extension and drop empty criteria.
    fn normalized(&self) -> Selector {
        let ext = self
            .ext
            .as_deref()
            .map(|ext| ext.strip_prefix('.').unwrap_or(ext))
            .filter(|ext| !ext.is_empty())
            .map(str::to_string);
        let glob = self.glob.clone().filter(|glob| !glob.is_empty());

        Selector {
            glob,
            ext,
            files: self.files.clone(),
            exclude: self.exclude.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("discovery: at least one of --glob, --ext or --files must be provided")]
    EmptySelector,

    #[error("discovery: invalid root: {0}")]
    InvalidRoot(#[source] io::Error),

    #[error("glob: {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("glob: {0}")]
    GlobEntry(#[from] glob::GlobError),

    #[error("walk: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Outcome of a discovery pass.
#[derive(Debug, Default)]
pub struct Discovered {
    /// Absolute discovery root every relative selector was resolved against
    pub root: PathBuf,
    /// Absolute paths of regular files, sorted and unique
    pub paths: Vec<PathBuf>,
    /// Non-fatal errors met while expanding globs or walking the tree
    pub errors: Vec<DiscoveryError>,
}

impl Discovered {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Discover the regular files under `root` selected by `selector`.
///
/// An empty `root` means the current working directory.
pub fn discover(root: &Path, selector: &Selector) -> Result<Discovered, DiscoveryError> {
    let selector = selector.normalized();
    if selector.is_empty() {
        return Err(DiscoveryError::EmptySelector);
    }
    let root = absolute_root(root)?;

    let mut found: HashSet<PathBuf> = HashSet::new();
    let mut errors = Vec::new();

    if !selector.files.is_empty() {
        found.extend(expand_files(&root, &selector.files));
    }
    if let Some(pattern) = &selector.glob {
        found.extend(expand_glob(&root, pattern, &mut errors));
    }
    if let Some(ext) = &selector.ext {
        found.extend(expand_ext(&root, ext, &mut errors));
    }

    let excludes = compile_excludes(&selector.exclude);
    let mut paths: Vec<PathBuf> = found
        .into_iter()
        .filter(|path| !is_excluded(&root, path, &excludes))
        .collect();
    paths.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));

    debug!(
        root = %root.display(),
        files = paths.len(),
        errors = errors.len(),
        "discovery finished"
    );

    Ok(Discovered {
        root,
        paths,
        errors,
    })
}

fn absolute_root(root: &Path) -> Result<PathBuf, DiscoveryError> {
    if root.is_absolute() {
        return Ok(clean_path(root));
    }
    let cwd = env::current_dir().map_err(DiscoveryError::InvalidRoot)?;
    Ok(clean_path(&cwd.join(root)))
}

/// Lexically resolve `.` and `..` so the same file reached through different
/// spellings collapses to one key.
fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        clean_path(path)
    } else {
        clean_path(&root.join(path))
    }
}

/// Regular file, not following symlinks.
fn is_regular_file(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_file())
        .unwrap_or(false)
}

/// Missing entries are dropped silently.
fn expand_files(root: &Path, files: &[PathBuf]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|file| resolve_under(root, file))
        .filter(|path| {
            let keep = is_regular_file(path);
            if !keep {
                debug!(path = %path.display(), "skipping explicit entry that is not a regular file");
            }
            keep
        })
        .collect()
}

fn expand_glob(root: &Path, pattern: &str, errors: &mut Vec<DiscoveryError>) -> Vec<PathBuf> {
    let full_pattern = if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        let mut rooted = Pattern::escape(&root.to_string_lossy());
        if !rooted.ends_with(MAIN_SEPARATOR) {
            rooted.push(MAIN_SEPARATOR);
        }
        rooted.push_str(pattern);
        rooted
    };

    let entries = match glob::glob_with(&full_pattern, MATCH_OPTIONS) {
        Ok(entries) => entries,
        Err(source) => {
            warn!(pattern, error = %source, "malformed glob pattern");
            errors.push(DiscoveryError::Pattern {
                pattern: pattern.to_string(),
                source,
            });
            return Vec::new();
        }
    };

    let mut matched = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if is_regular_file(&path) => matched.push(clean_path(&path)),
            Ok(_) => {}
            Err(err) => errors.push(DiscoveryError::GlobEntry(err)),
        }
    }
    matched
}

fn expand_ext(root: &Path, ext: &str, errors: &mut Vec<DiscoveryError>) -> Vec<PathBuf> {
    let target = ext.to_lowercase();
    let mut matched = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "walk error");
                errors.push(DiscoveryError::Walk(err));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if extension_of(&name).to_lowercase() == target {
            matched.push(clean_path(entry.path()));
        }
    }
    matched
}

/// Text after the last dot of a file name, so `.env` has extension `env`.
fn extension_of(name: &str) -> &str {
    name.rfind('.').map_or("", |idx| &name[idx + 1..])
}

struct Exclude {
    pattern: Pattern,
    absolute: bool,
}

/// A malformed exclude pattern never matches.
fn compile_excludes(patterns: &[String]) -> Vec<Exclude> {
    patterns
        .iter()
        .filter_map(|raw| match Pattern::new(raw) {
            Ok(pattern) => Some(Exclude {
                pattern,
                absolute: Path::new(raw).is_absolute(),
            }),
            Err(err) => {
                warn!(pattern = %raw, error = %err, "malformed exclude pattern ignored");
                None
            }
        })
        .collect()
}

fn is_excluded(root: &Path, path: &Path, excludes: &[Exclude]) -> bool {
    if excludes.is_empty() {
        return false;
    }
    let relative = relative_to(root, path);
    let base = path.file_name().map(Path::new);

    excludes.iter().any(|exclude| {
        exclude.pattern.matches_path_with(&relative, MATCH_OPTIONS)
            || base.is_some_and(|base| exclude.pattern.matches_path_with(base, MATCH_OPTIONS))
            || (exclude.absolute && exclude.pattern.matches_path_with(path, MATCH_OPTIONS))
    })
}

/// `path` relative to `root`, walking up with `..` when it lies outside.
fn relative_to(root: &Path, path: &Path) -> PathBuf {
    let root_parts: Vec<Component> = root.components().collect();
    let path_parts: Vec<Component> = path.components().collect();
    let common = root_parts
        .iter()
        .zip(&path_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..root_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part.as_os_str());
    }
    relative
}
