//! Literal substitution over whole-file contents.
//!
//! Files are treated as one opaque byte string, so line endings (including
//! `\r\n`) and bytes that are not valid UTF-8 pass through untouched. Nothing
//! in this module writes to disk.

use bstr::ByteSlice;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result of substituting one file in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub before: Vec<u8>,
    pub after: Vec<u8>,
    /// Non-overlapping occurrences of the pattern in `before`
    pub matches: usize,
    /// Occurrences replaced; every match is replaced
    pub replacements: usize,
    /// `after` differs byte-for-byte from `before`
    pub changed: bool,
}

impl Substitution {
    fn unchanged(content: Vec<u8>) -> Self {
        Self {
            after: content.clone(),
            before: content,
            matches: 0,
            replacements: 0,
            changed: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("read failed: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("skipping binary file: {}", .path.display())]
    Binary { path: PathBuf },
}

/// Replace every literal occurrence of `pattern` in `content`.
///
/// An empty pattern is a no-op rather than an insertion between every byte.
pub fn substitute_literal(
    content: impl Into<Vec<u8>>,
    pattern: &str,
    replacement: &str,
) -> Substitution {
    let content = content.into();
    if pattern.is_empty() {
        return Substitution::unchanged(content);
    }

    let matches = content.find_iter(pattern).count();
    if matches == 0 {
        return Substitution::unchanged(content);
    }

    let after = content.replace(pattern, replacement);
    let changed = after != content;
    Substitution {
        before: content,
        after,
        matches,
        replacements: matches,
        changed,
    }
}

/// Read `path` and substitute in memory. Content containing a NUL byte is
/// classified as binary and never transformed.
pub fn substitute_literal_file(
    path: &Path,
    pattern: &str,
    replacement: &str,
) -> Result<Substitution, ProcessError> {
    let bytes = fs::read(path).map_err(|source| ProcessError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.find_byte(0).is_some() {
        return Err(ProcessError::Binary {
            path: path.to_path_buf(),
        });
    }

    Ok(substitute_literal(bytes, pattern, replacement))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_temp(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_basic_replacement() {
        let result = substitute_literal("foo\nkeep\nfoo\n", "foo", "bar");
        assert_eq!(result.after, b"bar\nkeep\nbar\n");
        assert_eq!(result.matches, 2);
        assert_eq!(result.replacements, 2);
        assert!(result.changed);
    }

    #[test]
    fn test_no_match_is_identity() {
        let result = substitute_literal("hello world", "zzz", "qqq");
        assert_eq!(result.before, result.after);
        assert_eq!(result.matches, 0);
        assert_eq!(result.replacements, 0);
        assert!(!result.changed);
    }

    #[test]
    fn test_empty_pattern_is_noop() {
        let result = substitute_literal("abc", "", "X");
        assert_eq!(result.after, b"abc");
        assert_eq!(result.matches, 0);
        assert!(!result.changed);
    }

    #[test]
    fn test_same_pattern_and_replacement_counts_but_does_not_change() {
        let result = substitute_literal("foo", "foo", "foo");
        assert_eq!(result.matches, 1);
        assert_eq!(result.replacements, 1);
        assert!(!result.changed);
    }

    #[test]
    fn test_overlapping_occurrences_count_once() {
        let result = substitute_literal("aaaa", "aa", "b");
        assert_eq!(result.matches, 2);
        assert_eq!(result.after, b"bb");

        let result = substitute_literal("aaa", "aa", "b");
        assert_eq!(result.matches, 1);
        assert_eq!(result.after, b"ba");
    }

    #[test]
    fn test_crlf_is_preserved() {
        let result = substitute_literal("foo\r\nbar\r\n", "foo", "baz");
        assert_eq!(result.after, b"baz\r\nbar\r\n");
    }

    #[test]
    fn test_empty_replacement_deletes() {
        let result = substitute_literal("a-b-c", "-", "");
        assert_eq!(result.after, b"abc");
        assert_eq!(result.matches, 2);
        assert!(result.changed);
    }

    #[test]
    fn test_file_roundtrip_does_not_write() {
        let dir = TempDir::new().unwrap();
        let path = write_temp(&dir, "a.txt", b"foo bar foo");

        let result = substitute_literal_file(&path, "foo", "baz").unwrap();
        assert_eq!(result.after, b"baz bar baz");
        assert_eq!(fs::read_to_string(&path).unwrap(), "foo bar foo");
    }

    #[test]
    fn test_binary_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_temp(&dir, "bin.dat", b"foo\x00bar");

        let err = substitute_literal_file(&path, "foo", "baz").unwrap_err();
        assert!(matches!(err, ProcessError::Binary { .. }));
        assert!(err.to_string().contains("binary"));
        assert_eq!(fs::read(&path).unwrap(), b"foo\x00bar");
    }

    #[test]
    fn test_latin1_bytes_pass_through() {
        let dir = TempDir::new().unwrap();
        let path = write_temp(&dir, "latin1.txt", b"caf\xe9 foo\n");

        let result = substitute_literal_file(&path, "foo", "bar").unwrap();
        assert_eq!(result.before, b"caf\xe9 foo\n");
        assert_eq!(result.after, b"caf\xe9 bar\n");
        assert_eq!(result.matches, 1);
        assert!(result.changed);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = substitute_literal_file(&dir.path().join("nope.txt"), "a", "b").unwrap_err();
        assert!(matches!(err, ProcessError::Read { .. }));
    }
}
