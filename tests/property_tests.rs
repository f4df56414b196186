//! Property-based tests for safereplace
//!
//! This module uses proptest to verify core invariants of substitution,
//! preview rendering, discovery and atomic apply.

use bstr::ByteSlice;
use std::collections::HashSet;
use std::fs;
use tempfile::TempDir;

use safereplace::diff_formatter::equal_ignoring_final_newline;
use safereplace::{
    ApplyOptions, DiffFormatter, DiffOptions, Selector, discover, substitute_literal,
    substitute_literal_file, write_atomic,
};

// Import proptest macro
use proptest::prelude::*;

// ============================================================================
// Property 1: Literal substitution
// ============================================================================

proptest! {
    /// A pattern that never occurs leaves the content untouched
    #[test]
    fn prop_no_match_is_identity(
        text in "[a-m\n]{0,100}",
        pattern in "[x-z]{1,5}"
    ) {
        let result = substitute_literal(text.clone(), &pattern, "REPLACED");
        prop_assert_eq!(result.before.as_slice(), text.as_bytes());
        prop_assert_eq!(result.after.as_slice(), text.as_bytes());
        prop_assert_eq!(result.matches, 0);
        prop_assert_eq!(result.replacements, 0);
        prop_assert!(!result.changed);
    }

    /// Every occurrence is counted and replaced
    #[test]
    fn prop_replacement_count_equals_match_count(
        text in "[a-c ]{0,100}",
        pattern in "[a-c]{1,3}"
    ) {
        let result = substitute_literal(text.clone(), &pattern, "<>");
        prop_assert_eq!(result.matches, text.matches(pattern.as_str()).count());
        prop_assert_eq!(result.replacements, result.matches);
        prop_assert!(!result.after.contains_str(&pattern));
        prop_assert_eq!(result.changed, result.matches > 0);
    }

    /// Replacing a pattern with itself reports matches but no change
    #[test]
    fn prop_self_replacement_never_changes(
        prefix in "[a-z]{0,20}",
        pattern in "[a-z]{1,5}",
        suffix in "[a-z]{0,20}"
    ) {
        let text = format!("{prefix}{pattern}{suffix}");
        let result = substitute_literal(text.clone(), &pattern, &pattern);
        prop_assert!(result.matches > 0);
        prop_assert_eq!(result.after, text.into_bytes());
        prop_assert!(!result.changed);
    }

    /// An empty pattern is a no-op
    #[test]
    fn prop_empty_pattern_is_noop(text in "\\PC{0,50}", replacement in "\\PC{0,5}") {
        let result = substitute_literal(text.clone(), "", &replacement);
        prop_assert_eq!(result.after, text.into_bytes());
        prop_assert_eq!(result.matches, 0);
    }

    /// CRLF line endings survive a substitution that does not touch them
    #[test]
    fn prop_crlf_preserved(lines in prop::collection::vec("[a-f]{0,10}", 1..10)) {
        let text = lines.join("\r\n");
        let result = substitute_literal(text.clone(), "a", "z");
        prop_assert_eq!(result.after.find_iter("\r\n").count(), text.matches("\r\n").count());
    }

    /// Content with a NUL byte is always rejected
    #[test]
    fn prop_nul_content_is_binary(
        head in prop::collection::vec(any::<u8>(), 0..50),
        tail in prop::collection::vec(any::<u8>(), 0..50)
    ) {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("blob.txt");
        let mut bytes = head;
        bytes.push(0);
        bytes.extend(tail);
        fs::write(&file_path, &bytes).unwrap();

        prop_assert!(substitute_literal_file(&file_path, "a", "b").is_err());
        prop_assert_eq!(fs::read(&file_path).unwrap(), bytes);
    }
}

proptest! {
    /// NUL-free bytes outside the pattern survive substitution unchanged,
    /// whether or not they are valid UTF-8
    #[test]
    fn prop_non_utf8_bytes_preserved(
        chunks in prop::collection::vec(prop::collection::vec(0x80u8..=0xff, 0..6), 1..6)
    ) {
        let content = chunks.join(&b"foo"[..]);
        let expected = chunks.join(&b"bar"[..]);

        let result = substitute_literal(content, "foo", "bar");
        prop_assert_eq!(result.after, expected);
        prop_assert_eq!(result.matches, chunks.len() - 1);
    }
}

// ============================================================================
// Property 2: Preview rendering
// ============================================================================

proptest! {
    /// A lone trailing newline is not a change unless strict EOL is requested
    #[test]
    fn prop_final_newline_suppressed(text in "[a-z\n]{0,50}") {
        let text = text.trim_end_matches('\n');
        let with_newline = format!("{text}\n");

        let relaxed = DiffFormatter::render(text, &with_newline, &DiffOptions::default());
        prop_assert!(!relaxed.changed);
        prop_assert!(relaxed.text.is_empty());

        let strict = DiffOptions { strict_eol: true, ..DiffOptions::default() };
        let strict = DiffFormatter::render(text, &with_newline, &strict);
        prop_assert!(strict.changed);
        prop_assert!(strict.text.starts_with("--- before\n+++ after\n"));
    }

    /// The helper is symmetric
    #[test]
    fn prop_equal_ignoring_final_newline_symmetric(a in "[ab\n]{0,10}", b in "[ab\n]{0,10}") {
        prop_assert_eq!(
            equal_ignoring_final_newline(&a, &b),
            equal_ignoring_final_newline(&b, &a)
        );
    }

    /// Identical content never renders a preview
    #[test]
    fn prop_identical_content_has_no_preview(text in "\\PC{0,80}", strict in any::<bool>()) {
        let options = DiffOptions { strict_eol: strict, ..DiffOptions::default() };
        let preview = DiffFormatter::render(&text, &text, &options);
        prop_assert!(!preview.changed);
        prop_assert!(preview.text.is_empty());
    }

    /// Without color every body line starts with a marker
    #[test]
    fn prop_plain_preview_lines_are_marked(
        before in prop::collection::vec("[a-c]{1,5}", 1..8),
        after in prop::collection::vec("[a-c]{1,5}", 1..8)
    ) {
        let preview = DiffFormatter::render(&before.join("\n"), &after.join("\n"), &DiffOptions::default());
        for line in preview.text.lines().skip(2) {
            prop_assert!(line.starts_with('-') || line.starts_with('+'));
        }
        prop_assert!(!preview.text.contains('\x1b'));
    }
}

// ============================================================================
// Property 3: Discovery
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Results are absolute, sorted, unique and all regular files, however
    /// many mechanisms select the same file
    #[test]
    fn prop_discovery_sorted_unique_absolute(
        names in prop::collection::hash_set("[a-z]{1,8}", 1..10),
        upper in any::<bool>()
    ) {
        let temp_dir = TempDir::new().unwrap();
        for name in &names {
            fs::write(temp_dir.path().join(format!("{name}.txt")), "x").unwrap();
        }
        fs::create_dir(temp_dir.path().join("DIR.txt")).unwrap();

        let ext = if upper { ".TXT" } else { "txt" };
        let selector = Selector::default()
            .with_ext(ext)
            .with_glob("*.txt")
            .with_files(names.iter().map(|name| format!("{name}.txt")));
        let discovered = discover(temp_dir.path(), &selector).unwrap();

        prop_assert_eq!(discovered.paths.len(), names.len());
        prop_assert!(discovered.errors.is_empty());
        prop_assert!(discovered.paths.windows(2).all(|pair| pair[0] < pair[1]));
        for path in &discovered.paths {
            prop_assert!(path.is_absolute());
            prop_assert!(fs::symlink_metadata(path).unwrap().is_file());
        }

        let found: HashSet<String> = discovered
            .paths
            .iter()
            .map(|path| path.file_stem().unwrap().to_string_lossy().into_owned())
            .collect();
        prop_assert_eq!(found, names);
    }

    /// Excluding a base name removes exactly that file
    #[test]
    fn prop_exclude_by_base_name(names in prop::collection::hash_set("[a-z]{1,8}", 2..8)) {
        let temp_dir = TempDir::new().unwrap();
        for name in &names {
            fs::write(temp_dir.path().join(format!("{name}.txt")), "x").unwrap();
        }
        let excluded = names.iter().next().unwrap().clone();

        let selector = Selector::default()
            .with_ext("txt")
            .with_exclude([format!("{excluded}.txt")]);
        let discovered = discover(temp_dir.path(), &selector).unwrap();

        prop_assert_eq!(discovered.paths.len(), names.len() - 1);
        let excluded_name = format!("{excluded}.txt");
        prop_assert!(discovered.paths.iter().all(|path| !path.ends_with(&excluded_name)));
    }
}

// ============================================================================
// Property 4: Atomic apply
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// After a write the file holds exactly the new content and the backup
    /// holds exactly the old content
    #[test]
    fn prop_write_atomic_with_backup(
        original in prop::collection::vec(any::<u8>(), 0..200),
        replacement in prop::collection::vec(any::<u8>(), 0..200)
    ) {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("data.txt");
        fs::write(&file_path, &original).unwrap();

        let outcome = write_atomic(&file_path, &replacement, &ApplyOptions::with_backup()).unwrap();

        prop_assert_eq!(fs::read(&file_path).unwrap(), replacement.clone());
        let backup = outcome.backup.unwrap();
        prop_assert_eq!(fs::read(backup).unwrap(), original);
        prop_assert_eq!(outcome.bytes_written, replacement.len());

        // No temp files are left behind
        let leftovers = fs::read_dir(temp_dir.path()).unwrap().count();
        prop_assert_eq!(leftovers, 2);
    }
}
