//! Line-by-line before/after previews.
//!
//! Contents are compared as bytes; lines are decoded lossily only when they
//! are written into the preview. A difference that is only one trailing
//! newline is not reported unless strict EOL is requested.

use bstr::ByteSlice;
use colored::Color;

const ANSI_RESET: &str = "\x1b[0m";

/// Rendering options for a before/after preview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Wrap removed/added lines in ANSI colors
    pub color: bool,
    /// Context lines around changes (reserved, not rendered yet)
    pub context: usize,
    /// Report a lone trailing-newline difference as a change
    pub strict_eol: bool,
}

/// Rendered preview plus whether the difference is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffPreview {
    pub text: String,
    pub changed: bool,
}

pub struct DiffFormatter;

impl DiffFormatter {
    /// Render a line-by-line preview of `before` against `after`.
    ///
    /// Lines are compared by index after padding the shorter side with empty
    /// lines. For each differing index the old line is emitted with `-` and the
    /// new line with `+`, except that empty lines are never emitted.
    pub fn render(
        before: impl AsRef<[u8]>,
        after: impl AsRef<[u8]>,
        options: &DiffOptions,
    ) -> DiffPreview {
        let (before, after) = (before.as_ref(), after.as_ref());
        if !options.strict_eol && equal_ignoring_final_newline(before, after) {
            return DiffPreview::default();
        }
        if before == after {
            return DiffPreview::default();
        }

        let mut output = String::from("--- before\n+++ after\n");

        let old_lines: Vec<&[u8]> = before.split(|&byte| byte == b'\n').collect();
        let new_lines: Vec<&[u8]> = after.split(|&byte| byte == b'\n').collect();
        let line_count = old_lines.len().max(new_lines.len());

        for idx in 0..line_count {
            let removed = old_lines.get(idx).copied().unwrap_or_default();
            let added = new_lines.get(idx).copied().unwrap_or_default();
            if removed == added {
                continue;
            }
            if !removed.is_empty() {
                Self::push_line(&mut output, '-', removed, Color::Red, options.color);
            }
            if !added.is_empty() {
                Self::push_line(&mut output, '+', added, Color::Green, options.color);
            }
        }

        DiffPreview {
            text: output,
            changed: true,
        }
    }

    fn push_line(output: &mut String, marker: char, line: &[u8], color: Color, use_color: bool) {
        if use_color {
            output.push_str("\x1b[");
            output.push_str(&color.to_fg_str());
            output.push('m');
        }
        output.push(marker);
        output.push_str(&line.to_str_lossy());
        if use_color {
            output.push_str(ANSI_RESET);
        }
        output.push('\n');
    }
}

/// True if `a` and `b` are equal, or differ only because exactly one of them
/// carries a single extra trailing `\n`.
pub fn equal_ignoring_final_newline(a: impl AsRef<[u8]>, b: impl AsRef<[u8]>) -> bool {
    let (a, b) = (a.as_ref(), b.as_ref());
    if a == b {
        return true;
    }
    match (a.strip_suffix(b"\n"), b.strip_suffix(b"\n")) {
        (Some(trimmed), None) => trimmed == b,
        (None, Some(trimmed)) => trimmed == a,
        _ => false,
    }
}
