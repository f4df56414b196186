use anyhow::{Result, bail};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::apply::ApplyOptions;
use crate::config::{self, Config};
use crate::diff_formatter::DiffOptions;
use crate::discovery::Selector;
use crate::runner::RunConfig;

#[derive(Parser, Debug)]
#[command(name = "safereplace")]
#[command(about = "Preview-first bulk literal find-and-replace")]
#[command(long_about = "safereplace replaces literal text across many files at once.

Every run is a dry run unless --dry-run=false is given: matching files are
listed with a line diff and nothing is written. When changes are applied,
each file is replaced atomically (temp file, fsync, rename) and keeps its
permissions. With --backup the previous contents are kept next to the file
as <name>.bak (or .bak.1, .bak.2, ... if a backup already exists).

FILE SELECTION:
  --ext txt            Every *.txt file under the root, recursively
  --glob 'src/*.rs'    Shell glob, relative to the root
  --files a.txt,b.txt  Explicit list
  --exclude PATTERN    Drop matches by relative path, base name, or absolute path

EXIT STATUS:
  0  No file would change
  1  At least one file changed (or would change in a dry run)
  2  An error occurred

EXAMPLES:
  safereplace --pattern foo --replace bar --ext txt
  safereplace --pattern foo --replace bar --glob '*.md' --dry-run=false --backup
  safereplace --pattern v1 --replace v2 --ext toml --exclude 'target/*'")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Literal text to search for
    #[arg(long, value_name = "TEXT", allow_hyphen_values = true)]
    pub pattern: Option<String>,

    /// Replacement text
    #[arg(long, value_name = "TEXT", allow_hyphen_values = true)]
    pub replace: Option<String>,

    /// Use regex mode (not implemented)
    #[arg(long)]
    pub regex: bool,

    /// Force literal mode (default)
    #[arg(long)]
    pub literal: bool,

    /// File glob to match (e.g. "*.rs")
    #[arg(long, value_name = "PATTERN", allow_hyphen_values = true)]
    pub glob: Option<String>,

    /// File extension filter, with or without the dot (e.g. "txt")
    #[arg(long, value_name = "EXT")]
    pub ext: Option<String>,

    /// Explicit list of files (comma separated or repeated)
    #[arg(long, value_name = "PATH", value_delimiter = ',')]
    pub files: Vec<String>,

    /// Exclude files matching PATTERN (repeatable)
    #[arg(long, value_name = "PATTERN", allow_hyphen_values = true)]
    pub exclude: Vec<String>,

    /// Directory that relative selectors are resolved against (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Apply all changes without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Confirm per file before applying
    #[arg(short = 'i', long)]
    pub interactive: bool,

    /// Create backups before modifying files
    #[arg(long)]
    pub backup: bool,

    /// Suffix for backup files (default: ".bak")
    #[arg(long, value_name = "SUFFIX", allow_hyphen_values = true)]
    pub backup_suffix: Option<String>,

    /// Preview changes only; pass --dry-run=false to write
    #[arg(
        long,
        value_name = "BOOL",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = true,
        default_missing_value = "true"
    )]
    pub dry_run: bool,

    /// Disable ANSI colors in output
    #[arg(long)]
    pub no_color: bool,

    /// Number of context lines in diffs (reserved)
    #[arg(long, value_name = "NUM")]
    pub context: Option<usize>,

    /// Treat a lone trailing newline difference as a change
    #[arg(long)]
    pub strict_eol: bool,

    /// Configuration file (default: ~/.safereplace/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write a commented default configuration file and exit
    #[arg(long)]
    pub init_config: bool,
}

impl Cli {
    /// Validate the arguments and merge them over the file configuration.
    ///
    /// `no_color_env` reflects the NO_COLOR environment variable.
    pub fn into_run_config(self, file_config: &Config, no_color_env: bool) -> Result<RunConfig> {
        let pattern = self.pattern.filter(|pattern| !pattern.is_empty());
        let (Some(pattern), Some(replacement)) = (pattern, self.replace) else {
            bail!("--pattern and --replace are required");
        };
        if self.regex {
            bail!("regex mode not yet implemented; use --literal (default)");
        }
        if self.yes && self.interactive {
            bail!("--yes and --interactive are mutually exclusive");
        }

        let selector = Selector {
            glob: self.glob.filter(|glob| !glob.is_empty()),
            ext: self.ext.filter(|ext| !ext.is_empty()),
            files: self.files.into_iter().map(PathBuf::from).collect(),
            exclude: self.exclude,
        };
        if selector.glob.is_none() && selector.ext.is_none() && selector.files.is_empty() {
            bail!("no files specified; use --glob, --ext, or --files");
        }

        let backup_suffix = self
            .backup_suffix
            .unwrap_or_else(|| file_config.backup.suffix.clone());
        config::validate_backup_suffix(&backup_suffix)?;

        Ok(RunConfig {
            pattern,
            replacement,
            root: self.root.unwrap_or_default(),
            selector,
            dry_run: self.dry_run,
            apply: ApplyOptions {
                backup: self.backup || file_config.backup.enabled,
                backup_suffix,
            },
            diff: DiffOptions {
                color: file_config.diff.color && !self.no_color && !no_color_env,
                context: self.context.unwrap_or(file_config.diff.context_lines),
                strict_eol: self.strict_eol || file_config.diff.strict_eol,
            },
        })
    }
}
