//! Run orchestration: discovery, then process, preview and apply each file in
//! sorted order, then fold everything into an exit status.
//!
//! Output is written to caller-supplied writers so a whole run can be driven
//! in-process.

use clap::Parser;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::apply::{self, ApplyOptions};
use crate::cli::Cli;
use crate::config;
use crate::diff_formatter::{DiffFormatter, DiffOptions};
use crate::discovery::{self, Selector};
use crate::file_processor;
use crate::logger;

/// Process exit status. Errors take precedence over changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// No file differed meaningfully
    Unchanged = 0,
    /// At least one file differed (previewed or written)
    Changed = 1,
    /// Invalid arguments, discovery errors or per-file failures
    Failed = 2,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Validated settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub pattern: String,
    pub replacement: String,
    /// Discovery root; empty means the current directory
    pub root: PathBuf,
    pub selector: Selector,
    pub dry_run: bool,
    pub apply: ApplyOptions,
    pub diff: DiffOptions,
}

#[derive(Debug, Default)]
struct RunState {
    had_changes: bool,
    had_errors: bool,
}

impl RunState {
    fn status(&self) -> ExitStatus {
        if self.had_errors {
            ExitStatus::Failed
        } else if self.had_changes {
            ExitStatus::Changed
        } else {
            ExitStatus::Unchanged
        }
    }
}

/// Execute a run, writing headers and previews to `out` and warnings to `err`.
pub fn run<O: Write, E: Write>(config: &RunConfig, out: &mut O, err: &mut E) -> ExitStatus {
    match execute(config, out, err) {
        Ok(status) => status,
        Err(io_err) => {
            // stdout or stderr went away; report once if stderr still works
            let _ = writeln!(err, "error: {io_err}");
            ExitStatus::Failed
        }
    }
}

fn execute<O: Write, E: Write>(config: &RunConfig, out: &mut O, err: &mut E) -> io::Result<ExitStatus> {
    let discovered = match discovery::discover(&config.root, &config.selector) {
        Ok(discovered) => discovered,
        Err(discovery_err) => {
            writeln!(err, "{discovery_err}")?;
            return Ok(ExitStatus::Failed);
        }
    };

    if discovered.has_errors() && discovered.paths.is_empty() {
        for discovery_err in &discovered.errors {
            writeln!(err, "{discovery_err}")?;
        }
        return Ok(ExitStatus::Failed);
    }

    info!(
        root = %discovered.root.display(),
        files = discovered.paths.len(),
        dry_run = config.dry_run,
        "starting run"
    );

    let mut state = RunState::default();
    for path in &discovered.paths {
        let substitution =
            match file_processor::substitute_literal_file(path, &config.pattern, &config.replacement) {
                Ok(substitution) => substitution,
                Err(process_err) => {
                    writeln!(err, "warn: {}: {}", path.display(), process_err)?;
                    state.had_errors = true;
                    continue;
                }
            };
        if !substitution.changed {
            continue;
        }

        let preview = DiffFormatter::render(&substitution.before, &substitution.after, &config.diff);
        if !preview.changed {
            debug!(path = %path.display(), "only the final newline differs; skipped");
            continue;
        }
        state.had_changes = true;

        writeln!(
            out,
            "file: {}  (matches: {}, replacements: {})",
            path.display(),
            substitution.matches,
            substitution.replacements
        )?;

        if config.dry_run {
            out.write_all(preview.text.as_bytes())?;
            continue;
        }

        if let Err(apply_err) = apply::write_atomic(path, &substitution.after, &config.apply) {
            writeln!(err, "error: apply {}: {}", path.display(), apply_err)?;
            state.had_errors = true;
        }
    }

    for discovery_err in &discovered.errors {
        writeln!(err, "{discovery_err}")?;
        state.had_errors = true;
    }

    let status = state.status();
    info!(status = status.code(), "run finished");
    Ok(status)
}

/// Parse `args` (including the program name), load configuration and run.
pub fn run_cli<I, T, O, E>(args: I, out: &mut O, err: &mut E) -> ExitStatus
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    O: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(clap_err) => {
            // --help and --version surface as errors with exit code 0
            let status = if clap_err.use_stderr() {
                let _ = write!(err, "{}", clap_err.render());
                ExitStatus::Failed
            } else {
                let _ = write!(out, "{}", clap_err.render());
                ExitStatus::Unchanged
            };
            return status;
        }
    };

    if cli.init_config {
        return init_config(cli.config.clone(), out, err);
    }

    let file_config = match config::load_config(cli.config.as_deref()) {
        Ok(file_config) => file_config,
        Err(config_err) => {
            let _ = writeln!(err, "{config_err:#}");
            return ExitStatus::Failed;
        }
    };

    if let Err(log_err) = logger::init_debug_logging(&file_config.logging) {
        let _ = writeln!(err, "warn: debug logging disabled: {log_err:#}");
    }

    let no_color_env = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    let run_config = match cli.into_run_config(&file_config, no_color_env) {
        Ok(run_config) => run_config,
        Err(arg_err) => {
            let _ = writeln!(err, "{arg_err:#}");
            return ExitStatus::Failed;
        }
    };

    run(&run_config, out, err)
}

fn init_config<O: Write, E: Write>(path: Option<PathBuf>, out: &mut O, err: &mut E) -> ExitStatus {
    let path = match path.map_or_else(config::config_file_path, Ok) {
        Ok(path) => path,
        Err(path_err) => {
            let _ = writeln!(err, "{path_err:#}");
            return ExitStatus::Failed;
        }
    };

    match config::save_default_config(&path) {
        Ok(()) => {
            let _ = writeln!(out, "wrote {}", path.display());
            ExitStatus::Unchanged
        }
        Err(save_err) => {
            let _ = writeln!(err, "{save_err:#}");
            ExitStatus::Failed
        }
    }
}
