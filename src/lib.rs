//! safereplace: preview-first bulk literal find-and-replace
//!
//! The library holds every stage of a run so it can be driven in-process by
//! tests. The binary is a thin wrapper around [`runner::run_cli`].

pub mod apply;
pub mod backup;
pub mod cli;
pub mod config;
pub mod diff_formatter;
pub mod discovery;
pub mod file_processor;
pub mod logger;
pub mod runner;

// Re-export commonly used types for convenience
pub use apply::{ApplyError, ApplyOptions, ApplyOutcome, PreparedWrite, write_atomic};
pub use diff_formatter::{DiffFormatter, DiffOptions, DiffPreview};
pub use discovery::{Discovered, DiscoveryError, Selector, discover};
pub use file_processor::{ProcessError, Substitution, substitute_literal, substitute_literal_file};
pub use runner::{ExitStatus, RunConfig, run, run_cli};
