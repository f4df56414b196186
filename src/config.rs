/// Configuration management for safereplace
///
/// Defaults live in ~/.safereplace/config.toml. Command-line flags override
/// anything set here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::backup::DEFAULT_BACKUP_SUFFIX;

/// Upper bound for `[diff] context_lines`
const MAX_CONTEXT_LINES: usize = 10;

/// safereplace configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backup settings
    #[serde(default)]
    pub backup: BackupConfig,

    /// Preview settings
    #[serde(default)]
    pub diff: DiffConfig,

    /// Debug logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Back up files before modifying them even without --backup
    #[serde(default)]
    pub enabled: bool,

    /// Suffix appended to backup file names
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            suffix: default_suffix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Colorize previews
    #[serde(default = "default_color")]
    pub color: bool,

    /// Treat a lone trailing newline difference as a change
    #[serde(default)]
    pub strict_eol: bool,

    /// Context lines around changes (reserved)
    #[serde(default)]
    pub context_lines: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            color: default_color(),
            strict_eol: false,
            context_lines: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write debug logs to a file
    #[serde(default)]
    pub debug: bool,

    /// Log file location (default: ~/.safereplace/safereplace.log)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

// Default functions for serde
fn default_suffix() -> String { DEFAULT_BACKUP_SUFFIX.to_string() }
fn default_color() -> bool { true }

/// Get the safereplace state directory (~/.safereplace)
pub fn config_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home_dir.join(".safereplace"))
}

/// Get the default configuration file path
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Default configuration file content with comments
fn get_default_config_content() -> &'static str {
    r#"# safereplace configuration file
#
# Values set here are defaults; command-line flags override them.

[backup]
# Back up every modified file even without --backup (default: false)
enabled = false

# Suffix for backup files (default: ".bak")
# Existing backups are never overwritten; numbered names (.bak.1, .bak.2, ...) are used instead.
suffix = ".bak"

[diff]
# Colorize dry-run previews (default: true). --no-color and NO_COLOR override this.
color = true

# Report a difference that is only a trailing newline (default: false)
strict_eol = false

# Context lines around changes, reserved for unified diffs (default: 0, max: 10)
context_lines = 0

[logging]
# Write debug logs to a file (default: false)
# Filter with SAFEREPLACE_LOG, e.g. SAFEREPLACE_LOG=safereplace=debug
debug = false

# Log file location (default: ~/.safereplace/safereplace.log)
#log_file = "/tmp/safereplace.log"
"#
}

/// Write the default commented configuration file to `path`.
///
/// Refuses to overwrite an existing file.
pub fn save_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("Config file already exists: {}", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    fs::write(path, get_default_config_content())
        .with_context(|| format!("Failed to write default config file: {}", path.display()))?;

    Ok(())
}

/// Load configuration from `path`, or from the default location when `None`.
///
/// A missing file yields the defaults. A malformed or invalid file is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => match config_file_path() {
            Ok(path) => path,
            Err(_) => return Ok(Config::default()),
        },
    };

    if !config_path.exists() {
        return Ok(Config::default());
    }

    let config_str = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

    let config: Config = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

    validate_config(&config)
        .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

    Ok(config)
}

/// Validate a backup suffix from the config file or the command line
pub fn validate_backup_suffix(suffix: &str) -> Result<()> {
    if suffix.is_empty() {
        anyhow::bail!("Invalid backup suffix: must not be empty");
    }
    if suffix.contains('/') || suffix.contains(std::path::MAIN_SEPARATOR) {
        anyhow::bail!("Invalid backup suffix: {} (must not contain path separators)", suffix);
    }
    Ok(())
}

/// Validate configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    validate_backup_suffix(&config.backup.suffix)?;

    if config.diff.context_lines > MAX_CONTEXT_LINES {
        anyhow::bail!(
            "Invalid context_lines: {} (max {})",
            config.diff.context_lines,
            MAX_CONTEXT_LINES
        );
    }

    Ok(())
}
