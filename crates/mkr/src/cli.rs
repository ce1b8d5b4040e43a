//! Command-line surface for mkr.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::tracing::{LogFormat, LogLevel};

/// Exit code for a fully successful run.
pub const EXIT_OK: i32 = 0;
/// Exit code for configuration errors: unknown or duplicate targets and
/// dependency cycles.
pub const EXIT_CONFIG: i32 = 2;

/// Output format for `--list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ListFormat {
    /// One target per line with prerequisites and phony markers.
    #[default]
    Text,
    /// Structured JSON array of target descriptions.
    Json,
}

/// A minimal declarative target runner.
///
/// Targets are brought up to date in dependency order; file-backed
/// targets whose output is newer than all prerequisites are skipped.
#[derive(Debug, Parser)]
#[command(name = "mkr", version, about, max_term_width = 100)]
pub struct Cli {
    /// Targets to bring up to date, in order. Defaults to `run`.
    pub targets: Vec<String>,

    /// List the declared targets instead of running anything.
    #[arg(long)]
    pub list: bool,

    /// Output format for --list.
    #[arg(long, value_enum, default_value_t = ListFormat::Text)]
    pub format: ListFormat,

    /// Print the expanded recipe steps without executing them.
    #[arg(long)]
    pub dry_run: bool,

    /// Run as if started in this directory.
    #[arg(short = 'C', long = "chdir", value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Capture child stdout/stderr instead of inheriting the terminal.
    #[arg(long)]
    pub capture: bool,

    /// Log verbosity.
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Cli {
    /// The requested root targets, defaulting to `run`.
    #[must_use]
    pub fn roots(&self) -> Vec<String> {
        if self.targets.is_empty() {
            vec!["run".to_string()]
        } else {
            self.targets.clone()
        }
    }
}

/// Parse the process arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_root_is_run() {
        let cli = Cli::parse_from(["mkr"]);
        assert_eq!(cli.roots(), vec!["run"]);
        assert!(!cli.dry_run);
        assert!(!cli.list);
    }

    #[test]
    fn test_explicit_targets_kept_in_order() {
        let cli = Cli::parse_from(["mkr", "clean", "check"]);
        assert_eq!(cli.roots(), vec!["clean", "check"]);
    }

    #[test]
    fn test_list_format_json() {
        let cli = Cli::parse_from(["mkr", "--list", "--format", "json"]);
        assert!(cli.list);
        assert_eq!(cli.format, ListFormat::Json);
    }

    #[test]
    fn test_chdir_flag() {
        let cli = Cli::parse_from(["mkr", "-C", "/tmp/project", "check"]);
        assert_eq!(cli.directory.as_deref(), Some(std::path::Path::new("/tmp/project")));
    }

    #[test]
    fn test_cli_declaration_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
