//! CLI argument definitions
//!
//! All Clap derive structs for `spawnstream` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Timed item spawner driven by a phase state machine over an event stream.
#[derive(Parser, Debug)]
#[command(name = "spawnstream", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "SPAWNSTREAM_COLOR")]
    pub color: ColorChoice,

    /// Log line format.
    #[arg(long, default_value = "human", global = true)]
    pub log_format: LogFormatArg,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the spawner against an event source.
    Run(RunArgs),

    /// Validate configuration files without running.
    Validate(ValidateArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Run / Validate
// ============================================================================

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to YAML configuration file (defaults apply when omitted).
    #[arg(short, long, env = "SPAWNSTREAM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Serve the stream over HTTP on `[host:]port` instead of stdio.
    #[arg(long)]
    pub http: Option<String>,

    /// Write structured events as JSONL to this file instead of stderr.
    #[arg(long, env = "SPAWNSTREAM_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Expose Prometheus metrics on this port.
    #[arg(long, env = "SPAWNSTREAM_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Random seed; overrides `spawner.seed`.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Log format as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormatArg {
    #[default]
    Human,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Human => Self::Human,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_without_config_parses() {
        let cli = Cli::try_parse_from(["spawnstream", "run"]);
        assert!(cli.is_ok(), "Failed to parse: {cli:?}");
    }

    #[test]
    fn test_run_with_all_options() {
        let cli = Cli::try_parse_from([
            "spawnstream",
            "run",
            "--config",
            "spawner.yaml",
            "--http",
            ":8080",
            "--events-file",
            "events.jsonl",
            "--metrics-port",
            "9100",
            "--seed",
            "42",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("Expected RunArgs");
        };
        assert_eq!(args.config, Some(PathBuf::from("spawner.yaml")));
        assert_eq!(args.http.as_deref(), Some(":8080"));
        assert_eq!(args.metrics_port, Some(9100));
        assert_eq!(args.seed, Some(42));
    }

    #[test]
    fn test_invalid_seed_rejected() {
        let result = Cli::try_parse_from(["spawnstream", "run", "--seed", "-1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_help_output() {
        let result = Cli::try_parse_from(["spawnstream", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_output() {
        let result = Cli::try_parse_from(["spawnstream", "--version"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_color_choices_parse() {
        for variant in ["auto", "always", "never"] {
            let cli = Cli::try_parse_from(["spawnstream", "--color", variant, "run"]);
            assert!(cli.is_ok(), "Failed to parse color={variant}");
        }
    }

    #[test]
    fn test_log_format_parse() {
        let cli = Cli::try_parse_from(["spawnstream", "--log-format", "json", "run"]).unwrap();
        assert_eq!(cli.log_format, LogFormatArg::Json);
        assert_eq!(LogFormat::from(cli.log_format), LogFormat::Json);
    }

    #[test]
    fn test_validate_requires_files() {
        let result = Cli::try_parse_from(["spawnstream", "validate"]);
        assert!(result.is_err(), "Expected error for missing files");
    }

    #[test]
    fn test_validate_strict_json() {
        let cli = Cli::try_parse_from([
            "spawnstream",
            "validate",
            "a.yaml",
            "b.yaml",
            "--strict",
            "--format",
            "json",
        ])
        .unwrap();
        let Commands::Validate(args) = cli.command else {
            panic!("Expected ValidateArgs");
        };
        assert_eq!(args.files.len(), 2);
        assert!(args.strict);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_completions_shells_parse() {
        for shell in ["bash", "zsh", "fish", "powershell", "elvish"] {
            let cli = Cli::try_parse_from(["spawnstream", "completions", shell]);
            assert!(cli.is_ok(), "Failed to parse shell={shell}");
        }
    }

    #[test]
    fn test_verbose_count() {
        let cli = Cli::try_parse_from(["spawnstream", "-vvv", "run"]).unwrap();
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn test_quiet_flag() {
        let cli = Cli::try_parse_from(["spawnstream", "--quiet", "run"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_exit_code_mapping() {
        use crate::error::{ConfigError, ExitCode, SourceError, SpawnerError};

        let cases: Vec<(SpawnerError, i32)> = vec![
            (
                ConfigError::MissingFile {
                    path: PathBuf::from("/x"),
                }
                .into(),
                ExitCode::CONFIG_ERROR,
            ),
            (
                SourceError::SubscribeFailed("x".into()).into(),
                ExitCode::SOURCE_ERROR,
            ),
            (
                std::io::Error::new(std::io::ErrorKind::NotFound, "x").into(),
                ExitCode::IO_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.exit_code(), expected, "Wrong exit code for {err}");
        }
    }
}
