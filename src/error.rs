//! Error types for `spawnstream`
//!
//! Layered error hierarchy: each subsystem owns its error enum and the
//! top-level [`SpawnerError`] aggregates them for exit code mapping.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `spawnstream` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Event source error (bind failure, stream closed unexpectedly)
    pub const SOURCE_ERROR: i32 = 4;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `spawnstream` operations.
#[derive(Debug, Error)]
pub enum SpawnerError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Event source error
    #[error(transparent)]
    Source(#[from] SourceError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SpawnerError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Source(_) => ExitCode::SOURCE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", summarize(.errors))]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Configuration file exceeds the size limit
    #[error("configuration too large: {size} bytes (limit: {limit})")]
    TooLarge {
        /// Actual file size in bytes
        size: usize,
        /// Configured limit in bytes
        limit: usize,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set (referenced at {location})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Location in the configuration where it was referenced
        location: String,
    },
}

fn summarize(errors: &[ValidationIssue]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Dotted path to the problematic field (e.g. `"phases.max_count_phase2"`)
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Prevents the configuration from being used
    Error,
    /// Reported, but the configuration still loads
    Warning,
}

// ============================================================================
// Event Source Errors
// ============================================================================

/// Errors raised by event sources (stdio, HTTP, in-process channel).
#[derive(Debug, Error)]
pub enum SourceError {
    /// I/O error while reading or writing the stream
    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The subscription could not be established
    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),

    /// The stream was closed before the operation completed
    #[error("stream closed: {0}")]
    Closed(String),

    /// Clearing the upstream stream failed
    #[error("clear failed: {0}")]
    ClearFailed(String),

    /// A single message exceeded the size limit
    #[error("message too large: {size} bytes (limit: {limit})")]
    MessageTooLarge {
        /// Actual message size in bytes
        size: usize,
        /// Configured size limit in bytes
        limit: usize,
    },
}

// ============================================================================
// Payload Errors
// ============================================================================

/// A stream entry whose value cannot be read as an integer signal.
///
/// These never stop the spawner: the entry is logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// The value has no integer interpretation (object, array, text)
    #[error("not an integer: {raw}")]
    NotAnInteger {
        /// The offending payload, rendered as JSON
        raw: String,
    },

    /// The value is numeric but outside the 32-bit signed range
    #[error("integer out of range: {raw}")]
    OutOfRange {
        /// The offending payload, rendered as JSON
        raw: String,
    },

    /// The entry carried no value at all
    #[error("empty payload")]
    Empty,
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `spawnstream` operations.
pub type Result<T> = std::result::Result<T, SpawnerError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::ERROR, 1);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::SOURCE_ERROR, 4);
        assert_eq!(ExitCode::USAGE_ERROR, 64);
        assert_eq!(ExitCode::INTERRUPTED, 130);
        assert_eq!(ExitCode::TERMINATED, 143);
    }

    #[test]
    fn test_config_error_exit_code() {
        let err: SpawnerError = ConfigError::MissingFile {
            path: PathBuf::from("/test"),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_source_error_exit_code() {
        let err: SpawnerError = SourceError::SubscribeFailed("bind".to_string()).into();
        assert_eq!(err.exit_code(), ExitCode::SOURCE_ERROR);
    }

    #[test]
    fn test_io_error_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: SpawnerError = io_err.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn test_validation_issue_display() {
        let issue = ValidationIssue {
            path: "spawner.spawn_interval".to_string(),
            message: "must be greater than zero".to_string(),
            severity: Severity::Error,
        };
        assert_eq!(
            issue.to_string(),
            "error: must be greater than zero at spawner.spawn_interval"
        );
    }

    #[test]
    fn test_validation_issue_warning_display() {
        let issue = ValidationIssue {
            path: "spawner.max_count".to_string(),
            message: "spawner will never spawn".to_string(),
            severity: Severity::Warning,
        };
        assert_eq!(
            issue.to_string(),
            "warning: spawner will never spawn at spawner.max_count"
        );
    }

    #[test]
    fn test_validation_error_lists_issues() {
        let err = ConfigError::ValidationError {
            path: "spawner.yaml".to_string(),
            errors: vec![ValidationIssue {
                path: "area".to_string(),
                message: "min_x must be less than max_x".to_string(),
                severity: Severity::Error,
            }],
        };
        let msg = err.to_string();
        assert!(msg.contains("spawner.yaml"));
        assert!(msg.contains("min_x must be less than max_x"));
    }

    #[test]
    fn test_config_error_env_var_display() {
        let err = ConfigError::EnvVarNotSet {
            var: "STREAM_URL".to_string(),
            location: "source.endpoint".to_string(),
        };
        assert!(err.to_string().contains("STREAM_URL"));
        assert!(err.to_string().contains("source.endpoint"));
    }

    #[test]
    fn test_message_too_large_display() {
        let err = SourceError::MessageTooLarge {
            size: 70_000,
            limit: 65_536,
        };
        assert_eq!(
            err.to_string(),
            "message too large: 70000 bytes (limit: 65536)"
        );
    }

    #[test]
    fn test_payload_error_display() {
        let err = PayloadError::NotAnInteger {
            raw: "\"abc\"".to_string(),
        };
        assert_eq!(err.to_string(), "not an integer: \"abc\"");
    }
}
