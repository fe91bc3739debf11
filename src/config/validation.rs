//! Configuration validation
//!
//! Semantic checks run on the deserialized `SpawnerConfig`. Validation
//! collects ALL issues (doesn't stop at the first) so a single run
//! reports everything wrong with a file.

use crate::config::schema::{PhaseLimits, SourceSettings, SpawnArea, SpawnerConfig, SpawnerSettings};
use crate::error::{Severity, ValidationIssue};

/// Highest accepted `spawner.tick_rate`.
pub const MAX_TICK_RATE: u32 = 1000;

/// Stream path that would shadow the HTTP source's status route.
const RESERVED_STREAM_PATH: &str = "status";

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &SpawnerConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_spawner(&config.spawner);
        self.validate_area(&config.area);
        self.validate_phases(&config.phases);
        self.validate_source(&config.source);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn validate_spawner(&mut self, spawner: &SpawnerSettings) {
        if spawner.spawn_interval.is_zero() {
            self.error("spawner.spawn_interval", "must be greater than zero");
        }

        if spawner.max_count == 0 {
            self.warning(
                "spawner.max_count",
                "max_count is 0; the spawner will never produce items",
            );
        }

        if spawner.tick_rate == 0 || spawner.tick_rate > MAX_TICK_RATE {
            self.error(
                "spawner.tick_rate",
                format!("must be between 1 and {MAX_TICK_RATE}"),
            );
        } else if spawner.spawn_interval < spawner.tick_period() {
            self.warning(
                "spawner.spawn_interval",
                "shorter than one tick; at most one item spawns per tick",
            );
        }

        if spawner.kinds.is_empty() {
            self.error("spawner.kinds", "at least one item kind is required");
        }
        for (i, kind) in spawner.kinds.iter().enumerate() {
            if kind.trim().is_empty() {
                self.error(format!("spawner.kinds[{i}]"), "kind name must not be empty");
            }
        }
    }

    fn validate_area(&mut self, area: &SpawnArea) {
        let edges = [
            ("area.min_x", area.min_x),
            ("area.max_x", area.max_x),
            ("area.min_y", area.min_y),
            ("area.max_y", area.max_y),
        ];
        let mut all_finite = true;
        for (path, value) in edges {
            if !value.is_finite() {
                self.error(path, "must be a finite number");
                all_finite = false;
            }
        }
        if !all_finite {
            return;
        }

        if area.min_x >= area.max_x {
            self.error("area.min_x", "min_x must be less than max_x");
        }
        if area.min_y >= area.max_y {
            self.error("area.min_y", "min_y must be less than max_y");
        }
    }

    fn validate_phases(&mut self, phases: &PhaseLimits) {
        let caps = [
            ("phases.max_count_phase1", phases.max_count_phase1),
            ("phases.max_count_phase2", phases.max_count_phase2),
            ("phases.max_count_phase3", phases.max_count_phase3),
        ];
        for (path, cap) in caps {
            if cap == 0 {
                self.error(path, "phase cap must be at least 1");
            }
        }
    }

    fn validate_source(&mut self, source: &SourceSettings) {
        let trimmed = source.stream_path.trim_matches('/');
        if trimmed.is_empty() {
            self.error("source.stream_path", "stream path must not be empty");
        } else if trimmed == RESERVED_STREAM_PATH {
            self.error(
                "source.stream_path",
                format!("'{RESERVED_STREAM_PATH}' is reserved for the status route"),
            );
        } else if trimmed.split('/').any(str::is_empty) {
            self.error(
                "source.stream_path",
                "stream path must not contain empty segments",
            );
        } else if trimmed != source.stream_path {
            self.warning(
                "source.stream_path",
                "leading or trailing '/' is ignored",
            );
        }

        if source.max_message_size == 0 {
            self.error("source.max_message_size", "must be greater than zero");
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
            severity: Severity::Error,
        });
    }

    fn warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
            severity: Severity::Warning,
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
