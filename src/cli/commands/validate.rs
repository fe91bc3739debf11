//! `validate` command handler
//!
//! Loads each file through the full pipeline and reports the outcome in
//! human or JSON form. Every file is checked even after a failure; the
//! first failure decides the exit code.

use std::path::Path;

use serde_json::json;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::loader::{ConfigLimits, ConfigLoader, LoadWarning};
use crate::error::{ConfigError, Severity, SpawnerError, ValidationIssue};

/// Validate configuration files without running.
///
/// # Errors
///
/// Returns the first file's config error, or, with `--strict`, a
/// validation error built from that file's warnings.
pub fn validate(args: &ValidateArgs) -> Result<(), SpawnerError> {
    let loader = ConfigLoader::new(ConfigLimits::default());
    let mut first_error: Option<ConfigError> = None;

    for path in &args.files {
        tracing::info!(file = %path.display(), "validating configuration");

        let outcome = check_file(&loader, path, args.strict);
        report(path, &outcome, args.format);

        if let Err(e) = outcome.result {
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

struct Outcome {
    warnings: Vec<LoadWarning>,
    result: Result<(), ConfigError>,
}

fn check_file(loader: &ConfigLoader, path: &Path, strict: bool) -> Outcome {
    match loader.load(path) {
        Ok(load_result) => {
            let warnings = load_result.warnings;
            let result = if strict && !warnings.is_empty() {
                Err(ConfigError::ValidationError {
                    path: path.display().to_string(),
                    errors: warnings.iter().map(warning_as_error).collect(),
                })
            } else {
                Ok(())
            };
            Outcome { warnings, result }
        }
        Err(e) => Outcome {
            warnings: Vec::new(),
            result: Err(e),
        },
    }
}

fn warning_as_error(warning: &LoadWarning) -> ValidationIssue {
    ValidationIssue {
        path: warning
            .location
            .clone()
            .unwrap_or_else(|| "<unknown>".to_string()),
        message: warning.message.clone(),
        severity: Severity::Error,
    }
}

fn report(path: &Path, outcome: &Outcome, format: OutputFormat) {
    match format {
        OutputFormat::Human => {
            for warning in &outcome.warnings {
                let location = warning.location.as_deref().unwrap_or("<unknown>");
                println!("{}: warning: {} at {location}", path.display(), warning.message);
            }
            match &outcome.result {
                Ok(()) => println!("{}: ok", path.display()),
                Err(e) => println!("{}: {e}", path.display()),
            }
        }
        OutputFormat::Json => {
            let warnings: Vec<_> = outcome
                .warnings
                .iter()
                .map(|w| json!({ "message": w.message, "location": w.location }))
                .collect();
            let line = json!({
                "file": path.display().to_string(),
                "valid": outcome.result.is_ok(),
                "warnings": warnings,
                "error": outcome.result.as_ref().err().map(ToString::to_string),
            });
            println!("{line}");
        }
    }
}
