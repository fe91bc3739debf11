//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check against [`ConfigLimits`]
//! 2. Environment variable expansion (pre-parse, on raw text)
//! 3. YAML parsing
//! 4. Deserialization to typed config
//! 5. Validation
//! 6. Freeze with `Arc`

use crate::config::schema::SpawnerConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// Public API
// ============================================================================

/// Limits applied while loading, to keep a hostile file from exhausting memory.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("SPAWNSTREAM_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<SpawnerConfig>,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Configuration loader.
///
/// Handles the full loading pipeline from YAML file to frozen `SpawnerConfig`.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    limits: ConfigLimits,
}

impl ConfigLoader {
    /// Creates a new configuration loader with the given limits.
    #[must_use]
    pub const fn new(limits: ConfigLimits) -> Self {
        Self { limits }
    }

    /// Loads a configuration file and returns the frozen configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds the size limit
    /// - A required environment variable is unset
    /// - YAML parsing or deserialization fails
    /// - Validation reports errors
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > self.limits.max_config_size {
            return Err(ConfigError::TooLarge {
                size: file_size,
                limit: self.limits.max_config_size,
            });
        }

        let raw_content = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        self.load_str(&raw_content, path)
    }

    /// Runs the pipeline on in-memory YAML text.
    ///
    /// `origin` is only used for error messages and warning locations.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus the file access failures.
    pub fn load_str(&self, raw_content: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let mut warnings = Vec::new();

        if raw_content.len() > self.limits.max_config_size {
            return Err(ConfigError::TooLarge {
                size: raw_content.len(),
                limit: self.limits.max_config_size,
            });
        }

        // Handle UTF-8 BOM
        let raw_content = raw_content.strip_prefix('\u{feff}').unwrap_or(raw_content);

        let mut env_sub = EnvSubstitution::new();
        let substituted = env_sub.substitute(raw_content, origin)?;
        warnings.extend(env_sub.warnings);

        // An empty file is a valid "all defaults" configuration
        let config: SpawnerConfig = if substituted.trim().is_empty() {
            SpawnerConfig::default()
        } else {
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?
        };

        let mut validator = Validator::new();
        let validation_result = validator.validate(&config);

        if validation_result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.display().to_string(),
                errors: validation_result.errors,
            });
        }

        for issue in validation_result.warnings {
            warnings.push(LoadWarning {
                message: issue.message,
                location: Some(issue.path),
            });
        }

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }
}

// ============================================================================
// Environment Substitution
// ============================================================================

/// Expands environment variable references in raw YAML text.
struct EnvSubstitution {
    warnings: Vec<LoadWarning>,
}

impl EnvSubstitution {
    const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Substitutes environment variables in raw YAML text.
    ///
    /// Supports:
    /// - `${VAR}` - expand to value (empty string if unset with warning)
    /// - `${VAR:-default}` - expand to default if unset
    /// - `${VAR:?message}` - fail if unset
    /// - `$$` - literal `$`
    fn substitute(&mut self, raw_yaml: &str, source_path: &Path) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(raw_yaml.len());
        let mut chars = raw_yaml.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let spec = parse_var_spec(&mut chars, source_path)?;
                    match std::env::var(&spec.name) {
                        Ok(value) => result.push_str(&value),
                        Err(_) => match spec.fallback {
                            Fallback::Default(default) => result.push_str(&default),
                            Fallback::Required(message) => {
                                return Err(ConfigError::EnvVarNotSet {
                                    var: spec.name,
                                    location: message,
                                });
                            }
                            Fallback::Empty => {
                                self.warnings.push(LoadWarning {
                                    message: format!(
                                        "Environment variable '{}' is not set, using empty string",
                                        spec.name
                                    ),
                                    location: Some(source_path.display().to_string()),
                                });
                            }
                        },
                    }
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }
}

/// What to do when a referenced variable is unset.
enum Fallback {
    Empty,
    Default(String),
    Required(String),
}

struct VarSpec {
    name: String,
    fallback: Fallback,
}

/// Parses the body of a `${...}` reference; the opening brace is consumed.
fn parse_var_spec(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    source_path: &Path,
) -> Result<VarSpec, ConfigError> {
    let mut name = String::new();

    while let Some(c) = chars.next() {
        match c {
            '}' => {
                return Ok(VarSpec {
                    name,
                    fallback: Fallback::Empty,
                });
            }
            ':' => match chars.peek() {
                Some('-') => {
                    chars.next();
                    let default = read_until_close(chars, source_path)?;
                    return Ok(VarSpec {
                        name,
                        fallback: Fallback::Default(default),
                    });
                }
                Some('?') => {
                    chars.next();
                    let message = read_until_close(chars, source_path)?;
                    return Ok(VarSpec {
                        name,
                        fallback: Fallback::Required(message),
                    });
                }
                _ => name.push(':'),
            },
            _ => name.push(c),
        }
    }

    Err(unclosed(source_path, &name))
}

/// Reads content until the closing `}`, keeping nested braces balanced.
fn read_until_close(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    source_path: &Path,
) -> Result<String, ConfigError> {
    let mut value = String::new();
    let mut depth = 1;

    for c in chars.by_ref() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(value);
                }
            }
            _ => {}
        }
        value.push(c);
    }

    Err(unclosed(source_path, &value))
}

fn unclosed(source_path: &Path, fragment: &str) -> ConfigError {
    ConfigError::ParseError {
        path: PathBuf::from(source_path),
        line: None,
        message: format!("Unclosed environment variable reference: ${{{fragment}"),
    }
}

/// Reads a numeric limit from the environment, falling back to `default`.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================
