//! `run` command handler
//!
//! Loads configuration, builds the event source and emitter, and drives the
//! spawner until shutdown.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::args::RunArgs;
use crate::config::loader::{ConfigLimits, ConfigLoader};
use crate::config::schema::SpawnerConfig;
use crate::error::SpawnerError;
use crate::observability::events::EventEmitter;
use crate::source::http::{HttpConfig, parse_bind_addr};
use crate::source::{EventSource, HttpSource, StdioSource};
use crate::spawn::RecordingFactory;
use crate::spawner::{Spawner, SpawnerOptions};

/// Run the spawner.
///
/// # Errors
///
/// Returns a config error if the configuration cannot be loaded, an I/O
/// error if the events file cannot be created, or a source error for an
/// unparseable `--http` address.
pub async fn run(args: &RunArgs, cancel: CancellationToken) -> Result<(), SpawnerError> {
    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let config = load_config(args.config.as_deref())?;

    let source: Arc<dyn EventSource> = if let Some(ref bind_addr) = args.http {
        let addr = parse_bind_addr(bind_addr)?;
        Arc::new(HttpSource::new(HttpConfig::new(addr, &config.source)))
    } else {
        Arc::new(StdioSource::new(&config.source))
    };

    let event_emitter = Arc::new(if let Some(ref path) = args.events_file {
        EventEmitter::from_file(path)?
    } else {
        EventEmitter::stderr()
    });

    let mut spawner = Spawner::new(SpawnerOptions {
        factory: RecordingFactory::new(Arc::clone(&event_emitter)),
        config,
        source,
        event_emitter,
        seed: args.seed,
        cancel,
    });
    spawner.run().await
}

/// Loads `path`, or falls back to the built-in defaults.
fn load_config(path: Option<&Path>) -> Result<Arc<SpawnerConfig>, SpawnerError> {
    let Some(path) = path else {
        tracing::info!("no configuration file given; using defaults");
        return Ok(Arc::new(SpawnerConfig::default()));
    };

    tracing::info!(config = %path.display(), "loading configuration");
    let loader = ConfigLoader::new(ConfigLimits::default());
    let load_result = loader.load(path)?;

    for warning in &load_result.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }

    Ok(load_result.config)
}
