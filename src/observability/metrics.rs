//! Metrics collection for the spawner.
//!
//! Prometheus-compatible counters and gauges with typed convenience
//! functions. Label values are `&'static str` drawn from fixed sets, so
//! stream content can never create new label values.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::SpawnerError;
use crate::phase::Phase;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// How a single stream event was handled, used as the `outcome` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Phase signal, reset, or resume that the controller acted on
    Applied,
    /// Integer outside the signal set
    Ignored,
    /// Payload that could not be read as an integer
    Rejected,
}

impl EventOutcome {
    const fn as_label(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Ignored => "ignored",
            Self::Rejected => "rejected",
        }
    }
}

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without
/// an HTTP endpoint.
///
/// # Errors
///
/// Returns `SpawnerError::Io` if the recorder or HTTP listener
/// cannot be installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), SpawnerError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| SpawnerError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "spawnstream_items_spawned_total",
        "Total number of items spawned"
    );
    describe_counter!(
        "spawnstream_items_destroyed_total",
        "Total number of items destroyed, by reason"
    );
    describe_counter!(
        "spawnstream_events_total",
        "Total number of stream events, by outcome"
    );
    describe_counter!("spawnstream_resets_total", "Total number of hard resets");
    describe_gauge!("spawnstream_current_phase", "Current phase index (0 = idle)");
    describe_gauge!("spawnstream_live_items", "Number of live items");
    describe_gauge!("spawnstream_spawning", "1 while spawning is enabled");
}

/// Records one spawned item.
pub fn record_spawn() {
    counter!("spawnstream_items_spawned_total").increment(1);
}

/// Records a batch of destroyed items.
pub fn record_destroyed(reason: &'static str, count: usize) {
    counter!("spawnstream_items_destroyed_total", "reason" => reason)
        .increment(u64::try_from(count).unwrap_or(u64::MAX));
}

/// Records one stream event and how it was handled.
pub fn record_event(outcome: EventOutcome) {
    counter!("spawnstream_events_total", "outcome" => outcome.as_label()).increment(1);
}

/// Records a hard reset.
pub fn record_reset() {
    counter!("spawnstream_resets_total").increment(1);
}

/// Sets the current phase gauge.
pub fn set_current_phase(phase: Phase) {
    gauge!("spawnstream_current_phase").set(f64::from(phase.index()));
}

/// Sets the live item gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_live_items(count: usize) {
    gauge!("spawnstream_live_items").set(count as f64);
}

/// Sets the spawning gauge.
pub fn set_spawning(spawning: bool) {
    gauge!("spawnstream_spawning").set(if spawning { 1.0 } else { 0.0 });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_labels_are_fixed() {
        assert_eq!(EventOutcome::Applied.as_label(), "applied");
        assert_eq!(EventOutcome::Ignored.as_label(), "ignored");
        assert_eq!(EventOutcome::Rejected.as_label(), "rejected");
    }

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        // metrics macros silently no-op when no global recorder is installed
        record_spawn();
        record_destroyed("delete_half", 3);
        record_event(EventOutcome::Applied);
        record_event(EventOutcome::Rejected);
        record_reset();
        set_current_phase(Phase::Two);
        set_live_items(12);
        set_spawning(false);
    }
}
