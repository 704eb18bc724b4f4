//! Metrics definitions for Clipboard Hub.
//!
//! All metrics follow Prometheus naming conventions:
//! - `hub_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `operation`: upsert, remove
//! - `event`: the five outbound event names
//! - `outcome`: accepted, rejected / success, not_found / applied, invalid
//! - `source`: kick, admin

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder and return the handle
/// used to render `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

/// Record a clipboard mutation.
pub fn record_content_mutation(operation: &'static str) {
    counter!("hub_content_mutations_total", "operation" => operation).increment(1);
}

/// Record one fanout of an event and how many channels it reached.
pub fn record_broadcast(event: &'static str, recipients: usize) {
    counter!("hub_broadcasts_total", "event" => event).increment(1);
    counter!("hub_broadcast_deliveries_total", "event" => event).increment(recipients as u64);
}

/// Record an admission decision.
pub fn record_admission(outcome: &'static str) {
    counter!("hub_admissions_total", "outcome" => outcome).increment(1);
}

/// Record a targeted kick attempt.
pub fn record_kick(outcome: &'static str) {
    counter!("hub_kicks_total", "outcome" => outcome).increment(1);
}

/// Record a denylist write.
pub fn record_ban(source: &'static str, outcome: &'static str) {
    counter!("hub_bans_total", "source" => source, "outcome" => outcome).increment(1);
}

/// Record channels force-closed by the hub.
pub fn record_forced_closes(count: usize) {
    counter!("hub_forced_closes_total").increment(count as u64);
}

/// Current number of registered sessions.
#[allow(clippy::cast_precision_loss)]
pub fn set_connected_sessions(count: usize) {
    gauge!("hub_connected_sessions").set(count as f64);
}

/// Current number of denylist entries (active or awaiting eviction).
#[allow(clippy::cast_precision_loss)]
pub fn set_denylist_entries(count: usize) {
    gauge!("hub_denylist_entries").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Without an installed recorder the macros are no-ops; these tests
    // only check that recording never panics.
    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_content_mutation("upsert");
        record_broadcast("clipboard-updated", 3);
        record_admission("accepted");
        record_kick("not_found");
        record_ban("admin", "applied");
        record_forced_closes(2);
        set_connected_sessions(4);
        set_denylist_entries(1);
    }

    #[test]
    fn test_metric_names_are_prefixed() {
        use metrics_util::debugging::DebuggingRecorder;

        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        // Local recorder keeps this test independent of global state.
        metrics::with_local_recorder(&recorder, || {
            record_content_mutation("remove");
            record_broadcast("devices-updated", 2);
            record_admission("rejected");
            record_kick("success");
            record_ban("kick", "applied");
            record_forced_closes(1);
            set_connected_sessions(3);
            set_denylist_entries(2);
        });

        let names: Vec<String> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _, _, _)| key.key().name().to_string())
            .collect();

        assert!(names.len() >= 9, "got {names:?}");
        assert!(names.iter().all(|name| name.starts_with("hub_")));
        assert!(names.iter().any(|name| name == "hub_broadcast_deliveries_total"));
    }
}
