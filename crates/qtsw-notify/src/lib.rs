//! Priority-tagged alert sink implementations. The trait itself
//! (`NotificationSink`, `Priority`) lives in `qtsw_schemas` alongside the
//! rest of the shared data model; this crate supplies the two concrete
//! sinks the rest of the workspace wires up.

use std::sync::Mutex;

use qtsw_schemas::{EventSink, ExecutionEvent, NotificationSink, Priority, Severity};

/// Default production sink: routes every notification through `tracing`
/// at a level matching its priority, matching `mqk-daemon`'s
/// direct-`tracing`-no-facade discipline (no separate alerting crate).
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, priority: Priority, message: &str) {
        match priority {
            Priority::Info => tracing::info!(target: "qtsw::notify", "{message}"),
            Priority::Warning => tracing::warn!(target: "qtsw::notify", "{message}"),
            Priority::Emergency => tracing::error!(target: "qtsw::notify", priority = "emergency", "{message}"),
        }
    }
}

/// Test double that records every notification instead of emitting it,
/// grounded on `mqk-broker-paper`'s deterministic in-memory test doubles.
#[derive(Default)]
pub struct RecordingNotificationSink {
    notifications: Mutex<Vec<(Priority, String)>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<(Priority, String)> {
        std::mem::take(&mut self.notifications.lock().expect("recording sink mutex poisoned"))
    }

    pub fn emergency_count(&self) -> usize {
        self.notifications
            .lock()
            .expect("recording sink mutex poisoned")
            .iter()
            .filter(|(p, _)| *p == Priority::Emergency)
            .count()
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn notify(&self, priority: Priority, message: &str) {
        self.notifications
            .lock()
            .expect("recording sink mutex poisoned")
            .push((priority, message.to_string()));
    }
}

/// Default production event sink: every taxonomy event goes
/// through `tracing::event!` at the level its [`ExecutionEvent::severity`]
/// names, carrying the bare event name and its structured fields as a JSON
/// blob so the event name stays grep-able in the rendered log line
/// (`event="ORDER_SUBMITTED" fields={...}`). `tracing::event!` requires a
/// compile-time level, so the match below is the dispatch this crate
/// needs in place of a dynamic-level API.
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: ExecutionEvent) {
        let name = event.name();
        let fields = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        match event.severity() {
            Severity::Info => tracing::info!(target: "qtsw::execution", event = name, fields = %fields, "{name}"),
            Severity::Warn => tracing::warn!(target: "qtsw::execution", event = name, fields = %fields, "{name}"),
            Severity::Error => tracing::error!(target: "qtsw::execution", event = name, fields = %fields, "{name}"),
        }
    }
}

/// Test double that records every event instead of emitting it, grounded
/// on `mqk-broker-paper`'s deterministic in-memory test doubles.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<ExecutionEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<ExecutionEvent> {
        std::mem::take(&mut self.events.lock().expect("recording sink mutex poisoned"))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().expect("recording sink mutex poisoned").iter().map(|e| e.name()).collect()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: ExecutionEvent) {
        self.events.lock().expect("recording sink mutex poisoned").push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_counts_emergencies() {
        let sink = RecordingNotificationSink::new();
        sink.notify(Priority::Info, "routine");
        sink.notify(Priority::Emergency, "flatten failed");
        assert_eq!(sink.emergency_count(), 1);
        assert_eq!(sink.drain().len(), 2);
        assert_eq!(sink.emergency_count(), 0);
    }

    #[test]
    fn recording_event_sink_preserves_taxonomy_names() {
        let sink = RecordingEventSink::new();
        sink.emit(ExecutionEvent::KillSwitchActive { reason: "blocked intent abc123".to_string() });
        sink.emit(ExecutionEvent::OrderSubmitted { intent_id: "abc123".to_string(), broker_order_id: "o-1".to_string() });
        assert_eq!(sink.names(), vec!["KILL_SWITCH_ACTIVE", "ORDER_SUBMITTED"]);
        assert_eq!(sink.drain().len(), 2);
        assert!(sink.names().is_empty());
    }

    #[test]
    fn tracing_event_sink_does_not_panic_on_every_severity() {
        let sink = TracingEventSink;
        sink.emit(ExecutionEvent::OrderSubmitted { intent_id: "abc".to_string(), broker_order_id: "o-1".to_string() });
        sink.emit(ExecutionEvent::OrderRejected { intent_id: "abc".to_string(), reason: "no liquidity".to_string() });
        sink.emit(ExecutionEvent::PositionFlattenFailClosed { intent_id: "abc".to_string(), reason: "broker down".to_string() });
    }
}
