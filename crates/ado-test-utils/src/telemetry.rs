//! [`RecordingSink`] captures telemetry for assertions.

use std::sync::Mutex;

use ado_core::{ChannelSink, TelemetryEvent, TelemetrySink};
use tokio::sync::mpsc::UnboundedReceiver;

/// Telemetry sink that keeps every event.
///
/// Writes go through a [`ChannelSink`]; only draining takes the lock.
pub struct RecordingSink {
    sink: ChannelSink,
    receiver: Mutex<UnboundedReceiver<TelemetryEvent>>,
    drained: Mutex<Vec<TelemetryEvent>>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSink {
    pub fn new() -> Self {
        let (sink, receiver) = ChannelSink::new();
        Self {
            sink,
            receiver: Mutex::new(receiver),
            drained: Mutex::new(Vec::new()),
        }
    }

    /// All events recorded so far, in arrival order.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        let mut receiver = self.receiver.lock().unwrap();
        let mut drained = self.drained.lock().unwrap();
        while let Ok(event) = receiver.try_recv() {
            drained.push(event);
        }
        drained.clone()
    }

    /// Only the `Dependency` events.
    pub fn dependencies(&self) -> Vec<TelemetryEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, TelemetryEvent::Dependency { .. }))
            .collect()
    }

    /// Only the `ToolCompleted` events.
    pub fn completions(&self) -> Vec<TelemetryEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, TelemetryEvent::ToolCompleted { .. }))
            .collect()
    }
}

impl TelemetrySink for RecordingSink {
    fn record(&self, event: TelemetryEvent) {
        self.sink.record(event);
    }
}
