//! Telemetry sink
//!
//! Invocations and upstream calls are reported to a [`TelemetrySink`]. Sinks are
//! shared between concurrent invocations, so `record` takes `&self` and must not
//! depend on ordering between reports.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::ErrorKind;

/// A single telemetry record
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// A tool call arrived
    ToolInvoked { tool: String, project: String },

    /// One upstream HTTP exchange finished
    Dependency {
        name: String,
        target: String,
        project: String,
        duration: Duration,
        success: bool,
        /// `0` when no response was received
        status: u16,
    },

    /// A tool call finished, successfully or not
    ToolCompleted {
        tool: String,
        project: String,
        duration: Duration,
        success: bool,
        error_kind: Option<ErrorKind>,
    },
}

/// Append-only destination for telemetry
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Emits events as structured `tracing` records
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record(&self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::ToolInvoked { tool, project } => {
                tracing::info!(target: "ado_telemetry", %tool, %project, "tool invoked");
            }
            TelemetryEvent::Dependency {
                name,
                target,
                project,
                duration,
                success,
                status,
            } => {
                let duration_ms = duration.as_millis() as u64;
                if success {
                    tracing::debug!(target: "ado_telemetry", %name, %target, %project, status, duration_ms, "dependency ok");
                } else {
                    tracing::warn!(target: "ado_telemetry", %name, %target, %project, status, duration_ms, "dependency failed");
                }
            }
            TelemetryEvent::ToolCompleted {
                tool,
                project,
                duration,
                success,
                error_kind,
            } => {
                let duration_ms = duration.as_millis() as u64;
                match error_kind {
                    Some(kind) => {
                        tracing::warn!(target: "ado_telemetry", %tool, %project, success, duration_ms, error_kind = %kind, "tool completed")
                    }
                    None => {
                        tracing::info!(target: "ado_telemetry", %tool, %project, success, duration_ms, "tool completed")
                    }
                }
            }
        }
    }
}

/// Forwards events over an unbounded channel
///
/// Sending never blocks and needs no lock, so any number of invocations can
/// report through clones of the same sink.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<TelemetryEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TelemetryEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl TelemetrySink for ChannelSink {
    fn record(&self, event: TelemetryEvent) {
        // A dropped receiver only means nobody is listening any more
        let _ = self.sender.send(event);
    }
}
