//! Diagnostic sink port.
//!
//! The sink is purely observational: the reconciler calls it at fixed points
//! and never inspects the outcome.

use serde_json::Value;

/// Receives labelled diagnostic traces from the reconciler.
pub trait DebugSink: Send + Sync {
    /// Record one trace.
    fn debug(&self, label: &str, data: &Value);
}

/// Sink that discards every trace. Used when no sink is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDebugSink;

impl DebugSink for NoopDebugSink {
    fn debug(&self, _label: &str, _data: &Value) {}
}

/// Sink that forwards traces to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDebugSink;

impl DebugSink for TracingDebugSink {
    fn debug(&self, label: &str, data: &Value) {
        tracing::debug!(target: "bearer_login::debug", %label, %data);
    }
}
