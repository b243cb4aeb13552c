//! Telemetry hook for flow transitions.
//!
//! Analytics events are fire-and-forget: a sink must never block or fail the
//! flow. Event names come from the provider table, see
//! [`ProviderProfile::event_name`](crate::provider::ProviderProfile::event_name).

use std::sync::Arc;

/// Flow transitions that emit an analytics event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowEvent {
    Started,
    Failed,
    Canceled,
    Succeeded,
}

/// Receiver of analytics events.
pub trait AnalyticsSink: Send + Sync {
    fn emit(&self, event_name: &str);
}

impl<T: AnalyticsSink + ?Sized> AnalyticsSink for Arc<T> {
    fn emit(&self, event_name: &str) {
        self.as_ref().emit(event_name)
    }
}

/// Forwards analytics events to `tracing` under the `payswitch::analytics` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn emit(&self, event_name: &str) {
        tracing::info!(target: "payswitch::analytics", event = event_name, "analytics event");
    }
}
