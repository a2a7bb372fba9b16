use quoteline_core::{AuditEvent, AuditOutcome, AuditSink};
use tracing::{info, warn};

/// Mirrors audit events into the structured log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let metadata = event
            .metadata
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ");

        match event.outcome {
            AuditOutcome::Success | AuditOutcome::Degraded => info!(
                event_name = "audit.event",
                audit_event = %event.event_type,
                correlation_id = %event.correlation_id,
                category = ?event.category,
                outcome = ?event.outcome,
                actor = %event.actor,
                metadata = %metadata,
                "audit"
            ),
            AuditOutcome::Rejected | AuditOutcome::Failed => warn!(
                event_name = "audit.event",
                audit_event = %event.event_type,
                correlation_id = %event.correlation_id,
                category = ?event.category,
                outcome = ?event.outcome,
                actor = %event.actor,
                metadata = %metadata,
                "audit"
            ),
        }
    }
}
