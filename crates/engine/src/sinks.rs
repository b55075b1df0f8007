//! Default outbound adapters that write to the tracing pipeline.
//!
//! Deployments wire real transports; these keep every audit event and
//! email visible in the structured log until then.

use async_trait::async_trait;
use tracing::info;

use carmarket_core::audit::{AuditEvent, AuditSink};
use carmarket_core::ports::{EmailError, EmailSender};

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let listing_id = event.listing_id.as_ref().map(|id| id.0.as_str()).unwrap_or("-");
        info!(
            event_name = "audit.event",
            audit_event_id = %event.event_id,
            audit_event_type = %event.event_type,
            audit_category = %event.category,
            audit_outcome = ?event.outcome,
            listing_id,
            correlation_id = %event.correlation_id,
            actor = %event.actor,
            metadata = ?event.metadata,
            "audit event"
        );
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEmailSender;

#[async_trait]
impl EmailSender for TracingEmailSender {
    async fn send(&self, template: &str, data: serde_json::Value) -> Result<(), EmailError> {
        info!(event_name = "email.sent", template, payload = %data, "email dispatched");
        Ok(())
    }
}
