//! Audit trail for listing lifecycle, pending edits, add-on ledger movements
//! and scheduled sweeps.
//!
//! An [`AuditContext`] pins who acted, on which listing, under which
//! correlation id; every event of one engine call is stamped from it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::listing::ListingId;

const SYSTEM_ACTOR: &str = "system";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Lifecycle,
    Revision,
    Ledger,
    Sweep,
}

impl AuditCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lifecycle => "lifecycle",
            Self::Revision => "revision",
            Self::Ledger => "ledger",
            Self::Sweep => "sweep",
        }
    }
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Rejected,
    /// Completed, but some items failed along the way.
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    pub listing_id: Option<ListingId>,
    pub correlation_id: String,
    pub actor: String,
}

impl AuditContext {
    pub fn new(
        listing_id: Option<ListingId>,
        correlation_id: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self { listing_id, correlation_id: correlation_id.into(), actor: actor.into() }
    }

    /// Context for scheduler-driven work with no acting user.
    pub fn system(correlation_id: impl Into<String>) -> Self {
        Self::new(None, correlation_id, SYSTEM_ACTOR)
    }

    /// Same actor and correlation, pointed at another listing.
    pub fn for_listing(&self, listing_id: &ListingId) -> Self {
        Self { listing_id: Some(listing_id.clone()), ..self.clone() }
    }

    pub fn event(
        &self,
        event_type: impl Into<String>,
        category: AuditCategory,
        outcome: AuditOutcome,
    ) -> AuditEvent {
        AuditEvent {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            category,
            outcome,
            listing_id: self.listing_id.clone(),
            correlation_id: self.correlation_id.clone(),
            actor: self.actor.clone(),
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub category: AuditCategory,
    pub outcome: AuditOutcome,
    pub listing_id: Option<ListingId>,
    pub correlation_id: String,
    pub actor: String,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn with_metadata(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.metadata.insert(key.to_owned(), value.to_string());
        self
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Keeps every event in memory; tests read them back.
#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.lock().clone()
    }

    pub fn events_in(&self, category: AuditCategory) -> Vec<AuditEvent> {
        self.lock().iter().filter(|event| event.category == category).cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AuditEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        self.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::{AuditCategory, AuditContext, AuditOutcome, AuditSink, InMemoryAuditSink};
    use crate::domain::listing::ListingId;

    #[test]
    fn events_inherit_the_context_and_filter_by_category() {
        let sink = InMemoryAuditSink::default();
        let context = AuditContext::new(None, "req-123", "owner:O-7");

        sink.emit(
            context
                .for_listing(&ListingId("L-42".to_owned()))
                .event("ledger.debit", AuditCategory::Ledger, AuditOutcome::Success)
                .with_metadata("product", "bump")
                .with_metadata("amount", 1),
        );
        sink.emit(context.event("listing.created", AuditCategory::Lifecycle, AuditOutcome::Success));

        let ledger = sink.events_in(AuditCategory::Ledger);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].correlation_id, "req-123");
        assert_eq!(ledger[0].actor, "owner:O-7");
        assert_eq!(ledger[0].listing_id, Some(ListingId("L-42".to_owned())));
        assert_eq!(ledger[0].metadata("amount"), Some("1"));
        assert_eq!(sink.events().len(), 2);
        assert!(sink.events()[1].listing_id.is_none());
    }

    #[test]
    fn system_context_has_no_listing() {
        let event = AuditContext::system("sweep-1").event(
            "sweep.completed",
            AuditCategory::Sweep,
            AuditOutcome::Failed,
        );

        assert_eq!(event.actor, "system");
        assert!(event.listing_id.is_none());
        assert_eq!(AuditCategory::Sweep.to_string(), "sweep");
    }
}
