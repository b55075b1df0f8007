//! Audit events collected while a transaction is open and emitted once it
//! commits, so a rolled-back call leaves no success events behind.

use carmarket_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use carmarket_core::domain::addon::AddOnProduct;
use carmarket_core::domain::listing::{Listing, ListingId};

pub(crate) struct AuditTrail {
    context: AuditContext,
    pending: Vec<AuditEvent>,
}

impl AuditTrail {
    pub fn new(context: AuditContext) -> Self {
        Self { context, pending: Vec::new() }
    }

    pub fn context(&self) -> &AuditContext {
        &self.context
    }

    pub fn revision(&mut self, event_type: &str, live: &Listing, shadow_id: &ListingId) {
        self.pending.push(
            self.context
                .for_listing(&live.id)
                .event(event_type, AuditCategory::Revision, AuditOutcome::Success)
                .with_metadata("shadow_id", shadow_id)
                .with_metadata("status", live.status),
        );
    }

    pub fn debit(&mut self, listing_id: &ListingId, product: AddOnProduct) {
        self.pending.push(self.ledger("ledger.debit", listing_id, product, AuditOutcome::Success));
    }

    pub fn refunds(&mut self, listing_id: &ListingId, products: &[AddOnProduct]) {
        for product in products {
            self.pending
                .push(self.ledger("ledger.refund", listing_id, *product, AuditOutcome::Success));
        }
    }

    /// Refusals are reported right away; the transaction is about to roll back.
    pub fn refused_debit(
        &self,
        listing_id: &ListingId,
        product: AddOnProduct,
        reason: &dyn std::fmt::Display,
    ) -> AuditEvent {
        self.ledger("ledger.debit_refused", listing_id, product, AuditOutcome::Rejected)
            .with_metadata("error", reason)
    }

    pub fn emit(self, sink: &dyn AuditSink) {
        for event in self.pending {
            sink.emit(event);
        }
    }

    fn ledger(
        &self,
        event_type: &str,
        listing_id: &ListingId,
        product: AddOnProduct,
        outcome: AuditOutcome,
    ) -> AuditEvent {
        self.context
            .for_listing(listing_id)
            .event(event_type, AuditCategory::Ledger, outcome)
            .with_metadata("product", product)
            .with_metadata("amount", 1)
    }
}
