use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::domain::listing::ListingStatus;
use crate::domain::owner::OwnerId;
use crate::errors::DomainError;
use crate::lifecycle::states::{
    ActorKind, DirectOperation, TransitionEffect, TransitionOutcome, TransitionRequest,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("{actor} may not move a listing from {from} to {requested}")]
    TransitionRejected { from: ListingStatus, requested: ListingStatus, actor: ActorKind },
    #[error("{op} is not allowed while the listing is {from}", op = .operation.as_str())]
    OperationRejected { operation: DirectOperation, from: ListingStatus },
}

/// Destinations an owner may request from `current`.
///
/// PUBLISHED -> PENDING_EDIT_APPROVAL is further conditioned on modified
/// attachments; without them the listing stays PUBLISHED.
pub fn owner_targets(current: ListingStatus) -> &'static [ListingStatus] {
    use ListingStatus::*;

    match current {
        Draft => &[Draft, PendingApproval],
        ActionRequired => &[PendingApproval],
        Published => &[PendingEditApproval],
        NeedAction => &[PendingEditApproval],
        PendingApproval | PendingEditApproval | NotApproved | Reserved | SoldOut | Expired
        | Deleted => &[],
    }
}

/// Destinations a reviewer may request from `current`.
pub fn reviewer_targets(current: ListingStatus) -> &'static [ListingStatus] {
    use ListingStatus::*;

    match current {
        Draft => &[Draft, Published],
        PendingApproval => &[ActionRequired, Published, NotApproved],
        ActionRequired => &[Published],
        Published => &[Published],
        PendingEditApproval => &[NeedAction, Published, NotApproved],
        NeedAction => &[Published],
        NotApproved | Reserved | SoldOut | Expired | Deleted => &[],
    }
}

/// Rejects publishing when the owner's other active listings already fill the limit.
pub fn ensure_post_slot(owner_id: &OwnerId, active: u32, limit: u32) -> Result<(), DomainError> {
    if active >= limit {
        return Err(DomainError::LimitExceeded { owner_id: owner_id.clone(), active, limit });
    }
    Ok(())
}

#[derive(Clone, Debug, Default)]
pub struct LifecycleEngine;

impl LifecycleEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, request: &TransitionRequest) -> Result<TransitionOutcome, LifecycleError> {
        let targets = match request.actor {
            ActorKind::Owner => owner_targets(request.current),
            ActorKind::Reviewer => reviewer_targets(request.current),
        };

        if !targets.contains(&request.requested) {
            return Err(LifecycleError::TransitionRejected {
                from: request.current,
                requested: request.requested,
                actor: request.actor,
            });
        }

        let to = match (request.actor, request.current, request.requested) {
            (ActorKind::Owner, ListingStatus::Published, ListingStatus::PendingEditApproval)
                if !request.has_modified_attachments =>
            {
                ListingStatus::Published
            }
            (_, _, requested) => requested,
        };

        Ok(TransitionOutcome {
            from: request.current,
            to,
            actor: request.actor,
            effects: table_effects(request.current, to),
        })
    }

    pub fn apply_direct(
        &self,
        operation: DirectOperation,
        current: ListingStatus,
    ) -> Result<TransitionOutcome, LifecycleError> {
        if !operation.allowed_from().contains(&current) {
            return Err(LifecycleError::OperationRejected { operation, from: current });
        }

        Ok(TransitionOutcome {
            from: current,
            to: operation.target(),
            actor: operation.actor(),
            effects: operation_effects(operation, current),
        })
    }

    pub fn apply_with_audit<S>(
        &self,
        request: &TransitionRequest,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, LifecycleError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(request);
        emit_outcome(sink, audit, &result, format!("{}->{}", request.current, request.requested));
        result
    }

    pub fn apply_direct_with_audit<S>(
        &self,
        operation: DirectOperation,
        current: ListingStatus,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, LifecycleError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply_direct(operation, current);
        emit_outcome(sink, audit, &result, operation.as_str().to_string());
        result
    }
}

fn emit_outcome<S>(
    sink: &S,
    audit: &AuditContext,
    result: &Result<TransitionOutcome, LifecycleError>,
    request: String,
) where
    S: AuditSink + ?Sized,
{
    let event = match result {
        Ok(outcome) => audit
            .event("listing.transition_applied", AuditCategory::Lifecycle, AuditOutcome::Success)
            .with_metadata("from", outcome.from)
            .with_metadata("to", outcome.to)
            .with_metadata("actor_kind", outcome.actor.as_str()),
        Err(error) => audit
            .event("listing.transition_rejected", AuditCategory::Lifecycle, AuditOutcome::Rejected)
            .with_metadata("error", error),
    };
    sink.emit(event.with_metadata("request", request));
}

fn table_effects(from: ListingStatus, to: ListingStatus) -> Vec<TransitionEffect> {
    use TransitionEffect::*;

    if from == to {
        return Vec::new();
    }

    match to {
        ListingStatus::PendingApproval | ListingStatus::PendingEditApproval => {
            vec![StampSubmitted]
        }
        ListingStatus::Published => vec![CheckPostLimit, StampPublished, ActivateIntents],
        ListingStatus::NotApproved => vec![StampRejected, RefundIntents],
        _ => Vec::new(),
    }
}

fn operation_effects(operation: DirectOperation, from: ListingStatus) -> Vec<TransitionEffect> {
    use TransitionEffect::*;

    match operation {
        DirectOperation::Unpublish => vec![ClearPublishMetadata, RemoveBookmarks],
        DirectOperation::Republish | DirectOperation::Publish => {
            vec![CheckPostLimit, StampPublished, ActivateIntents]
        }
        DirectOperation::Reserve => vec![StampReserved],
        DirectOperation::Unreserve => vec![ClearReserved],
        DirectOperation::Sell => vec![StampSold],
        DirectOperation::Recover => vec![ClearDumped],
        DirectOperation::Pending => vec![StampSubmitted],
        DirectOperation::Cancel if from == ListingStatus::PendingApproval => Vec::new(),
        DirectOperation::Cancel => vec![RefundIntents],
        DirectOperation::MoveToBin => vec![RefundIntents, StampDumped],
    }
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::domain::listing::{ListingId, ListingStatus};
    use crate::domain::owner::OwnerId;
    use crate::errors::DomainError;
    use crate::lifecycle::engine::{
        ensure_post_slot, owner_targets, reviewer_targets, LifecycleEngine, LifecycleError,
    };
    use crate::lifecycle::states::{
        ActorKind, DirectOperation, TransitionEffect, TransitionRequest,
    };

    use ListingStatus::*;

    fn expected_owner(current: ListingStatus) -> Vec<ListingStatus> {
        match current {
            Draft => vec![Draft, PendingApproval],
            ActionRequired => vec![PendingApproval],
            Published => vec![PendingEditApproval],
            NeedAction => vec![PendingEditApproval],
            _ => vec![],
        }
    }

    fn expected_reviewer(current: ListingStatus) -> Vec<ListingStatus> {
        match current {
            Draft => vec![Draft, Published],
            PendingApproval => vec![ActionRequired, Published, NotApproved],
            ActionRequired => vec![Published],
            Published => vec![Published],
            PendingEditApproval => vec![NeedAction, Published, NotApproved],
            NeedAction => vec![Published],
            _ => vec![],
        }
    }

    #[test]
    fn every_status_pair_matches_the_actor_tables() {
        let engine = LifecycleEngine::new();

        for actor in [ActorKind::Owner, ActorKind::Reviewer] {
            for current in ListingStatus::ALL {
                let allowed = match actor {
                    ActorKind::Owner => expected_owner(current),
                    ActorKind::Reviewer => expected_reviewer(current),
                };
                for requested in ListingStatus::ALL {
                    let request = TransitionRequest::new(current, requested, actor)
                        .with_modified_attachments(true);
                    let result = engine.apply(&request);
                    if allowed.contains(&requested) {
                        let outcome = result.unwrap_or_else(|error| {
                            panic!("{actor} {current}->{requested} should pass: {error}")
                        });
                        assert_eq!(outcome.to, requested);
                    } else {
                        assert_eq!(
                            result,
                            Err(LifecycleError::TransitionRejected { from: current, requested, actor }),
                            "{actor} {current}->{requested} should be rejected"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn tables_expose_the_same_sets_as_the_engine() {
        for current in ListingStatus::ALL {
            assert_eq!(owner_targets(current).to_vec(), expected_owner(current));
            assert_eq!(reviewer_targets(current).to_vec(), expected_reviewer(current));
        }
    }

    #[test]
    fn owner_edit_without_new_attachments_stays_published() {
        let engine = LifecycleEngine::new();
        let outcome = engine
            .apply(&TransitionRequest::new(Published, PendingEditApproval, ActorKind::Owner))
            .expect("owner edit request is accepted");

        assert_eq!(outcome.to, Published);
        assert!(outcome.is_noop());

        let with_attachments = engine
            .apply(
                &TransitionRequest::new(Published, PendingEditApproval, ActorKind::Owner)
                    .with_modified_attachments(true),
            )
            .expect("edit with attachments");
        assert_eq!(with_attachments.to, PendingEditApproval);
        assert!(with_attachments.has_effect(TransitionEffect::StampSubmitted));
    }

    #[test]
    fn reviewer_publish_checks_limit_and_activates_intents() {
        let outcome = LifecycleEngine::new()
            .apply(&TransitionRequest::new(PendingApproval, Published, ActorKind::Reviewer))
            .expect("approve");

        assert_eq!(
            outcome.effects,
            vec![
                TransitionEffect::CheckPostLimit,
                TransitionEffect::StampPublished,
                TransitionEffect::ActivateIntents
            ]
        );
    }

    #[test]
    fn reviewer_rejection_refunds_intents() {
        let outcome = LifecycleEngine::new()
            .apply(&TransitionRequest::new(PendingEditApproval, NotApproved, ActorKind::Reviewer))
            .expect("reject edit");

        assert!(outcome.has_effect(TransitionEffect::RefundIntents));
        assert!(outcome.has_effect(TransitionEffect::StampRejected));
    }

    #[test]
    fn direct_operations_are_gated_on_their_source_statuses() {
        let engine = LifecycleEngine::new();
        let operations = [
            DirectOperation::Unpublish,
            DirectOperation::Republish,
            DirectOperation::Reserve,
            DirectOperation::Unreserve,
            DirectOperation::Sell,
            DirectOperation::Recover,
            DirectOperation::Pending,
            DirectOperation::Cancel,
            DirectOperation::MoveToBin,
            DirectOperation::Publish,
        ];

        for operation in operations {
            for current in ListingStatus::ALL {
                let result = engine.apply_direct(operation, current);
                if operation.allowed_from().contains(&current) {
                    assert_eq!(result.expect("allowed").to, operation.target());
                } else {
                    assert_eq!(
                        result,
                        Err(LifecycleError::OperationRejected { operation, from: current })
                    );
                }
            }
        }
    }

    #[test]
    fn cancel_from_pending_approval_keeps_intents() {
        let engine = LifecycleEngine::new();

        let from_pending =
            engine.apply_direct(DirectOperation::Cancel, PendingApproval).expect("cancel");
        assert!(!from_pending.has_effect(TransitionEffect::RefundIntents));

        let from_action =
            engine.apply_direct(DirectOperation::Cancel, ActionRequired).expect("cancel");
        assert!(from_action.has_effect(TransitionEffect::RefundIntents));
    }

    #[test]
    fn move_to_bin_refunds_before_stamping() {
        let outcome =
            LifecycleEngine::new().apply_direct(DirectOperation::MoveToBin, Draft).expect("bin");
        assert_eq!(
            outcome.effects,
            vec![TransitionEffect::RefundIntents, TransitionEffect::StampDumped]
        );
    }

    #[test]
    fn post_slot_gate_rejects_at_limit() {
        let owner = OwnerId("O-1".to_string());
        assert!(ensure_post_slot(&owner, 4, 5).is_ok());
        assert_eq!(
            ensure_post_slot(&owner, 5, 5),
            Err(DomainError::LimitExceeded { owner_id: owner.clone(), active: 5, limit: 5 })
        );
    }

    #[test]
    fn transitions_emit_audit_events() {
        let engine = LifecycleEngine::new();
        let sink = InMemoryAuditSink::default();
        let audit =
            AuditContext::new(Some(ListingId("L-42".to_string())), "req-42", "reviewer:staff-1");

        let _ = engine
            .apply_with_audit(
                &TransitionRequest::new(PendingApproval, Published, ActorKind::Reviewer),
                &sink,
                &audit,
            )
            .expect("approve");
        let _ = engine
            .apply_direct_with_audit(DirectOperation::Recover, Draft, &sink, &audit)
            .expect_err("recover requires deleted");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "listing.transition_applied");
        assert_eq!(events[0].metadata.get("to").map(String::as_str), Some("published"));
        assert_eq!(events[1].event_type, "listing.transition_rejected");
        assert_eq!(events[1].correlation_id, "req-42");
    }
}
