//! Transactional entry points for listing owners and reviewers.
//!
//! Every public operation opens one transaction, resolves the addressed row
//! (live row or its pending edit), runs the lifecycle tables, applies the
//! resulting effects and commits. Emails go out only after commit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use carmarket_core::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use carmarket_core::config::MatchingConfig;
use carmarket_core::domain::addon::AddOnProduct;
use carmarket_core::domain::listing::{
    LifecycleTimestamps, Listing, ListingChanges, ListingId, ListingStatus, ListingVersion,
    PendingIntents, Promotion, ShadowListing,
};
use carmarket_core::domain::owner::{Owner, OwnerId};
use carmarket_core::errors::DomainError;
use carmarket_core::lifecycle::{
    ensure_post_slot, ActorKind, DirectOperation, LifecycleEngine, TransitionEffect,
    TransitionOutcome, TransitionRequest,
};
use carmarket_core::ports::EmailSender;
use carmarket_db::repositories::{bookmark, listing, owner, revision as revision_links, uid};
use carmarket_db::{DbConnection, DbPool, ListingRepository, SqlListingRepository};

use crate::activation::{self, IssuedVoucher};
use crate::matcher::SimilarListingMatcher;
use crate::sinks::{TracingAuditSink, TracingEmailSender};
use crate::trail::AuditTrail;
use crate::{ledger, now, revision, Actor, EngineError};

/// Input for a brand-new listing.
#[derive(Clone, Debug, PartialEq)]
pub struct NewListing {
    pub owner_id: OwnerId,
    pub changes: ListingChanges,
    /// Owners submit for review; reviewers publish directly.
    pub submit: bool,
}

#[derive(Clone)]
pub struct ListingService {
    pool: DbPool,
    listings: Arc<dyn ListingRepository>,
    matching: MatchingConfig,
    engine: LifecycleEngine,
    emails: Arc<dyn EmailSender>,
    audit: Arc<dyn AuditSink>,
}

impl ListingService {
    pub fn new(pool: DbPool, matching: MatchingConfig) -> Self {
        Self {
            listings: Arc::new(SqlListingRepository::new(pool.clone())),
            pool,
            matching,
            engine: LifecycleEngine::new(),
            emails: Arc::new(TracingEmailSender),
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_email_sender(mut self, emails: Arc<dyn EmailSender>) -> Self {
        self.emails = emails;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Reads one row, live or pending edit. Owners cannot see other owners' rows.
    pub async fn find_listing(&self, id: &ListingId, actor: &Actor) -> Result<Listing, EngineError> {
        let listing =
            self.listings.find_by_id(id).await?.ok_or_else(|| DomainError::listing_not_found(id))?;
        actor.ensure_can_see(&listing)?;
        Ok(listing)
    }

    /// Current versions of one owner's listings, newest first.
    pub async fn listings_for_owner(
        &self,
        owner_id: &OwnerId,
        actor: &Actor,
    ) -> Result<Vec<Listing>, EngineError> {
        if matches!(actor, Actor::Owner(caller) if caller != owner_id) {
            return Err(DomainError::owner_not_found(owner_id).into());
        }
        Ok(self.listings.list_for_owner(owner_id).await?)
    }

    pub async fn create_listing(
        &self,
        actor: &Actor,
        input: NewListing,
    ) -> Result<Listing, EngineError> {
        if let Actor::Owner(owner_id) = actor {
            if *owner_id != input.owner_id {
                return Err(DomainError::owner_not_found(&input.owner_id).into());
            }
        }

        let status = match (actor.kind(), input.submit) {
            (_, false) => ListingStatus::Draft,
            (ActorKind::Owner, true) => ListingStatus::PendingApproval,
            (ActorKind::Reviewer, true) => ListingStatus::Published,
        };
        let now = now();

        let mut tx = self.pool.begin().await?;
        let owner = load_owner(&mut tx, &input.owner_id).await?;

        if status == ListingStatus::Published {
            let active = listing::count_post_slots(&mut tx, &owner.id, &[]).await?;
            ensure_post_slot(&owner.id, active, owner.post_limit)?;
        }

        let allocated =
            uid::allocate_listing_uid(&mut tx, &owner, &input.changes.attributes).await?;
        let ListingChanges { attributes, pricing, attachments } = input.changes;
        let created = Listing {
            id: ListingId::generate(),
            uid: allocated.code,
            owner_id: owner.id.clone(),
            status,
            is_current_version: true,
            is_under_revision: false,
            intents: PendingIntents::default(),
            promotion: Promotion::default(),
            timestamps: LifecycleTimestamps {
                submitted_at: (status != ListingStatus::Draft).then_some(now),
                published_at: (status == ListingStatus::Published).then_some(now),
                ..Default::default()
            },
            pricing,
            attributes,
            attachments,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        listing::insert(&mut tx, &created).await?;
        tx.commit().await?;

        self.audit.emit(
            self.audit_context(&created, actor)
                .event("listing.created", AuditCategory::Lifecycle, AuditOutcome::Success)
                .with_metadata("status", status)
                .with_metadata("uid", &created.uid),
        );
        info!(
            event_name = "listing.created",
            listing_id = %created.id,
            owner_id = %created.owner_id,
            uid = %created.uid,
            status = %created.status,
            "listing created"
        );
        Ok(created)
    }

    /// Edits a listing. Published listings with a new attachment set get a
    /// pending-edit shadow instead of changing in place.
    pub async fn update_listing(
        &self,
        id: &ListingId,
        changes: ListingChanges,
        actor: &Actor,
    ) -> Result<ListingVersion, EngineError> {
        let now = now();
        let mut tx = self.pool.begin().await?;
        let Resolved { mut live, shadow } = resolve(&mut tx, id).await?;
        actor.ensure_can_see(&live)?;
        if actor.kind() != ActorKind::Owner {
            return Err(invalid_state(&live, "update", actor.kind()));
        }
        let mut trail = AuditTrail::new(self.audit_context(&live, actor));

        let version = match shadow {
            Some(ShadowListing { link, listing: mut shadow })
                if shadow.status == ListingStatus::NeedAction =>
            {
                shadow.apply_changes(changes, now);
                listing::update(&mut tx, &shadow).await?;
                ListingVersion::Shadow(ShadowListing { link, listing: shadow })
            }
            Some(_) => {
                return Err(DomainError::Conflict {
                    id: live.id.0.clone(),
                    reason: "listing is already under revision".to_string(),
                }
                .into());
            }
            None => match live.status {
                ListingStatus::Published => {
                    let request = TransitionRequest::new(
                        ListingStatus::Published,
                        ListingStatus::PendingEditApproval,
                        ActorKind::Owner,
                    )
                    .with_modified_attachments(live.has_modified_attachments(&changes.attachments));
                    let outcome = self
                        .engine
                        .apply_with_audit(&request, self.audit.as_ref(), trail.context())
                        .map_err(|error| DomainError::from_lifecycle(&live.id, error))?;

                    if outcome.to == ListingStatus::PendingEditApproval {
                        let shadow = revision::create_shadow(&mut tx, &mut live, changes, now).await?;
                        trail.revision("revision.created", &live, &shadow.listing.id);
                        ListingVersion::Shadow(shadow)
                    } else {
                        live.apply_changes(changes, now);
                        listing::update(&mut tx, &live).await?;
                        ListingVersion::Current(live)
                    }
                }
                ListingStatus::Draft | ListingStatus::ActionRequired | ListingStatus::NotApproved => {
                    live.apply_changes(changes, now);
                    listing::update(&mut tx, &live).await?;
                    ListingVersion::Current(live)
                }
                _ => return Err(invalid_state(&live, "update", actor.kind())),
            },
        };

        tx.commit().await?;
        trail.emit(self.audit.as_ref());
        Ok(version)
    }

    /// Runs the owner or reviewer transition table. A live row under revision
    /// is reviewed through its shadow.
    pub async fn transition(
        &self,
        id: &ListingId,
        requested: ListingStatus,
        actor: &Actor,
    ) -> Result<ListingVersion, EngineError> {
        let now = now();
        let mut tx = self.pool.begin().await?;
        let Resolved { mut live, shadow } = resolve(&mut tx, id).await?;
        actor.ensure_can_see(&live)?;
        let owner = load_owner(&mut tx, &live.owner_id).await?;
        let mut trail = AuditTrail::new(self.audit_context(&live, actor));

        let (version, issued) = match shadow {
            Some(ShadowListing { link, listing: mut shadow }) => {
                let request = TransitionRequest::new(shadow.status, requested, actor.kind());
                let outcome = self
                    .engine
                    .apply_with_audit(&request, self.audit.as_ref(), trail.context())
                    .map_err(|error| DomainError::from_lifecycle(&shadow.id, error))?;

                let exclusions = [shadow.id.clone(), live.id.clone()];
                let issued = apply_outcome(
                    &mut tx,
                    &mut shadow,
                    &outcome,
                    &owner,
                    &exclusions,
                    &mut trail,
                    now,
                )
                .await?;

                if matches!(outcome.to, ListingStatus::Published | ListingStatus::NotApproved) {
                    revision::merge(&mut tx, &mut live, &shadow, now).await?;
                    trail.revision("revision.merged", &live, &shadow.id);
                    (ListingVersion::Current(live), issued)
                } else {
                    listing::update(&mut tx, &shadow).await?;
                    (ListingVersion::Shadow(ShadowListing { link, listing: shadow }), issued)
                }
            }
            None => {
                let request = TransitionRequest::new(live.status, requested, actor.kind());
                let outcome = self
                    .engine
                    .apply_with_audit(&request, self.audit.as_ref(), trail.context())
                    .map_err(|error| DomainError::from_lifecycle(&live.id, error))?;

                let exclusions = [live.id.clone()];
                let issued =
                    apply_outcome(&mut tx, &mut live, &outcome, &owner, &exclusions, &mut trail, now)
                        .await?;
                if !outcome.is_noop() {
                    listing::update(&mut tx, &live).await?;
                }
                (ListingVersion::Current(live), issued)
            }
        };

        tx.commit().await?;
        trail.emit(self.audit.as_ref());
        activation::announce_vouchers(self.emails.as_ref(), &issued).await;
        Ok(version)
    }

    pub async fn unpublish(&self, id: &ListingId, actor: &Actor) -> Result<ListingVersion, EngineError> {
        self.direct(DirectOperation::Unpublish, id, actor).await
    }

    pub async fn republish(&self, id: &ListingId, actor: &Actor) -> Result<ListingVersion, EngineError> {
        self.direct(DirectOperation::Republish, id, actor).await
    }

    pub async fn reserve(&self, id: &ListingId, actor: &Actor) -> Result<ListingVersion, EngineError> {
        self.direct(DirectOperation::Reserve, id, actor).await
    }

    pub async fn unreserve(&self, id: &ListingId, actor: &Actor) -> Result<ListingVersion, EngineError> {
        self.direct(DirectOperation::Unreserve, id, actor).await
    }

    pub async fn sell(&self, id: &ListingId, actor: &Actor) -> Result<ListingVersion, EngineError> {
        self.direct(DirectOperation::Sell, id, actor).await
    }

    pub async fn recover(&self, id: &ListingId, actor: &Actor) -> Result<ListingVersion, EngineError> {
        self.direct(DirectOperation::Recover, id, actor).await
    }

    pub async fn pending(&self, id: &ListingId, actor: &Actor) -> Result<ListingVersion, EngineError> {
        self.direct(DirectOperation::Pending, id, actor).await
    }

    pub async fn cancel(&self, id: &ListingId, actor: &Actor) -> Result<ListingVersion, EngineError> {
        self.direct(DirectOperation::Cancel, id, actor).await
    }

    pub async fn move_to_bin(&self, id: &ListingId, actor: &Actor) -> Result<ListingVersion, EngineError> {
        self.direct(DirectOperation::MoveToBin, id, actor).await
    }

    pub async fn publish(&self, id: &ListingId, actor: &Actor) -> Result<ListingVersion, EngineError> {
        self.direct(DirectOperation::Publish, id, actor).await
    }

    async fn direct(
        &self,
        operation: DirectOperation,
        id: &ListingId,
        actor: &Actor,
    ) -> Result<ListingVersion, EngineError> {
        let now = now();
        let mut tx = self.pool.begin().await?;
        let Resolved { mut live, shadow } = resolve(&mut tx, id).await?;
        actor.ensure_can_see(&live)?;
        if actor.kind() != operation.actor() {
            return Err(invalid_state(&live, operation.as_str(), actor.kind()));
        }
        let owner = load_owner(&mut tx, &live.owner_id).await?;
        let mut trail = AuditTrail::new(self.audit_context(&live, actor));

        let acts_on_shadow = matches!(operation, DirectOperation::Publish | DirectOperation::Cancel);
        let issued = match shadow {
            Some(ShadowListing { listing: mut shadow, .. }) if acts_on_shadow => {
                let outcome = self
                    .engine
                    .apply_direct_with_audit(operation, shadow.status, self.audit.as_ref(), trail.context())
                    .map_err(|error| DomainError::from_lifecycle(&shadow.id, error))?;

                if operation == DirectOperation::Cancel {
                    let refunded = revision::discard(&mut tx, &mut live, &mut shadow, now).await?;
                    trail.revision("revision.discarded", &live, &shadow.id);
                    trail.refunds(&shadow.id, &refunded);
                    Vec::new()
                } else {
                    let exclusions = [shadow.id.clone(), live.id.clone()];
                    let issued = apply_outcome(
                        &mut tx,
                        &mut shadow,
                        &outcome,
                        &owner,
                        &exclusions,
                        &mut trail,
                        now,
                    )
                    .await?;
                    revision::merge(&mut tx, &mut live, &shadow, now).await?;
                    trail.revision("revision.merged", &live, &shadow.id);
                    issued
                }
            }
            shadow => {
                let outcome = self
                    .engine
                    .apply_direct_with_audit(operation, live.status, self.audit.as_ref(), trail.context())
                    .map_err(|error| DomainError::from_lifecycle(&live.id, error))?;

                if let Some(ShadowListing { listing: mut shadow, .. }) = shadow {
                    if matches!(
                        operation,
                        DirectOperation::Unpublish | DirectOperation::Reserve | DirectOperation::Sell
                    ) {
                        let refunded =
                            revision::discard(&mut tx, &mut live, &mut shadow, now).await?;
                        trail.revision("revision.discarded", &live, &shadow.id);
                        trail.refunds(&shadow.id, &refunded);
                    }
                }

                let exclusions = [live.id.clone()];
                let issued =
                    apply_outcome(&mut tx, &mut live, &outcome, &owner, &exclusions, &mut trail, now)
                        .await?;
                listing::update(&mut tx, &live).await?;
                issued
            }
        };

        tx.commit().await?;
        trail.emit(self.audit.as_ref());
        activation::announce_vouchers(self.emails.as_ref(), &issued).await;
        Ok(ListingVersion::Current(live))
    }

    /// Buys `product` for each listing in one transaction. Published rows are
    /// activated now; rows still in review record a prepaid intent.
    pub async fn apply_add_on(
        &self,
        product: AddOnProduct,
        listing_ids: &[ListingId],
        owner_id: &OwnerId,
    ) -> Result<Vec<Listing>, EngineError> {
        let now = now();
        let mut tx = self.pool.begin().await?;
        let owner = load_owner(&mut tx, owner_id).await?;
        let mut trail = AuditTrail::new(AuditContext::new(
            None,
            correlation_id(),
            Actor::Owner(owner_id.clone()).label(),
        ));

        let mut updated = Vec::with_capacity(listing_ids.len());
        let mut issued = Vec::new();
        for id in listing_ids {
            let Resolved { live, shadow } = resolve(&mut tx, id).await?;
            if live.owner_id != *owner_id {
                return Err(DomainError::listing_not_found(id).into());
            }
            let mut target = match shadow {
                Some(shadow) => shadow.listing,
                None => live,
            };

            if target.status == ListingStatus::Published && target.is_current_version {
                activation::ensure_not_active(&mut tx, &target, product).await?;
                self.debit(&mut tx, &mut trail, &target, product, now).await?;
                let voucher = activation::activate(&mut tx, &mut target, &owner, product, now)
                    .await
                    .map_err(|error| EngineError::activation(&target.id, product, error))?;
                issued.extend(voucher);
            } else if target.status.accepts_intents() {
                if product.is_intended(&target.intents) {
                    return Err(DomainError::Conflict {
                        id: target.id.0.clone(),
                        reason: format!("{product} is already pending on this listing"),
                    }
                    .into());
                }
                activation::ensure_not_active(&mut tx, &target, product).await?;
                self.debit(&mut tx, &mut trail, &target, product, now).await?;
                product.set_intent(&mut target.intents, true);
            } else {
                return Err(invalid_state(&target, &format!("add_on:{product}"), ActorKind::Owner));
            }

            target.updated_at = now;
            listing::update(&mut tx, &target).await?;
            updated.push(target);
        }

        tx.commit().await?;
        trail.emit(self.audit.as_ref());
        activation::announce_vouchers(self.emails.as_ref(), &issued).await;

        info!(
            event_name = "addon.applied",
            owner_id = %owner_id,
            product = %product,
            listings = updated.len(),
            "add-on applied"
        );
        Ok(updated)
    }

    pub async fn find_similar(&self, id: &ListingId) -> Result<Vec<Listing>, EngineError> {
        SimilarListingMatcher::new(self.pool.clone(), self.matching.clone()).find_similar(id).await
    }

    fn audit_context(&self, listing: &Listing, actor: &Actor) -> AuditContext {
        AuditContext::new(Some(listing.id.clone()), correlation_id(), actor.label())
    }

    async fn debit(
        &self,
        conn: &mut DbConnection,
        trail: &mut AuditTrail,
        target: &Listing,
        product: AddOnProduct,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        match ledger::debit(conn, &target.owner_id, product, now).await {
            Ok(()) => {
                trail.debit(&target.id, product);
                Ok(())
            }
            Err(error) => {
                self.audit.emit(trail.refused_debit(&target.id, product, &error));
                Err(error)
            }
        }
    }
}

struct Resolved {
    live: Listing,
    shadow: Option<ShadowListing>,
}

/// Finds the live row for `id`, whether `id` names the live row or its shadow.
async fn resolve(conn: &mut DbConnection, id: &ListingId) -> Result<Resolved, EngineError> {
    let row = listing::find(conn, id).await?.ok_or_else(|| DomainError::listing_not_found(id))?;

    if row.is_current_version {
        let shadow =
            if row.is_under_revision { revision::load_shadow(conn, &row).await? } else { None };
        return Ok(Resolved { live: row, shadow });
    }

    let link = revision_links::find_by_shadow(conn, &row.id).await?.ok_or_else(|| {
        DomainError::InvariantViolation(format!("shadow {} has no live listing", row.id))
    })?;
    let live = listing::find(conn, &link.current_id)
        .await?
        .ok_or_else(|| DomainError::listing_not_found(&link.current_id))?;
    Ok(Resolved { live, shadow: Some(ShadowListing { link, listing: row }) })
}

async fn load_owner(conn: &mut DbConnection, owner_id: &OwnerId) -> Result<Owner, EngineError> {
    owner::find(conn, owner_id)
        .await?
        .ok_or_else(|| DomainError::owner_not_found(owner_id).into())
}

/// Applies the effects of an accepted status change to `target` in memory.
/// Bookmark removal and ledger movements hit the store directly; the caller
/// persists `target`. `slot_exclusions` are the rows that already stand for
/// this listing, so a listing never counts against its own post slot.
async fn apply_outcome(
    conn: &mut DbConnection,
    target: &mut Listing,
    outcome: &TransitionOutcome,
    owner: &Owner,
    slot_exclusions: &[ListingId],
    trail: &mut AuditTrail,
    now: DateTime<Utc>,
) -> Result<Vec<IssuedVoucher>, EngineError> {
    let mut issued = Vec::new();

    for effect in &outcome.effects {
        match effect {
            TransitionEffect::CheckPostLimit => {
                let exclude = slot_exclusions.iter().collect::<Vec<_>>();
                let active = listing::count_post_slots(conn, &owner.id, &exclude).await?;
                ensure_post_slot(&owner.id, active, owner.post_limit)?;
            }
            TransitionEffect::StampSubmitted => target.timestamps.submitted_at = Some(now),
            TransitionEffect::StampPublished => {
                target.timestamps.published_at = Some(now);
                target.timestamps.rejected_at = None;
                target.timestamps.expired_at = None;
            }
            TransitionEffect::StampRejected => target.timestamps.rejected_at = Some(now),
            TransitionEffect::StampReserved => target.timestamps.reserved_at = Some(now),
            TransitionEffect::ClearReserved => target.timestamps.reserved_at = None,
            TransitionEffect::StampSold => target.timestamps.sold_at = Some(now),
            TransitionEffect::StampDumped => target.timestamps.dumped_at = Some(now),
            TransitionEffect::ClearDumped => target.timestamps.dumped_at = None,
            TransitionEffect::ClearPublishMetadata => {
                target.timestamps.published_at = None;
                target.timestamps.bumped_at = None;
                target.timestamps.hot_dealed_at = None;
                target.promotion.is_bumped = false;
                target.promotion.is_hot_dealed = false;
            }
            TransitionEffect::RemoveBookmarks => {
                bookmark::delete_for_listing(conn, &target.id).await?;
            }
            TransitionEffect::ActivateIntents => {
                issued.extend(activation::activate_intents(conn, target, owner, now).await?);
            }
            TransitionEffect::RefundIntents => {
                let refunded = ledger::refund_intents(conn, target, now).await?;
                trail.refunds(&target.id, &refunded);
            }
        }
    }

    target.status = outcome.to;
    target.updated_at = now;
    Ok(issued)
}

fn invalid_state(listing: &Listing, requested: &str, actor: ActorKind) -> EngineError {
    DomainError::InvalidState {
        id: listing.id.clone(),
        from: listing.status,
        requested: requested.to_string(),
        actor,
    }
    .into()
}

fn correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
