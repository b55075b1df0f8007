mod support;

use carmarket_core::audit::{AuditCategory, AuditOutcome};
use carmarket_core::domain::addon::AddOnProduct;
use carmarket_core::domain::listing::{ListingStatus, ListingVersion, Pricing};
use carmarket_core::errors::DomainError;
use carmarket_db::repositories::bookmark;
use carmarket_engine::{Actor, EngineError, NewListing};

use tempfile::TempDir;

use support::{
    balance_of, changes, file_harness, fixed_now, grant, harness, insert_listing, insert_owner,
    reload,
};

fn reviewer() -> Actor {
    Actor::Reviewer("reviewer-1".to_string())
}

fn domain(error: &EngineError) -> &DomainError {
    error.domain().expect("domain error")
}

#[tokio::test]
async fn owner_submission_allocates_uid_and_stores_total_price() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 10).await;
    let actor = Actor::Owner(owner.id.clone());

    let mut input = changes(&["front.jpg"]);
    input.pricing = Pricing::new(500_000, Some(50_000)).expect("pricing");
    let first = h
        .service
        .create_listing(&actor, NewListing { owner_id: owner.id.clone(), changes: input, submit: true })
        .await
        .expect("create");
    let second = h
        .service
        .create_listing(
            &actor,
            NewListing { owner_id: owner.id.clone(), changes: changes(&[]), submit: false },
        )
        .await
        .expect("create draft");

    assert_eq!(first.uid, "DTOBAG-001");
    assert_eq!(second.uid, "DTOBAG-002");
    assert_eq!(first.status, ListingStatus::PendingApproval);
    assert!(first.timestamps.submitted_at.is_some());
    assert_eq!(second.status, ListingStatus::Draft);

    let stored = reload(&h.pool, &first.id).await.expect("stored");
    assert_eq!(stored.pricing.total_price(), 450_000);
}

#[tokio::test]
async fn editing_published_listing_with_new_attachment_creates_single_shadow() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 10).await;
    let actor = Actor::Owner(owner.id.clone());
    let live =
        insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::Published, |_| {}).await;

    let version = h
        .service
        .update_listing(&live.id, changes(&["front.jpg", "rear.jpg"]), &actor)
        .await
        .expect("edit");

    let ListingVersion::Shadow(shadow) = version else {
        panic!("expected a pending edit");
    };
    assert_eq!(shadow.listing.status, ListingStatus::PendingEditApproval);
    assert!(!shadow.listing.is_current_version);
    assert_eq!(shadow.link.current_id, live.id);

    let stored_live = reload(&h.pool, &live.id).await.expect("live row");
    assert_eq!(stored_live.status, ListingStatus::Published);
    assert!(stored_live.is_under_revision);
    assert_eq!(stored_live.attachments, vec!["front.jpg".to_string()]);

    let error = h
        .service
        .update_listing(&live.id, changes(&["side.jpg"]), &actor)
        .await
        .expect_err("second edit while under revision");
    assert!(matches!(domain(&error), DomainError::Conflict { .. }));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM listing WHERE uid = 'DTOBAG-001'")
        .fetch_one(&h.pool)
        .await
        .expect("count rows");
    assert_eq!(rows, 2);
}

#[tokio::test]
async fn editing_published_listing_without_new_attachments_stays_in_place() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 10).await;
    let live =
        insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::Published, |_| {}).await;

    let mut edit = changes(&["front.jpg"]);
    edit.pricing = Pricing::new(480_000, None).expect("pricing");
    let version = h
        .service
        .update_listing(&live.id, edit, &Actor::Owner(owner.id.clone()))
        .await
        .expect("edit");

    assert!(matches!(version, ListingVersion::Current(_)));
    let stored = reload(&h.pool, &live.id).await.expect("live row");
    assert_eq!(stored.status, ListingStatus::Published);
    assert!(!stored.is_under_revision);
    assert_eq!(stored.pricing.total_price(), 480_000);
}

#[tokio::test]
async fn reviewer_publish_merges_shadow_back_onto_live_row() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 10).await;
    let live =
        insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::Published, |_| {}).await;
    let ListingVersion::Shadow(shadow) = h
        .service
        .update_listing(&live.id, changes(&["front.jpg", "rear.jpg"]), &Actor::Owner(owner.id.clone()))
        .await
        .expect("edit")
    else {
        panic!("expected a pending edit");
    };

    let merged = h.service.publish(&shadow.listing.id, &reviewer()).await.expect("publish edit");

    let merged = merged.listing();
    assert_eq!(merged.id, live.id);
    assert_eq!(merged.status, ListingStatus::Published);
    assert!(!merged.is_under_revision);
    assert_eq!(merged.attachments.len(), 2);
    assert!(reload(&h.pool, &shadow.listing.id).await.is_none());

    let events = h.audit.events();
    assert!(events.iter().any(|event| event.event_type == "listing.transition_applied"));
}

#[tokio::test]
async fn reviewer_round_trip_through_need_action_then_reject() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 10).await;
    let actor = Actor::Owner(owner.id.clone());
    let live =
        insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::Published, |_| {}).await;
    h.service.update_listing(&live.id, changes(&["rear.jpg"]), &actor).await.expect("edit");

    let version = h
        .service
        .transition(&live.id, ListingStatus::NeedAction, &reviewer())
        .await
        .expect("request changes");
    assert_eq!(version.listing().status, ListingStatus::NeedAction);

    let version =
        h.service.update_listing(&live.id, changes(&["rear.jpg", "dash.jpg"]), &actor).await.expect("fix");
    assert!(matches!(version, ListingVersion::Shadow(_)));
    assert_eq!(version.listing().attachments.len(), 2);

    h.service
        .transition(&live.id, ListingStatus::PendingEditApproval, &actor)
        .await
        .expect("resubmit");

    let rejected = h
        .service
        .transition(&live.id, ListingStatus::NotApproved, &reviewer())
        .await
        .expect("reject");
    let rejected = rejected.listing();
    assert_eq!(rejected.id, live.id);
    assert_eq!(rejected.status, ListingStatus::NotApproved);
    assert!(rejected.timestamps.rejected_at.is_some());
    assert!(!rejected.is_under_revision);
}

#[tokio::test]
async fn disallowed_transitions_are_invalid_state() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 10).await;
    let actor = Actor::Owner(owner.id.clone());
    let draft = insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::Draft, |_| {}).await;

    let error = h
        .service
        .transition(&draft.id, ListingStatus::Published, &actor)
        .await
        .expect_err("owners cannot publish");
    assert!(matches!(domain(&error), DomainError::InvalidState { .. }));

    let error = h.service.unpublish(&draft.id, &actor).await.expect_err("draft is not published");
    assert!(matches!(domain(&error), DomainError::InvalidState { .. }));

    let error = h.service.pending(&draft.id, &reviewer()).await.expect_err("owner operation");
    assert!(matches!(domain(&error), DomainError::InvalidState { .. }));

    let stranger = insert_owner(&h.pool, "O-2", 10).await;
    let error = h
        .service
        .pending(&draft.id, &Actor::Owner(stranger.id.clone()))
        .await
        .expect_err("foreign listing");
    assert!(matches!(domain(&error), DomainError::NotFound { .. }));

    let version = h.service.pending(&draft.id, &actor).await.expect("submit");
    assert_eq!(version.listing().status, ListingStatus::PendingApproval);
    let version = h
        .service
        .transition(&draft.id, ListingStatus::ActionRequired, &reviewer())
        .await
        .expect("request changes");
    assert_eq!(version.listing().status, ListingStatus::ActionRequired);
}

#[tokio::test]
async fn hot_deal_without_balance_fails_and_leaves_listing_untouched() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 10).await;
    let live =
        insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::Published, |_| {}).await;

    let error = h
        .service
        .apply_add_on(AddOnProduct::HotDeal, &[live.id.clone()], &owner.id)
        .await
        .expect_err("no balance");

    assert!(matches!(domain(&error), DomainError::InsufficientBalance { available: 0, .. }));
    let stored = reload(&h.pool, &live.id).await.expect("listing");
    assert!(!stored.promotion.is_hot_dealed);
    assert!(stored.timestamps.hot_dealed_at.is_none());

    let ledger = h.audit.events_in(AuditCategory::Ledger);
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].event_type, "ledger.debit_refused");
    assert_eq!(ledger[0].outcome, AuditOutcome::Rejected);
    assert_eq!(ledger[0].actor, format!("owner:{}", owner.id));
}

#[tokio::test]
async fn concurrent_add_ons_never_overdraw_the_balance() {
    let dir = TempDir::new().expect("tempdir");
    let h = file_harness(&dir).await;
    let owner = insert_owner(&h.pool, "O-1", 10).await;
    grant(&h.pool, &owner.id, AddOnProduct::HotDeal, 1).await;
    let first =
        insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::Published, |_| {}).await;
    let second =
        insert_listing(&h.pool, &owner.id, "DTOBAG-002", ListingStatus::Published, |_| {}).await;

    let first_ids = [first.id.clone()];
    let second_ids = [second.id.clone()];
    let (left, right) = tokio::join!(
        h.service.apply_add_on(AddOnProduct::HotDeal, &first_ids, &owner.id),
        h.service.apply_add_on(AddOnProduct::HotDeal, &second_ids, &owner.id),
    );

    assert_eq!([left.is_ok(), right.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let refused = [left, right].into_iter().find_map(Result::err).expect("one refusal");
    assert!(
        matches!(refused.domain(), Some(DomainError::InsufficientBalance { .. }))
            || matches!(refused, EngineError::Repository(_)),
        "unexpected refusal: {refused}"
    );
    assert_eq!(balance_of(&h.pool, &owner.id, AddOnProduct::HotDeal).await, 0);

    let hot_dealed = [
        reload(&h.pool, &first.id).await.expect("first"),
        reload(&h.pool, &second.id).await.expect("second"),
    ]
    .iter()
    .filter(|listing| listing.promotion.is_hot_dealed)
    .count();
    assert_eq!(hot_dealed, 1);
}

#[tokio::test]
async fn prepaid_intent_activates_on_publish_without_second_debit() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 10).await;
    let actor = Actor::Owner(owner.id.clone());
    grant(&h.pool, &owner.id, AddOnProduct::Bump, 1).await;
    let draft = insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::Draft, |_| {}).await;

    let updated = h
        .service
        .apply_add_on(AddOnProduct::Bump, &[draft.id.clone()], &owner.id)
        .await
        .expect("record intent");
    assert!(updated[0].intents.bump);
    assert_eq!(balance_of(&h.pool, &owner.id, AddOnProduct::Bump).await, 0);

    let error = h
        .service
        .apply_add_on(AddOnProduct::Bump, &[draft.id.clone()], &owner.id)
        .await
        .expect_err("duplicate intent");
    assert!(matches!(domain(&error), DomainError::Conflict { .. }));

    h.service.pending(&draft.id, &actor).await.expect("submit");
    let published = h.service.publish(&draft.id, &reviewer()).await.expect("publish");

    let published = published.listing();
    assert_eq!(published.status, ListingStatus::Published);
    assert!(published.promotion.is_bumped);
    assert!(published.timestamps.bumped_at.is_some());
    assert!(!published.intents.bump);
    assert_eq!(balance_of(&h.pool, &owner.id, AddOnProduct::Bump).await, 0);
}

#[tokio::test]
async fn cancel_keeps_intents_from_pending_approval_and_bin_refunds_them() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 10).await;
    let actor = Actor::Owner(owner.id.clone());
    grant(&h.pool, &owner.id, AddOnProduct::Bump, 1).await;
    let draft = insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::Draft, |_| {}).await;

    h.service.apply_add_on(AddOnProduct::Bump, &[draft.id.clone()], &owner.id).await.expect("intent");
    h.service.pending(&draft.id, &actor).await.expect("submit");

    let cancelled = h.service.cancel(&draft.id, &actor).await.expect("cancel");
    assert_eq!(cancelled.listing().status, ListingStatus::Draft);
    assert!(cancelled.listing().intents.bump);
    assert_eq!(balance_of(&h.pool, &owner.id, AddOnProduct::Bump).await, 0);

    let binned = h.service.move_to_bin(&draft.id, &actor).await.expect("bin");
    let binned = binned.listing();
    assert_eq!(binned.status, ListingStatus::Deleted);
    assert!(binned.timestamps.dumped_at.is_some());
    assert!(!binned.intents.bump);
    assert_eq!(balance_of(&h.pool, &owner.id, AddOnProduct::Bump).await, 1);

    let recovered = h.service.recover(&draft.id, &actor).await.expect("recover");
    assert_eq!(recovered.listing().status, ListingStatus::Draft);
    assert!(recovered.listing().timestamps.dumped_at.is_none());
}

#[tokio::test]
async fn certification_issues_voucher_once_and_emails_after_commit() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 10).await;
    grant(&h.pool, &owner.id, AddOnProduct::CmuCertified, 2).await;
    let live =
        insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::Published, |_| {}).await;

    let updated = h
        .service
        .apply_add_on(AddOnProduct::CmuCertified, &[live.id.clone()], &owner.id)
        .await
        .expect("certify");
    assert!(updated[0].promotion.is_cmu_certified);

    let sent = h.emails.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].template, "cmu_voucher_activated");
    assert_eq!(sent[0].data["voucher_code"], "CMU-00001");
    assert_eq!(sent[0].data["listing_uid"], "DTOBAG-001");

    let error = h
        .service
        .apply_add_on(AddOnProduct::CmuCertified, &[live.id.clone()], &owner.id)
        .await
        .expect_err("second certification");
    assert!(matches!(domain(&error), DomainError::Conflict { .. }));
    assert_eq!(balance_of(&h.pool, &owner.id, AddOnProduct::CmuCertified).await, 1);
    assert_eq!(h.emails.sent().len(), 1);
}

#[tokio::test]
async fn failed_intent_activation_rolls_back_publish_with_typed_error() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 10).await;
    let pending =
        insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::PendingApproval, |row| {
            row.intents.hot_deal = true;
            row.promotion.is_hot_dealed = true;
        })
        .await;

    let error = h.service.publish(&pending.id, &reviewer()).await.expect_err("activation fails");

    assert!(matches!(
        error,
        EngineError::Activation { product: AddOnProduct::HotDeal, .. }
    ));
    assert!(matches!(domain(&error), DomainError::Conflict { .. }));
    let stored = reload(&h.pool, &pending.id).await.expect("listing");
    assert_eq!(stored.status, ListingStatus::PendingApproval);
    assert!(stored.intents.hot_deal);
}

#[tokio::test]
async fn post_limit_blocks_publish_and_republish() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 1).await;
    insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::Published, |_| {}).await;
    let pending =
        insert_listing(&h.pool, &owner.id, "DTOBAG-002", ListingStatus::PendingApproval, |_| {})
            .await;
    let expired =
        insert_listing(&h.pool, &owner.id, "DTOBAG-003", ListingStatus::Expired, |_| {}).await;

    let error = h.service.publish(&pending.id, &reviewer()).await.expect_err("limit reached");
    assert!(matches!(domain(&error), DomainError::LimitExceeded { active: 1, limit: 1, .. }));
    assert_eq!(
        reload(&h.pool, &pending.id).await.expect("pending").status,
        ListingStatus::PendingApproval
    );

    let error = h
        .service
        .republish(&expired.id, &Actor::Owner(owner.id.clone()))
        .await
        .expect_err("limit reached");
    assert!(matches!(domain(&error), DomainError::LimitExceeded { .. }));
}

#[tokio::test]
async fn reviewer_approval_through_transition_respects_post_limit() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 1).await;
    insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::Published, |_| {}).await;
    let pending =
        insert_listing(&h.pool, &owner.id, "DTOBAG-002", ListingStatus::PendingApproval, |_| {})
            .await;
    let flagged =
        insert_listing(&h.pool, &owner.id, "DTOBAG-003", ListingStatus::ActionRequired, |_| {})
            .await;

    for id in [&pending.id, &flagged.id] {
        let error = h
            .service
            .transition(id, ListingStatus::Published, &reviewer())
            .await
            .expect_err("limit reached");
        assert!(matches!(domain(&error), DomainError::LimitExceeded { limit: 1, .. }));
    }
    assert_eq!(
        reload(&h.pool, &pending.id).await.expect("pending").status,
        ListingStatus::PendingApproval
    );
    assert_eq!(
        reload(&h.pool, &flagged.id).await.expect("flagged").status,
        ListingStatus::ActionRequired
    );

    let solo = insert_owner(&h.pool, "O-2", 1).await;
    let submitted = h
        .service
        .create_listing(
            &Actor::Owner(solo.id.clone()),
            NewListing { owner_id: solo.id.clone(), changes: changes(&[]), submit: true },
        )
        .await
        .expect("submission");
    let approved = h
        .service
        .transition(&submitted.id, ListingStatus::Published, &reviewer())
        .await
        .expect("a listing never blocks its own slot");
    assert_eq!(approved.listing().status, ListingStatus::Published);
}

#[tokio::test]
async fn unpublish_clears_publish_metadata_and_bookmarks() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 10).await;
    let fan = insert_owner(&h.pool, "O-2", 10).await;
    let live = insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::Published, |row| {
        row.promotion.is_bumped = true;
        row.timestamps.bumped_at = Some(fixed_now());
    })
    .await;
    {
        let mut conn = h.pool.acquire().await.expect("acquire");
        bookmark::insert(&mut conn, &fan.id, &live.id, fixed_now()).await.expect("bookmark");
    }

    let version =
        h.service.unpublish(&live.id, &Actor::Owner(owner.id.clone())).await.expect("unpublish");

    let listing = version.listing();
    assert_eq!(listing.status, ListingStatus::Draft);
    assert!(listing.timestamps.published_at.is_none());
    assert!(!listing.promotion.is_bumped);

    let mut conn = h.pool.acquire().await.expect("acquire");
    assert_eq!(bookmark::count_for_listing(&mut conn, &live.id).await.expect("count"), 0);
}

#[tokio::test]
async fn unpublish_under_revision_discards_shadow_and_refunds_its_intents() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 10).await;
    let actor = Actor::Owner(owner.id.clone());
    grant(&h.pool, &owner.id, AddOnProduct::HotDeal, 1).await;
    let live =
        insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::Published, |_| {}).await;
    let ListingVersion::Shadow(shadow) =
        h.service.update_listing(&live.id, changes(&["rear.jpg"]), &actor).await.expect("edit")
    else {
        panic!("expected a pending edit");
    };

    let updated = h
        .service
        .apply_add_on(AddOnProduct::HotDeal, &[live.id.clone()], &owner.id)
        .await
        .expect("intent on pending edit");
    assert_eq!(updated[0].id, shadow.listing.id);
    assert!(updated[0].intents.hot_deal);
    assert_eq!(balance_of(&h.pool, &owner.id, AddOnProduct::HotDeal).await, 0);

    let version = h.service.unpublish(&live.id, &actor).await.expect("unpublish");

    assert_eq!(version.listing().status, ListingStatus::Draft);
    assert!(!version.listing().is_under_revision);
    assert!(reload(&h.pool, &shadow.listing.id).await.is_none());
    assert_eq!(balance_of(&h.pool, &owner.id, AddOnProduct::HotDeal).await, 1);

    let revisions = h.audit.events_in(AuditCategory::Revision);
    let kinds = revisions.iter().map(|event| event.event_type.as_str()).collect::<Vec<_>>();
    assert_eq!(kinds, vec!["revision.created", "revision.discarded"]);
    assert!(revisions.iter().all(|event| event.listing_id.as_ref() == Some(&live.id)));
    assert_eq!(revisions[0].metadata("shadow_id"), Some(shadow.listing.id.0.as_str()));

    let ledger = h.audit.events_in(AuditCategory::Ledger);
    let kinds = ledger.iter().map(|event| event.event_type.as_str()).collect::<Vec<_>>();
    assert_eq!(kinds, vec!["ledger.debit", "ledger.refund"]);
    assert!(ledger.iter().all(|event| event.metadata("product") == Some("hot_deal")));
    assert!(ledger.iter().all(|event| event.listing_id.as_ref() == Some(&shadow.listing.id)));
}

#[tokio::test]
async fn reviewer_creation_publishes_within_post_limit() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 1).await;

    let created = h
        .service
        .create_listing(
            &reviewer(),
            NewListing { owner_id: owner.id.clone(), changes: changes(&[]), submit: true },
        )
        .await
        .expect("publish on creation");
    assert_eq!(created.status, ListingStatus::Published);
    assert!(created.timestamps.published_at.is_some());

    let error = h
        .service
        .create_listing(
            &reviewer(),
            NewListing { owner_id: owner.id.clone(), changes: changes(&[]), submit: true },
        )
        .await
        .expect_err("limit reached");
    assert!(matches!(domain(&error), DomainError::LimitExceeded { .. }));
}

#[tokio::test]
async fn reads_hide_foreign_listings_from_owners() {
    let h = harness().await;
    let owner = insert_owner(&h.pool, "O-1", 10).await;
    let stranger = insert_owner(&h.pool, "O-2", 10).await;
    let live =
        insert_listing(&h.pool, &owner.id, "DTOBAG-001", ListingStatus::Published, |_| {}).await;
    insert_listing(&h.pool, &owner.id, "DTOBAG-002", ListingStatus::Draft, |row| {
        row.created_at = fixed_now() + chrono::Duration::hours(1);
    })
    .await;
    let ListingVersion::Shadow(shadow) = h
        .service
        .update_listing(&live.id, changes(&["front.jpg", "rear.jpg"]), &Actor::Owner(owner.id.clone()))
        .await
        .expect("edit")
    else {
        panic!("expected a pending edit");
    };

    let found =
        h.service.find_listing(&live.id, &Actor::Owner(owner.id.clone())).await.expect("own row");
    assert!(found.is_under_revision);
    let pending = h.service.find_listing(&shadow.listing.id, &reviewer()).await.expect("shadow");
    assert_eq!(pending.status, ListingStatus::PendingEditApproval);

    let hidden = h
        .service
        .find_listing(&live.id, &Actor::Owner(stranger.id.clone()))
        .await
        .expect_err("foreign listing");
    assert!(matches!(domain(&hidden), DomainError::NotFound { entity: "listing", .. }));

    let own = h
        .service
        .listings_for_owner(&owner.id, &Actor::Owner(owner.id.clone()))
        .await
        .expect("own listings");
    let uids = own.iter().map(|listing| listing.uid.as_str()).collect::<Vec<_>>();
    assert_eq!(uids, vec!["DTOBAG-002", "DTOBAG-001"]);
    assert!(own.iter().all(|listing| listing.is_current_version));

    assert_eq!(
        h.service.listings_for_owner(&owner.id, &reviewer()).await.expect("reviewer").len(),
        2
    );
    let error = h
        .service
        .listings_for_owner(&owner.id, &Actor::Owner(stranger.id.clone()))
        .await
        .expect_err("foreign owner");
    assert!(matches!(domain(&error), DomainError::NotFound { entity: "owner", .. }));
}
