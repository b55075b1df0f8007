//! Copy-on-write editing of live listings.
//!
//! A live row has at most one shadow, enforced by the `listing_revision`
//! table. Reviews act on the shadow; the outcome is folded back onto the live
//! row and the shadow is removed in the same transaction.

use chrono::{DateTime, Utc};
use tracing::info;

use carmarket_core::domain::addon::AddOnProduct;
use carmarket_core::domain::listing::{Listing, ListingChanges, RevisionLink, ShadowListing};
use carmarket_core::errors::DomainError;
use carmarket_db::repositories::{certification, listing, revision};
use carmarket_db::DbConnection;

use crate::{ledger, EngineError};

/// Loads the pending revision of `live`, if any.
pub async fn load_shadow(
    conn: &mut DbConnection,
    live: &Listing,
) -> Result<Option<ShadowListing>, EngineError> {
    let Some(link) = revision::find_by_current(conn, &live.id).await? else {
        return Ok(None);
    };
    let shadow = listing::find(conn, &link.shadow_id).await?.ok_or_else(|| {
        DomainError::InvariantViolation(format!(
            "revision link of {} points at missing shadow {}",
            live.id, link.shadow_id
        ))
    })?;
    Ok(Some(ShadowListing { link, listing: shadow }))
}

/// Inserts the edited copy and marks `live` as under revision.
pub async fn create_shadow(
    conn: &mut DbConnection,
    live: &mut Listing,
    changes: ListingChanges,
    now: DateTime<Utc>,
) -> Result<ShadowListing, EngineError> {
    if live.is_under_revision {
        return Err(already_under_revision(live));
    }

    let mut edited = live.clone();
    edited.apply_changes(changes, now);
    let shadow = edited.to_shadow(now);
    listing::insert(conn, &shadow).await?;

    let link =
        RevisionLink { current_id: live.id.clone(), shadow_id: shadow.id.clone(), created_at: now };
    revision::insert_link(conn, &link).await.map_err(|error| match error {
        carmarket_db::RepositoryError::Conflict(_) => already_under_revision(live),
        other => other.into(),
    })?;

    live.is_under_revision = true;
    live.updated_at = now;
    listing::update(conn, live).await?;

    info!(
        event_name = "revision.created",
        listing_id = %live.id,
        shadow_id = %shadow.id,
        "pending edit created"
    );
    Ok(ShadowListing { link, listing: shadow })
}

/// Folds a reviewed shadow onto `live` and deletes it.
pub async fn merge(
    conn: &mut DbConnection,
    live: &mut Listing,
    shadow: &Listing,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    certification::reassign_listing(conn, &shadow.id, &live.id).await?;
    listing::delete(conn, &shadow.id).await?;

    live.merge_from_shadow(shadow, now);
    listing::update(conn, live).await?;

    info!(
        event_name = "revision.merged",
        listing_id = %live.id,
        shadow_id = %shadow.id,
        status = %live.status,
        "pending edit merged"
    );
    Ok(())
}

/// Drops the pending edit, refunding whatever it had prepaid. Returns the
/// refunded products.
pub async fn discard(
    conn: &mut DbConnection,
    live: &mut Listing,
    shadow: &mut Listing,
    now: DateTime<Utc>,
) -> Result<Vec<AddOnProduct>, EngineError> {
    let refunded = ledger::refund_intents(conn, shadow, now).await?;
    listing::delete(conn, &shadow.id).await?;

    live.is_under_revision = false;
    live.updated_at = now;
    listing::update(conn, live).await?;

    info!(
        event_name = "revision.discarded",
        listing_id = %live.id,
        shadow_id = %shadow.id,
        refunded = refunded.len(),
        "pending edit discarded"
    );
    Ok(refunded)
}

fn already_under_revision(live: &Listing) -> EngineError {
    DomainError::Conflict {
        id: live.id.0.clone(),
        reason: "listing is already under revision".to_string(),
    }
    .into()
}
