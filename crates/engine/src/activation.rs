//! Turns paid add-ons into visible promotion state.
//!
//! Everything here runs on the caller's transaction connection; a failure
//! anywhere rolls back the debit together with the listing mutation.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};

use carmarket_core::domain::addon::AddOnProduct;
use carmarket_core::domain::certification::{
    CertificationRequest, CertificationRequestId, ReviewStatus, Voucher, VoucherId,
    VoucherSnapshot, VoucherStatus,
};
use carmarket_core::domain::listing::Listing;
use carmarket_core::domain::owner::Owner;
use carmarket_core::errors::DomainError;
use carmarket_core::ports::EmailSender;
use carmarket_db::repositories::{certification, uid};
use carmarket_db::DbConnection;

use crate::EngineError;

pub const VOUCHER_ACTIVATED_TEMPLATE: &str = "cmu_voucher_activated";

/// A certification voucher issued inside a committed transaction, waiting to be announced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedVoucher {
    pub owner: Owner,
    pub voucher: Voucher,
}

/// Refuses products that can only be held once per listing.
pub async fn ensure_not_active(
    conn: &mut DbConnection,
    listing: &Listing,
    product: AddOnProduct,
) -> Result<(), EngineError> {
    let reason = match product {
        AddOnProduct::Bump => None,
        AddOnProduct::HotDeal if listing.promotion.is_hot_dealed => {
            Some("listing is already hot-dealed")
        }
        AddOnProduct::HotDeal => None,
        AddOnProduct::CmuCertified => {
            if listing.promotion.is_cmu_certified
                || certification::exists_for_listing(conn, &listing.id).await?
            {
                Some("listing already has a certification request")
            } else {
                None
            }
        }
    };

    match reason {
        Some(reason) => Err(DomainError::Conflict {
            id: listing.id.0.clone(),
            reason: reason.to_string(),
        }
        .into()),
        None => Ok(()),
    }
}

/// Applies one already-paid product to the listing in memory and, for
/// certification, inserts the voucher and request rows.
pub async fn activate(
    conn: &mut DbConnection,
    listing: &mut Listing,
    owner: &Owner,
    product: AddOnProduct,
    now: DateTime<Utc>,
) -> Result<Option<IssuedVoucher>, EngineError> {
    ensure_not_active(conn, listing, product).await?;

    let issued = match product {
        AddOnProduct::Bump => {
            listing.promotion.is_bumped = true;
            listing.timestamps.bumped_at = Some(now);
            None
        }
        AddOnProduct::HotDeal => {
            listing.promotion.is_hot_dealed = true;
            listing.timestamps.hot_dealed_at = Some(now);
            None
        }
        AddOnProduct::CmuCertified => {
            let voucher = issue_voucher(conn, listing, owner, now).await?;
            listing.promotion.is_cmu_certified = true;
            Some(IssuedVoucher { owner: owner.clone(), voucher })
        }
    };

    info!(
        event_name = "addon.activated",
        listing_id = %listing.id,
        owner_id = %listing.owner_id,
        product = %product,
        "add-on activated"
    );
    Ok(issued)
}

/// Consumes every prepaid intent. Units were debited when the intent was recorded.
pub async fn activate_intents(
    conn: &mut DbConnection,
    listing: &mut Listing,
    owner: &Owner,
    now: DateTime<Utc>,
) -> Result<Vec<IssuedVoucher>, EngineError> {
    let mut issued = Vec::new();
    for product in AddOnProduct::intended_on(listing) {
        let voucher = activate(conn, listing, owner, product, now)
            .await
            .map_err(|error| EngineError::activation(&listing.id, product, error))?;
        product.set_intent(&mut listing.intents, false);
        issued.extend(voucher);
    }
    Ok(issued)
}

async fn issue_voucher(
    conn: &mut DbConnection,
    listing: &Listing,
    owner: &Owner,
    now: DateTime<Utc>,
) -> Result<Voucher, EngineError> {
    let code = uid::allocate_voucher_code(conn, AddOnProduct::CmuCertified).await?;
    let voucher = Voucher {
        id: VoucherId(uuid::Uuid::new_v4().to_string()),
        code: code.code,
        status: VoucherStatus::Activated,
        snapshot: VoucherSnapshot::capture(listing, owner),
        activated_at: now,
    };
    certification::insert_voucher(conn, AddOnProduct::CmuCertified, &voucher).await?;

    let request = CertificationRequest {
        id: CertificationRequestId(uuid::Uuid::new_v4().to_string()),
        listing_id: listing.id.clone(),
        overall_status: ReviewStatus::Pending,
        inspection_status: ReviewStatus::Pending,
        document_status: ReviewStatus::Pending,
        voucher_id: voucher.id.clone(),
        created_at: now,
        updated_at: now,
    };
    certification::insert_request(conn, &request).await?;

    Ok(voucher)
}

/// Post-commit announcement. Failures are logged and dropped.
pub async fn announce_vouchers(emails: &dyn EmailSender, issued: &[IssuedVoucher]) {
    for IssuedVoucher { owner, voucher } in issued {
        let data = json!({
            "owner_id": owner.id.0,
            "owner_email": owner.email,
            "owner_name": owner.display_name,
            "voucher_code": voucher.code,
            "listing_uid": voucher.snapshot.listing_uid,
            "activated_at": voucher.activated_at,
        });

        if let Err(error) = emails.send(VOUCHER_ACTIVATED_TEMPLATE, data).await {
            warn!(
                event_name = "addon.voucher_email_failed",
                owner_id = %owner.id,
                voucher_code = %voucher.code,
                error = %error,
                "voucher activation email not sent"
            );
        }
    }
}
