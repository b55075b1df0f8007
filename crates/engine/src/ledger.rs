//! Balance ledger movements with their log trail.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use carmarket_core::domain::addon::AddOnProduct;
use carmarket_core::domain::listing::Listing;
use carmarket_core::domain::owner::OwnerId;
use carmarket_core::errors::DomainError;
use carmarket_db::repositories::balance;
use carmarket_db::DbConnection;

use crate::EngineError;

/// Takes one unit or fails with `InsufficientBalance` naming what is left.
pub async fn debit(
    conn: &mut DbConnection,
    owner_id: &OwnerId,
    product: AddOnProduct,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    if !balance::debit(conn, owner_id, product, now).await? {
        let available = balance::balance(conn, owner_id, product).await?;
        warn!(
            event_name = "ledger.debit_refused",
            owner_id = %owner_id,
            product = %product,
            available,
            "add-on balance exhausted"
        );
        return Err(DomainError::InsufficientBalance {
            owner_id: owner_id.clone(),
            product,
            available,
        }
        .into());
    }

    info!(event_name = "ledger.debit", owner_id = %owner_id, product = %product, amount = 1, "add-on unit debited");
    Ok(())
}

pub async fn credit(
    conn: &mut DbConnection,
    owner_id: &OwnerId,
    product: AddOnProduct,
    amount: u32,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    if amount == 0 {
        return Ok(());
    }

    balance::credit(conn, owner_id, product, amount, now).await?;
    info!(event_name = "ledger.credit", owner_id = %owner_id, product = %product, amount, "add-on units credited");
    Ok(())
}

/// Credits back every prepaid intent on the listing and clears the flags.
/// The caller persists the listing.
pub async fn refund_intents(
    conn: &mut DbConnection,
    listing: &mut Listing,
    now: DateTime<Utc>,
) -> Result<Vec<AddOnProduct>, EngineError> {
    let refunded = AddOnProduct::intended_on(listing);
    for product in &refunded {
        credit(conn, &listing.owner_id, *product, 1, now).await?;
        product.set_intent(&mut listing.intents, false);
    }
    Ok(refunded)
}
