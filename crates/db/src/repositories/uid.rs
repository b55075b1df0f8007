//! Sequential public identifier allocation.
//!
//! Allocation reads the highest existing suffix in the scope on the caller's
//! connection and hands back the next one, skipping numbers a same-prefix code
//! still holds once the scope has wrapped. Run it on the same transaction as
//! the insert; the unique indexes turn a lost race into `Conflict`.

use std::collections::HashSet;

use carmarket_core::domain::addon::AddOnProduct;
use carmarket_core::domain::listing::VehicleAttributes;
use carmarket_core::domain::owner::Owner;
use carmarket_core::identifiers::{
    first_free_sequence, listing_code, max_suffix, next_sequence, parse_suffix, voucher_code,
    ListingCodeParts, UidEntity,
};

use super::RepositoryError;
use crate::DbConnection;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocatedUid {
    pub code: String,
    pub sequence: u32,
}

/// Scope is the owner; soft-deleted rows still hold their number.
pub async fn allocate_listing_uid(
    conn: &mut DbConnection,
    owner: &Owner,
    attributes: &VehicleAttributes,
) -> Result<AllocatedUid, RepositoryError> {
    let existing: Vec<String> = sqlx::query_scalar(
        "SELECT uid FROM listing WHERE owner_id = ? AND is_current_version = 1",
    )
    .bind(&owner.id.0)
    .fetch_all(&mut *conn)
    .await?;

    let parts = ListingCodeParts {
        owner_kind: owner.kind,
        brand: &attributes.brand,
        province: &attributes.province,
        fuel_type: attributes.fuel_type,
    };
    let prefix = format!("{}-", parts.prefix());
    let sequence = free_sequence(
        &existing,
        |code| code.starts_with(&prefix),
        UidEntity::Listing,
        &owner.id.0,
    )?;

    Ok(AllocatedUid { code: listing_code(&parts, sequence), sequence })
}

pub async fn allocate_voucher_code(
    conn: &mut DbConnection,
    product: AddOnProduct,
) -> Result<AllocatedUid, RepositoryError> {
    let existing: Vec<String> = sqlx::query_scalar("SELECT code FROM voucher WHERE product = ?")
        .bind(product.as_str())
        .fetch_all(&mut *conn)
        .await?;

    let sequence = free_sequence(&existing, |_| true, UidEntity::Voucher, product.as_str())?;

    Ok(AllocatedUid { code: voucher_code(sequence), sequence })
}

/// Continues from the scope maximum; `same_prefix` picks the codes a new code could collide with.
fn free_sequence(
    existing: &[String],
    same_prefix: impl Fn(&str) -> bool,
    entity: UidEntity,
    scope: &str,
) -> Result<u32, RepositoryError> {
    let ceiling = entity.ceiling();
    let start = next_sequence(max_suffix(existing.iter().map(String::as_str)), ceiling);
    let taken: HashSet<u32> = existing
        .iter()
        .filter(|code| same_prefix(code))
        .filter_map(|code| parse_suffix(code))
        .collect();

    first_free_sequence(start, ceiling, &taken).ok_or_else(|| {
        RepositoryError::Conflict(format!("no free {entity:?} sequence left in scope {scope}"))
    })
}
