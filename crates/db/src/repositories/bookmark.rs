use chrono::{DateTime, Utc};

use carmarket_core::domain::listing::ListingId;
use carmarket_core::domain::owner::OwnerId;

use super::{format_timestamp, parse_u32, RepositoryError};
use crate::DbConnection;

pub async fn insert(
    conn: &mut DbConnection,
    owner_id: &OwnerId,
    listing_id: &ListingId,
    created_at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO bookmark (owner_id, listing_id, created_at) VALUES (?, ?, ?)
         ON CONFLICT(owner_id, listing_id) DO NOTHING",
    )
    .bind(&owner_id.0)
    .bind(&listing_id.0)
    .bind(format_timestamp(created_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Returns how many saved-listing rows were removed.
pub async fn delete_for_listing(
    conn: &mut DbConnection,
    listing_id: &ListingId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM bookmark WHERE listing_id = ?")
        .bind(&listing_id.0)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn count_for_listing(
    conn: &mut DbConnection,
    listing_id: &ListingId,
) -> Result<u32, RepositoryError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM bookmark WHERE listing_id = ?")
        .bind(&listing_id.0)
        .fetch_one(&mut *conn)
        .await?;

    parse_u32("bookmark_count", count)
}
