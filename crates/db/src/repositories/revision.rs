use sqlx::{sqlite::SqliteRow, Row};

use carmarket_core::domain::listing::{ListingId, RevisionLink};

use super::{format_timestamp, parse_timestamp, RepositoryError};
use crate::DbConnection;

/// Fails with `Conflict` when either side is already linked.
pub async fn insert_link(conn: &mut DbConnection, link: &RevisionLink) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO listing_revision (current_id, shadow_id, created_at) VALUES (?, ?, ?)")
        .bind(&link.current_id.0)
        .bind(&link.shadow_id.0)
        .bind(format_timestamp(link.created_at))
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn find_by_current(
    conn: &mut DbConnection,
    current_id: &ListingId,
) -> Result<Option<RevisionLink>, RepositoryError> {
    let row = sqlx::query(
        "SELECT current_id, shadow_id, created_at FROM listing_revision WHERE current_id = ?",
    )
    .bind(&current_id.0)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(link_from_row).transpose()
}

pub async fn find_by_shadow(
    conn: &mut DbConnection,
    shadow_id: &ListingId,
) -> Result<Option<RevisionLink>, RepositoryError> {
    let row = sqlx::query(
        "SELECT current_id, shadow_id, created_at FROM listing_revision WHERE shadow_id = ?",
    )
    .bind(&shadow_id.0)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(link_from_row).transpose()
}

pub async fn delete_link(conn: &mut DbConnection, current_id: &ListingId) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM listing_revision WHERE current_id = ?")
        .bind(&current_id.0)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

fn link_from_row(row: &SqliteRow) -> Result<RevisionLink, RepositoryError> {
    Ok(RevisionLink {
        current_id: ListingId(row.try_get("current_id")?),
        shadow_id: ListingId(row.try_get("shadow_id")?),
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
