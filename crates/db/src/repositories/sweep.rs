//! Bulk lifecycle statements run by the sweeper.
//!
//! Each mutation is a single guarded UPDATE over current-version rows, so a
//! second run inside the same window matches nothing new.

use chrono::{DateTime, Utc};
use sqlx::Row;

use carmarket_core::domain::listing::{ListingId, ListingStatus};
use carmarket_core::domain::owner::OwnerId;
use carmarket_core::sweep::{SweepKind, WarningWindow, EXPIRABLE_STATUSES};

use super::{format_timestamp, parse_timestamp, placeholders, RepositoryError};
use crate::DbConnection;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WarningCandidate {
    pub listing_id: ListingId,
    pub owner_id: OwnerId,
    pub uid: String,
    /// The lifecycle timestamp that placed the row in the window.
    pub reference_at: DateTime<Utc>,
}

pub async fn expire(
    conn: &mut DbConnection,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let sql = format!(
        "UPDATE listing
         SET status = ?, expired_at = ?, updated_at = ?
         WHERE is_current_version = 1
           AND deleted_at IS NULL
           AND status IN ({})
           AND published_at IS NOT NULL
           AND published_at <= ?",
        placeholders(EXPIRABLE_STATUSES.len())
    );

    let now_text = format_timestamp(now);
    let mut query =
        sqlx::query(&sql).bind(ListingStatus::Expired.as_str()).bind(&now_text).bind(&now_text);
    for status in EXPIRABLE_STATUSES {
        query = query.bind(status.as_str());
    }
    let result = query.bind(format_timestamp(cutoff)).execute(&mut *conn).await?;

    Ok(result.rows_affected())
}

pub async fn purge(
    conn: &mut DbConnection,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let now_text = format_timestamp(now);
    let result = sqlx::query(
        "UPDATE listing
         SET status = ?, dumped_at = ?, updated_at = ?
         WHERE is_current_version = 1
           AND deleted_at IS NULL
           AND status = ?
           AND expired_at IS NOT NULL
           AND expired_at <= ?",
    )
    .bind(ListingStatus::Deleted.as_str())
    .bind(&now_text)
    .bind(&now_text)
    .bind(ListingStatus::Expired.as_str())
    .bind(format_timestamp(cutoff))
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn finalize(
    conn: &mut DbConnection,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let now_text = format_timestamp(now);
    let result = sqlx::query(
        "UPDATE listing
         SET deleted_at = ?, updated_at = ?
         WHERE is_current_version = 1
           AND deleted_at IS NULL
           AND status = ?
           AND dumped_at IS NOT NULL
           AND dumped_at <= ?",
    )
    .bind(&now_text)
    .bind(&now_text)
    .bind(ListingStatus::Deleted.as_str())
    .bind(format_timestamp(cutoff))
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Status is left untouched; only the promotion flag and its stamp are cleared.
pub async fn expire_hot_deals(
    conn: &mut DbConnection,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE listing
         SET is_hot_dealed = 0, hot_dealed_at = NULL, updated_at = ?
         WHERE is_current_version = 1
           AND is_hot_dealed = 1
           AND hot_dealed_at IS NOT NULL
           AND hot_dealed_at <= ?",
    )
    .bind(format_timestamp(now))
    .bind(format_timestamp(cutoff))
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Rows about to be expired or purged. Non-warning kinds select nothing.
pub async fn warning_candidates(
    conn: &mut DbConnection,
    kind: SweepKind,
    window: WarningWindow,
) -> Result<Vec<WarningCandidate>, RepositoryError> {
    let (column, statuses): (&str, Vec<ListingStatus>) = match kind {
        SweepKind::PreExpiryWarning => ("published_at", EXPIRABLE_STATUSES.to_vec()),
        SweepKind::PreDeletionWarning => ("expired_at", vec![ListingStatus::Expired]),
        _ => return Ok(Vec::new()),
    };

    let sql = format!(
        "SELECT id, owner_id, uid, {column} AS reference_at
         FROM listing
         WHERE is_current_version = 1
           AND deleted_at IS NULL
           AND status IN ({})
           AND {column} > ?
           AND {column} <= ?
         ORDER BY {column} ASC, id ASC",
        placeholders(statuses.len())
    );

    let mut query = sqlx::query(&sql);
    for status in &statuses {
        query = query.bind(status.as_str());
    }
    let rows = query
        .bind(format_timestamp(window.after))
        .bind(format_timestamp(window.until))
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| {
            Ok(WarningCandidate {
                listing_id: ListingId(row.try_get("id")?),
                owner_id: OwnerId(row.try_get("owner_id")?),
                uid: row.try_get("uid")?,
                reference_at: parse_timestamp("reference_at", row.try_get("reference_at")?)?,
            })
        })
        .collect()
}
