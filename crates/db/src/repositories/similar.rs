//! Ranked candidate queries for the similar-listing matcher.

use carmarket_core::domain::listing::Listing;
use carmarket_core::similar::{SimilarityPlan, MATCHABLE_STATUSES};

use super::listing::{listing_from_row, LISTING_COLUMNS};
use super::{placeholders, RepositoryError};
use crate::DbConnection;

/// Same body type and year inside the price band, cheapest then most recent first.
pub async fn primary(
    conn: &mut DbConnection,
    plan: &SimilarityPlan,
) -> Result<Vec<Listing>, RepositoryError> {
    if plan.limit == 0 {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {LISTING_COLUMNS}
         FROM listing
         WHERE is_current_version = 1
           AND deleted_at IS NULL
           AND status IN ({})
           AND id <> ?
           AND body_type = ?
           AND year = ?
           AND total_price BETWEEN ? AND ?
         ORDER BY total_price ASC, published_at DESC, id ASC
         LIMIT ?",
        placeholders(MATCHABLE_STATUSES.len())
    );

    let mut query = sqlx::query(&sql);
    for status in MATCHABLE_STATUSES {
        query = query.bind(status.as_str());
    }
    let rows = query
        .bind(&plan.reference_id.0)
        .bind(&plan.body_type)
        .bind(plan.year)
        .bind(*plan.price_range.start())
        .bind(*plan.price_range.end())
        .bind(plan.limit as i64)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(listing_from_row).collect()
}

/// Neighbouring years (never the reference year itself), filling at most `shortfall` rows.
pub async fn secondary(
    conn: &mut DbConnection,
    plan: &SimilarityPlan,
    shortfall: usize,
) -> Result<Vec<Listing>, RepositoryError> {
    if shortfall == 0 {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {LISTING_COLUMNS}
         FROM listing
         WHERE is_current_version = 1
           AND deleted_at IS NULL
           AND status IN ({})
           AND id <> ?
           AND body_type = ?
           AND year BETWEEN ? AND ?
           AND year <> ?
           AND total_price BETWEEN ? AND ?
         ORDER BY year ASC, total_price ASC, published_at DESC, id ASC
         LIMIT ?",
        placeholders(MATCHABLE_STATUSES.len())
    );

    let mut query = sqlx::query(&sql);
    for status in MATCHABLE_STATUSES {
        query = query.bind(status.as_str());
    }
    let rows = query
        .bind(&plan.reference_id.0)
        .bind(&plan.body_type)
        .bind(*plan.year_range.start())
        .bind(*plan.year_range.end())
        .bind(plan.year)
        .bind(*plan.price_range.start())
        .bind(*plan.price_range.end())
        .bind(shortfall as i64)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(listing_from_row).collect()
}
