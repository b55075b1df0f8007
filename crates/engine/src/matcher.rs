use tracing::debug;

use carmarket_core::config::MatchingConfig;
use carmarket_core::domain::listing::{Listing, ListingId};
use carmarket_core::errors::DomainError;
use carmarket_core::similar::{merge_ranked, SimilarityPlan};
use carmarket_db::repositories::{listing, revision, similar};
use carmarket_db::DbPool;

use crate::EngineError;

/// Ranks published or reserved listings that look like a reference listing.
#[derive(Clone)]
pub struct SimilarListingMatcher {
    pool: DbPool,
    matching: MatchingConfig,
}

impl SimilarListingMatcher {
    pub fn new(pool: DbPool, matching: MatchingConfig) -> Self {
        Self { pool, matching }
    }

    /// Same-year matches first; neighbouring years only top up a short list.
    pub async fn find_similar(&self, id: &ListingId) -> Result<Vec<Listing>, EngineError> {
        let mut conn = self.pool.acquire().await?;
        let reference =
            listing::find(&mut conn, id).await?.ok_or_else(|| DomainError::listing_not_found(id))?;

        let mut plan = SimilarityPlan::for_reference(&reference, &self.matching);
        if !reference.is_current_version {
            // A pending edit ranks by its own attributes but must not list its live row.
            if let Some(link) = revision::find_by_shadow(&mut conn, &reference.id).await? {
                plan.reference_id = link.current_id;
            }
        }
        let primary = similar::primary(&mut conn, &plan).await?;
        let shortfall = plan.shortfall(primary.len());
        let secondary = similar::secondary(&mut conn, &plan, shortfall).await?;

        debug!(
            event_name = "similar.ranked",
            listing_id = %id,
            primary = primary.len(),
            secondary = secondary.len(),
            "similar listings ranked"
        );
        Ok(merge_ranked(&plan, primary, secondary))
    }
}
