//! Query plan for the similar-listing matcher.
//!
//! The primary pass looks for the same body type and model year within a price
//! band; the secondary pass widens the year window (excluding the exact year)
//! and only fills whatever the primary pass left short.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use crate::config::MatchingConfig;
use crate::domain::listing::{Listing, ListingId, ListingStatus};

/// Statuses a listing must be in to be offered as a similar listing.
pub const MATCHABLE_STATUSES: [ListingStatus; 2] =
    [ListingStatus::Published, ListingStatus::Reserved];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimilarityPlan {
    pub reference_id: ListingId,
    pub body_type: String,
    pub year: i32,
    pub price_range: RangeInclusive<i64>,
    pub year_range: RangeInclusive<i32>,
    pub limit: usize,
}

impl SimilarityPlan {
    pub fn for_reference(reference: &Listing, config: &MatchingConfig) -> Self {
        let total = reference.pricing.total_price();
        let year = reference.attributes.year;
        Self {
            reference_id: reference.id.clone(),
            body_type: reference.attributes.body_type.clone(),
            year,
            price_range: total.saturating_sub(config.price_band)
                ..=total.saturating_add(config.price_band),
            year_range: (year - config.year_window)..=(year + config.year_window),
            limit: config.limit as usize,
        }
    }

    /// How many rows the secondary pass still has to supply.
    pub fn shortfall(&self, primary_len: usize) -> usize {
        self.limit.saturating_sub(primary_len)
    }
}

/// Concatenates both passes, dropping duplicates and the reference itself.
pub fn merge_ranked(
    plan: &SimilarityPlan,
    primary: Vec<Listing>,
    secondary: Vec<Listing>,
) -> Vec<Listing> {
    let mut seen = HashSet::new();
    primary
        .into_iter()
        .chain(secondary)
        .filter(|listing| listing.id != plan.reference_id)
        .filter(|listing| seen.insert(listing.id.clone()))
        .take(plan.limit)
        .collect()
}
