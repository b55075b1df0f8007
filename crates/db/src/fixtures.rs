use crate::connection::DbPool;
use crate::repositories::RepositoryError;
use sqlx::Executor;

/// Listing states the demo dataset promises to contain.
const SEED_LISTINGS: &[SeedListingContract] = &[
    SeedListingContract {
        listing_id: "listing-demo-published",
        uid: "DTOBAG-001",
        status: "published",
        is_current_version: true,
        description: "Published sedan with a pending edit",
    },
    SeedListingContract {
        listing_id: "listing-demo-shadow",
        uid: "DTOBAG-001",
        status: "pending_edit_approval",
        is_current_version: false,
        description: "Shadow copy awaiting edit approval",
    },
    SeedListingContract {
        listing_id: "listing-demo-reserved",
        uid: "DHOBAG-002",
        status: "reserved",
        is_current_version: true,
        description: "Reserved sedan in the same body type and year",
    },
    SeedListingContract {
        listing_id: "listing-demo-draft",
        uid: "DMABAD-003",
        status: "draft",
        is_current_version: true,
        description: "Draft pickup holding a prepaid bump intent",
    },
    SeedListingContract {
        listing_id: "listing-demo-expired",
        uid: "PNICHH-001",
        status: "expired",
        is_current_version: true,
        description: "Private seller listing past its published age",
    },
];

const SEED_OWNER_IDS: &[&str] = &["owner-demo-dealer", "owner-demo-private"];

/// Deterministic marketplace data for local runs and smoke checks.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    /// Loads the dataset. Re-running is a no-op for rows that already exist.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let listings_seeded = SEED_LISTINGS
            .iter()
            .map(|listing| ListingSeedInfo {
                listing_id: listing.listing_id,
                status: listing.status,
                description: listing.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { owners_seeded: SEED_OWNER_IDS.len(), listings_seeded })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let owner_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM owner WHERE id IN {}",
            sql_array_from_ids(SEED_OWNER_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("demo-owners", owner_count == SEED_OWNER_IDS.len() as i64));

        for listing in SEED_LISTINGS {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                    SELECT 1 FROM listing
                    WHERE id = ?1 AND uid = ?2 AND status = ?3 AND is_current_version = ?4
                 )",
            )
            .bind(listing.listing_id)
            .bind(listing.uid)
            .bind(listing.status)
            .bind(listing.is_current_version)
            .fetch_one(pool)
            .await?;
            checks.push((listing.listing_id, present == 1));
        }

        let revision_linked: i64 = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM listing_revision
                WHERE current_id = 'listing-demo-published' AND shadow_id = 'listing-demo-shadow'
             )",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("demo-revision-link", revision_linked == 1));

        let dealer_hot_deals: Option<i64> = sqlx::query_scalar(
            "SELECT balance FROM owner_balance WHERE owner_id = 'owner-demo-dealer' AND product = 'hot_deal'",
        )
        .fetch_optional(pool)
        .await?;
        checks.push(("demo-dealer-balance", dealer_hot_deals == Some(2)));

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let listing_ids =
            SEED_LISTINGS.iter().map(|listing| listing.listing_id).collect::<Vec<_>>();
        let quoted_listings = sql_array_from_ids(&listing_ids);
        let quoted_owners = sql_array_from_ids(SEED_OWNER_IDS);

        sqlx::query(&format!("DELETE FROM listing_revision WHERE current_id IN {quoted_listings}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM bookmark WHERE listing_id IN {quoted_listings}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM listing WHERE id IN {quoted_listings}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM owner_balance WHERE owner_id IN {quoted_owners}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM owner WHERE id IN {quoted_owners}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedListingContract {
    listing_id: &'static str,
    uid: &'static str,
    status: &'static str,
    is_current_version: bool,
    description: &'static str,
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub owners_seeded: usize,
    pub listings_seeded: Vec<ListingSeedInfo>,
}

#[derive(Debug)]
pub struct ListingSeedInfo {
    pub listing_id: &'static str,
    pub status: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
