use sqlx::{sqlite::SqliteRow, Row};

use carmarket_core::domain::listing::{
    FuelType, LifecycleTimestamps, Listing, ListingId, ListingStatus, PendingIntents, Pricing,
    Promotion, VehicleAttributes,
};
use carmarket_core::domain::owner::OwnerId;

use super::{
    format_optional_timestamp, format_timestamp, parse_optional_timestamp, parse_timestamp,
    placeholders, ListingRepository, RepositoryError,
};
use crate::{DbConnection, DbPool};

pub(crate) const LISTING_COLUMNS: &str = "
    id, uid, owner_id, status, is_current_version, is_under_revision,
    will_have_bump, will_have_hot_deal, will_have_cmu_certified,
    is_bumped, is_hot_dealed, is_cmu_certified,
    submitted_at, published_at, rejected_at, reserved_at, expired_at,
    dumped_at, sold_at, hot_dealed_at, bumped_at,
    price, discount, total_price,
    brand, model, sub_model, body_type, year, fuel_type, transmission, color,
    mileage_km, province, attachments_json,
    created_at, updated_at, deleted_at";

pub struct SqlListingRepository {
    pool: DbPool,
}

impl SqlListingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ListingRepository for SqlListingRepository {
    async fn find_by_id(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, id).await
    }

    async fn list_for_owner(&self, owner_id: &OwnerId) -> Result<Vec<Listing>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {LISTING_COLUMNS}
             FROM listing
             WHERE owner_id = ? AND is_current_version = 1
             ORDER BY created_at DESC"
        ))
        .bind(&owner_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(listing_from_row).collect()
    }
}

pub async fn find(conn: &mut DbConnection, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
    let row = sqlx::query(&format!("SELECT {LISTING_COLUMNS} FROM listing WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(listing_from_row).transpose()
}

pub async fn insert(conn: &mut DbConnection, listing: &Listing) -> Result<(), RepositoryError> {
    let attachments = encode_attachments(&listing.attachments)?;
    let timestamps = &listing.timestamps;

    sqlx::query(&format!(
        "INSERT INTO listing ({LISTING_COLUMNS})
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                 ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&listing.id.0)
    .bind(&listing.uid)
    .bind(&listing.owner_id.0)
    .bind(listing.status.as_str())
    .bind(listing.is_current_version)
    .bind(listing.is_under_revision)
    .bind(listing.intents.bump)
    .bind(listing.intents.hot_deal)
    .bind(listing.intents.cmu_certified)
    .bind(listing.promotion.is_bumped)
    .bind(listing.promotion.is_hot_dealed)
    .bind(listing.promotion.is_cmu_certified)
    .bind(format_optional_timestamp(timestamps.submitted_at))
    .bind(format_optional_timestamp(timestamps.published_at))
    .bind(format_optional_timestamp(timestamps.rejected_at))
    .bind(format_optional_timestamp(timestamps.reserved_at))
    .bind(format_optional_timestamp(timestamps.expired_at))
    .bind(format_optional_timestamp(timestamps.dumped_at))
    .bind(format_optional_timestamp(timestamps.sold_at))
    .bind(format_optional_timestamp(timestamps.hot_dealed_at))
    .bind(format_optional_timestamp(timestamps.bumped_at))
    .bind(listing.pricing.price())
    .bind(listing.pricing.discount())
    .bind(listing.pricing.total_price())
    .bind(&listing.attributes.brand)
    .bind(&listing.attributes.model)
    .bind(listing.attributes.sub_model.as_deref())
    .bind(&listing.attributes.body_type)
    .bind(listing.attributes.year)
    .bind(listing.attributes.fuel_type.as_str())
    .bind(listing.attributes.transmission.as_deref())
    .bind(listing.attributes.color.as_deref())
    .bind(listing.attributes.mileage_km)
    .bind(&listing.attributes.province)
    .bind(attachments)
    .bind(format_timestamp(listing.created_at))
    .bind(format_timestamp(listing.updated_at))
    .bind(format_optional_timestamp(listing.deleted_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes every mutable column of an existing row; identity columns are left alone.
pub async fn update(conn: &mut DbConnection, listing: &Listing) -> Result<(), RepositoryError> {
    let attachments = encode_attachments(&listing.attachments)?;
    let timestamps = &listing.timestamps;

    let result = sqlx::query(
        "UPDATE listing SET
            status = ?,
            is_current_version = ?,
            is_under_revision = ?,
            will_have_bump = ?,
            will_have_hot_deal = ?,
            will_have_cmu_certified = ?,
            is_bumped = ?,
            is_hot_dealed = ?,
            is_cmu_certified = ?,
            submitted_at = ?,
            published_at = ?,
            rejected_at = ?,
            reserved_at = ?,
            expired_at = ?,
            dumped_at = ?,
            sold_at = ?,
            hot_dealed_at = ?,
            bumped_at = ?,
            price = ?,
            discount = ?,
            total_price = ?,
            brand = ?,
            model = ?,
            sub_model = ?,
            body_type = ?,
            year = ?,
            fuel_type = ?,
            transmission = ?,
            color = ?,
            mileage_km = ?,
            province = ?,
            attachments_json = ?,
            updated_at = ?,
            deleted_at = ?
         WHERE id = ?",
    )
    .bind(listing.status.as_str())
    .bind(listing.is_current_version)
    .bind(listing.is_under_revision)
    .bind(listing.intents.bump)
    .bind(listing.intents.hot_deal)
    .bind(listing.intents.cmu_certified)
    .bind(listing.promotion.is_bumped)
    .bind(listing.promotion.is_hot_dealed)
    .bind(listing.promotion.is_cmu_certified)
    .bind(format_optional_timestamp(timestamps.submitted_at))
    .bind(format_optional_timestamp(timestamps.published_at))
    .bind(format_optional_timestamp(timestamps.rejected_at))
    .bind(format_optional_timestamp(timestamps.reserved_at))
    .bind(format_optional_timestamp(timestamps.expired_at))
    .bind(format_optional_timestamp(timestamps.dumped_at))
    .bind(format_optional_timestamp(timestamps.sold_at))
    .bind(format_optional_timestamp(timestamps.hot_dealed_at))
    .bind(format_optional_timestamp(timestamps.bumped_at))
    .bind(listing.pricing.price())
    .bind(listing.pricing.discount())
    .bind(listing.pricing.total_price())
    .bind(&listing.attributes.brand)
    .bind(&listing.attributes.model)
    .bind(listing.attributes.sub_model.as_deref())
    .bind(&listing.attributes.body_type)
    .bind(listing.attributes.year)
    .bind(listing.attributes.fuel_type.as_str())
    .bind(listing.attributes.transmission.as_deref())
    .bind(listing.attributes.color.as_deref())
    .bind(listing.attributes.mileage_km)
    .bind(&listing.attributes.province)
    .bind(attachments)
    .bind(format_timestamp(listing.updated_at))
    .bind(format_optional_timestamp(listing.deleted_at))
    .bind(&listing.id.0)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Decode(format!("listing `{}` does not exist", listing.id)));
    }
    Ok(())
}

pub async fn delete(conn: &mut DbConnection, id: &ListingId) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM listing WHERE id = ?").bind(&id.0).execute(&mut *conn).await?;
    Ok(())
}

/// Current listings of `owner_id` holding a post-limit slot, ignoring `exclude`.
pub async fn count_post_slots(
    conn: &mut DbConnection,
    owner_id: &OwnerId,
    exclude: &[&ListingId],
) -> Result<u32, RepositoryError> {
    let occupying: Vec<ListingStatus> =
        ListingStatus::ALL.into_iter().filter(ListingStatus::occupies_post_slot).collect();

    let mut sql = format!(
        "SELECT COUNT(1) FROM listing
         WHERE owner_id = ?
           AND is_current_version = 1
           AND deleted_at IS NULL
           AND status IN ({})",
        placeholders(occupying.len())
    );
    if !exclude.is_empty() {
        sql.push_str(&format!(" AND id NOT IN ({})", placeholders(exclude.len())));
    }

    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(&owner_id.0);
    for status in &occupying {
        query = query.bind(status.as_str());
    }
    for id in exclude {
        query = query.bind(&id.0);
    }

    let count = query.fetch_one(&mut *conn).await?;
    super::parse_u32("post_slot_count", count)
}

pub(crate) fn listing_from_row(row: &SqliteRow) -> Result<Listing, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = ListingStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown listing status `{status_raw}`")))?;

    let fuel_raw = row.try_get::<String, _>("fuel_type")?;
    let fuel_type = FuelType::parse(&fuel_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown fuel type `{fuel_raw}`")))?;

    let pricing = Pricing::new(row.try_get("price")?, row.try_get("discount")?)
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    let attachments_json = row.try_get::<String, _>("attachments_json")?;
    let attachments: Vec<String> = serde_json::from_str(&attachments_json)
        .map_err(|error| RepositoryError::Decode(format!("invalid attachments_json: {error}")))?;

    Ok(Listing {
        id: ListingId(row.try_get("id")?),
        uid: row.try_get("uid")?,
        owner_id: OwnerId(row.try_get("owner_id")?),
        status,
        is_current_version: row.try_get("is_current_version")?,
        is_under_revision: row.try_get("is_under_revision")?,
        intents: PendingIntents {
            bump: row.try_get("will_have_bump")?,
            hot_deal: row.try_get("will_have_hot_deal")?,
            cmu_certified: row.try_get("will_have_cmu_certified")?,
        },
        promotion: Promotion {
            is_bumped: row.try_get("is_bumped")?,
            is_hot_dealed: row.try_get("is_hot_dealed")?,
            is_cmu_certified: row.try_get("is_cmu_certified")?,
        },
        timestamps: LifecycleTimestamps {
            submitted_at: parse_optional_timestamp("submitted_at", row.try_get("submitted_at")?)?,
            published_at: parse_optional_timestamp("published_at", row.try_get("published_at")?)?,
            rejected_at: parse_optional_timestamp("rejected_at", row.try_get("rejected_at")?)?,
            reserved_at: parse_optional_timestamp("reserved_at", row.try_get("reserved_at")?)?,
            expired_at: parse_optional_timestamp("expired_at", row.try_get("expired_at")?)?,
            dumped_at: parse_optional_timestamp("dumped_at", row.try_get("dumped_at")?)?,
            sold_at: parse_optional_timestamp("sold_at", row.try_get("sold_at")?)?,
            hot_dealed_at: parse_optional_timestamp(
                "hot_dealed_at",
                row.try_get("hot_dealed_at")?,
            )?,
            bumped_at: parse_optional_timestamp("bumped_at", row.try_get("bumped_at")?)?,
        },
        pricing,
        attributes: VehicleAttributes {
            brand: row.try_get("brand")?,
            model: row.try_get("model")?,
            sub_model: row.try_get("sub_model")?,
            body_type: row.try_get("body_type")?,
            year: row.try_get("year")?,
            fuel_type,
            transmission: row.try_get("transmission")?,
            color: row.try_get("color")?,
            mileage_km: row.try_get("mileage_km")?,
            province: row.try_get("province")?,
        },
        attachments,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
        deleted_at: parse_optional_timestamp("deleted_at", row.try_get("deleted_at")?)?,
    })
}

fn encode_attachments(attachments: &[String]) -> Result<String, RepositoryError> {
    serde_json::to_string(attachments)
        .map_err(|error| RepositoryError::Decode(format!("could not encode attachments: {error}")))
}
