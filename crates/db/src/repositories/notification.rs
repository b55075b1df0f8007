use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use carmarket_core::domain::listing::ListingId;
use carmarket_core::domain::owner::OwnerId;
use carmarket_core::ports::{Notification, NotificationError, NotificationRequest, NotificationSender};

use super::{format_timestamp, parse_timestamp, RepositoryError};
use crate::DbPool;

/// In-app notification rows backing the engine's notification port.
#[derive(Clone)]
pub struct SqlNotificationStore {
    pool: DbPool,
}

impl SqlNotificationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_owner(
        &self,
        owner_id: &OwnerId,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, owner_id, kind, subtype, listing_id, payload_json, created_at
             FROM notification
             WHERE owner_id = ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(&owner_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(notification_from_row).collect()
    }
}

#[async_trait]
impl NotificationSender for SqlNotificationStore {
    async fn create(&self, request: NotificationRequest) -> Result<(), NotificationError> {
        let payload = serde_json::to_string(&request.payload)
            .map_err(|error| NotificationError::InvalidPayload(error.to_string()))?;

        sqlx::query(
            "INSERT INTO notification (id, owner_id, kind, subtype, listing_id, payload_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&request.owner_id.0)
        .bind(&request.kind)
        .bind(&request.subtype)
        .bind(request.listing_id.as_ref().map(|id| id.0.as_str()))
        .bind(payload)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|error| NotificationError::Unavailable(error.to_string()))?;

        Ok(())
    }

    async fn exists(
        &self,
        owner_id: &OwnerId,
        subtype: &str,
        listing_id: &ListingId,
    ) -> Result<bool, NotificationError> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM notification
                WHERE owner_id = ? AND subtype = ? AND listing_id = ?
             )",
        )
        .bind(&owner_id.0)
        .bind(subtype)
        .bind(&listing_id.0)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| NotificationError::Unavailable(error.to_string()))?;

        Ok(exists == 1)
    }
}

fn notification_from_row(row: &SqliteRow) -> Result<Notification, RepositoryError> {
    let payload_json = row.try_get::<String, _>("payload_json")?;
    let payload = serde_json::from_str(&payload_json)
        .map_err(|error| RepositoryError::Decode(format!("invalid payload_json: {error}")))?;

    Ok(Notification {
        id: row.try_get("id")?,
        owner_id: OwnerId(row.try_get("owner_id")?),
        kind: row.try_get("kind")?,
        subtype: row.try_get("subtype")?,
        listing_id: row.try_get::<Option<String>, _>("listing_id")?.map(ListingId),
        payload,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
