use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use carmarket_core::domain::owner::{Owner, OwnerId, OwnerKind};

use super::{format_timestamp, parse_u32, RepositoryError};
use crate::DbConnection;

pub async fn find(conn: &mut DbConnection, id: &OwnerId) -> Result<Option<Owner>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, uid, kind, display_name, phone, email, province, post_limit
         FROM owner
         WHERE id = ?",
    )
    .bind(&id.0)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(owner_from_row).transpose()
}

pub async fn insert(
    conn: &mut DbConnection,
    owner: &Owner,
    created_at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO owner (id, uid, kind, display_name, phone, email, province, post_limit, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&owner.id.0)
    .bind(&owner.uid)
    .bind(owner.kind.as_str())
    .bind(&owner.display_name)
    .bind(owner.phone.as_deref())
    .bind(owner.email.as_deref())
    .bind(&owner.province)
    .bind(i64::from(owner.post_limit))
    .bind(format_timestamp(created_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn owner_from_row(row: &SqliteRow) -> Result<Owner, RepositoryError> {
    let kind_raw = row.try_get::<String, _>("kind")?;
    let kind = OwnerKind::parse(&kind_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown owner kind `{kind_raw}`")))?;

    Ok(Owner {
        id: OwnerId(row.try_get("id")?),
        uid: row.try_get("uid")?,
        kind,
        display_name: row.try_get("display_name")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        province: row.try_get("province")?,
        post_limit: parse_u32("post_limit", row.try_get("post_limit")?)?,
    })
}
