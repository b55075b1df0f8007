//! Per-owner add-on counters.
//!
//! Debits are a single guarded decrement so concurrent callers can never take
//! a counter below zero; credits are column-relative upserts.

use chrono::{DateTime, Utc};
use sqlx::Row;

use carmarket_core::domain::addon::{AddOnProduct, OwnerBalance};
use carmarket_core::domain::owner::OwnerId;

use super::{format_timestamp, parse_u32, RepositoryError};
use crate::DbConnection;

pub async fn balance(
    conn: &mut DbConnection,
    owner_id: &OwnerId,
    product: AddOnProduct,
) -> Result<u32, RepositoryError> {
    let value = sqlx::query_scalar::<_, i64>(
        "SELECT balance FROM owner_balance WHERE owner_id = ? AND product = ?",
    )
    .bind(&owner_id.0)
    .bind(product.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    value.map(|value| parse_u32("balance", value)).transpose().map(Option::unwrap_or_default)
}

pub async fn balances(
    conn: &mut DbConnection,
    owner_id: &OwnerId,
) -> Result<Vec<OwnerBalance>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT product, balance FROM owner_balance WHERE owner_id = ? ORDER BY product",
    )
    .bind(&owner_id.0)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            let product_raw = row.try_get::<String, _>("product")?;
            let product = AddOnProduct::parse(&product_raw).ok_or_else(|| {
                RepositoryError::Decode(format!("unknown add-on product `{product_raw}`"))
            })?;
            Ok(OwnerBalance { product, balance: parse_u32("balance", row.try_get("balance")?)? })
        })
        .collect()
}

/// Takes one unit. Returns `false` without touching the row when none is left.
pub async fn debit(
    conn: &mut DbConnection,
    owner_id: &OwnerId,
    product: AddOnProduct,
    now: DateTime<Utc>,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE owner_balance
         SET balance = balance - 1, updated_at = ?
         WHERE owner_id = ? AND product = ? AND balance >= 1",
    )
    .bind(format_timestamp(now))
    .bind(&owner_id.0)
    .bind(product.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn credit(
    conn: &mut DbConnection,
    owner_id: &OwnerId,
    product: AddOnProduct,
    amount: u32,
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO owner_balance (owner_id, product, balance, updated_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(owner_id, product) DO UPDATE SET
            balance = balance + excluded.balance,
            updated_at = excluded.updated_at",
    )
    .bind(&owner_id.0)
    .bind(product.as_str())
    .bind(i64::from(amount))
    .bind(format_timestamp(now))
    .execute(&mut *conn)
    .await?;

    Ok(())
}
