use sqlx::{sqlite::SqliteRow, Row};

use carmarket_core::domain::addon::AddOnProduct;
use carmarket_core::domain::certification::{
    CertificationRequest, CertificationRequestId, ReviewStatus, Voucher, VoucherId,
    VoucherSnapshot, VoucherStatus,
};
use carmarket_core::domain::listing::ListingId;

use super::{format_timestamp, parse_timestamp, RepositoryError};
use crate::DbConnection;

pub async fn exists_for_listing(
    conn: &mut DbConnection,
    listing_id: &ListingId,
) -> Result<bool, RepositoryError> {
    let exists: i64 = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM certification_request WHERE listing_id = ?)",
    )
    .bind(&listing_id.0)
    .fetch_one(&mut *conn)
    .await?;

    Ok(exists == 1)
}

pub async fn find_for_listing(
    conn: &mut DbConnection,
    listing_id: &ListingId,
) -> Result<Option<CertificationRequest>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, listing_id, overall_status, inspection_status, document_status,
                voucher_id, created_at, updated_at
         FROM certification_request
         WHERE listing_id = ?",
    )
    .bind(&listing_id.0)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(request_from_row).transpose()
}

pub async fn insert_request(
    conn: &mut DbConnection,
    request: &CertificationRequest,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO certification_request (
            id, listing_id, overall_status, inspection_status, document_status,
            voucher_id, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&request.id.0)
    .bind(&request.listing_id.0)
    .bind(request.overall_status.as_str())
    .bind(request.inspection_status.as_str())
    .bind(request.document_status.as_str())
    .bind(&request.voucher_id.0)
    .bind(format_timestamp(request.created_at))
    .bind(format_timestamp(request.updated_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Moves a request from a reviewed shadow onto the live listing it merges into.
pub async fn reassign_listing(
    conn: &mut DbConnection,
    from: &ListingId,
    to: &ListingId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE certification_request SET listing_id = ? WHERE listing_id = ?")
        .bind(&to.0)
        .bind(&from.0)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn insert_voucher(
    conn: &mut DbConnection,
    product: AddOnProduct,
    voucher: &Voucher,
) -> Result<(), RepositoryError> {
    let snapshot = serde_json::to_string(&voucher.snapshot)
        .map_err(|error| RepositoryError::Decode(format!("could not encode snapshot: {error}")))?;

    sqlx::query(
        "INSERT INTO voucher (id, code, product, status, snapshot_json, activated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&voucher.id.0)
    .bind(&voucher.code)
    .bind(product.as_str())
    .bind(voucher.status.as_str())
    .bind(snapshot)
    .bind(format_timestamp(voucher.activated_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn find_voucher(
    conn: &mut DbConnection,
    id: &VoucherId,
) -> Result<Option<Voucher>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, code, status, snapshot_json, activated_at FROM voucher WHERE id = ?",
    )
    .bind(&id.0)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(voucher_from_row).transpose()
}

fn review_status(row: &SqliteRow, column: &str) -> Result<ReviewStatus, RepositoryError> {
    let raw = row.try_get::<String, _>(column)?;
    ReviewStatus::parse(&raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown review status `{raw}` in `{column}`")))
}

fn request_from_row(row: &SqliteRow) -> Result<CertificationRequest, RepositoryError> {
    Ok(CertificationRequest {
        id: CertificationRequestId(row.try_get("id")?),
        listing_id: ListingId(row.try_get("listing_id")?),
        overall_status: review_status(row, "overall_status")?,
        inspection_status: review_status(row, "inspection_status")?,
        document_status: review_status(row, "document_status")?,
        voucher_id: VoucherId(row.try_get("voucher_id")?),
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn voucher_from_row(row: &SqliteRow) -> Result<Voucher, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = VoucherStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown voucher status `{status_raw}`")))?;

    let snapshot_json = row.try_get::<String, _>("snapshot_json")?;
    let snapshot: VoucherSnapshot = serde_json::from_str(&snapshot_json)
        .map_err(|error| RepositoryError::Decode(format!("invalid snapshot_json: {error}")))?;

    Ok(Voucher {
        id: VoucherId(row.try_get("id")?),
        code: row.try_get("code")?,
        status,
        snapshot,
        activated_at: parse_timestamp("activated_at", row.try_get("activated_at")?)?,
    })
}
