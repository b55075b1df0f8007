use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use carmarket_core::domain::listing::{Listing, ListingId};
use carmarket_core::domain::owner::OwnerId;

pub mod balance;
pub mod bookmark;
pub mod certification;
pub mod listing;
pub mod notification;
pub mod owner;
pub mod revision;
pub mod similar;
pub mod sweep;
pub mod uid;

pub use listing::SqlListingRepository;
pub use notification::SqlNotificationStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("constraint conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(database) if database.is_unique_violation() => {
                Self::Conflict(database.message().to_string())
            }
            _ => Self::Database(error),
        }
    }
}

#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn find_by_id(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError>;

    /// Current versions only, newest first.
    async fn list_for_owner(&self, owner_id: &OwnerId) -> Result<Vec<Listing>, RepositoryError>;
}

/// Fixed-width UTC text so timestamps compare correctly as strings in SQL.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn format_optional_timestamp(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(format_timestamp)
}

pub(crate) fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|timestamp| parse_timestamp(column, timestamp)).transpose()
}

/// `?, ?, ?` with `count` placeholders, for `IN (...)` lists.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
