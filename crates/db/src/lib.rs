pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbConnection, DbPool};
pub use fixtures::{DemoSeedDataset, ListingSeedInfo, SeedResult, VerificationResult};
pub use repositories::{
    ListingRepository, RepositoryError, SqlListingRepository, SqlNotificationStore,
};
