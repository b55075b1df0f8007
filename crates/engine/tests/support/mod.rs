#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use carmarket_core::audit::InMemoryAuditSink;
use carmarket_core::config::MatchingConfig;
use carmarket_core::domain::addon::AddOnProduct;
use carmarket_core::domain::listing::{
    FuelType, LifecycleTimestamps, Listing, ListingChanges, ListingId, ListingStatus,
    PendingIntents, Pricing, Promotion, VehicleAttributes,
};
use carmarket_core::domain::owner::{Owner, OwnerId, OwnerKind};
use carmarket_core::ports::InMemoryEmailSender;
use carmarket_db::repositories::{balance, listing, owner};
use carmarket_db::{connect_with_settings, migrations, DbPool};
use carmarket_engine::{ledger, ListingService};

pub struct Harness {
    pub pool: DbPool,
    pub service: ListingService,
    pub emails: InMemoryEmailSender,
    pub audit: InMemoryAuditSink,
}

pub async fn harness() -> Harness {
    harness_on(setup().await)
}

/// Same wiring over a file database, so several connections can hold
/// transactions at once.
pub async fn file_harness(dir: &TempDir) -> Harness {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("carmarket.db").display());
    let pool = connect_with_settings(&url, 4, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("run migrations");
    harness_on(pool)
}

fn harness_on(pool: DbPool) -> Harness {
    let emails = InMemoryEmailSender::default();
    let audit = InMemoryAuditSink::default();
    let service = ListingService::new(pool.clone(), matching())
        .with_email_sender(Arc::new(emails.clone()))
        .with_audit_sink(Arc::new(audit.clone()));
    Harness { pool, service, emails, audit }
}

pub async fn setup() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("run migrations");
    pool
}

pub fn matching() -> MatchingConfig {
    MatchingConfig { limit: 20, price_band: 50_000, year_window: 2 }
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().expect("valid date")
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    fixed_now() - Duration::days(days)
}

pub async fn insert_owner(pool: &DbPool, id: &str, post_limit: u32) -> Owner {
    let owner = Owner {
        id: OwnerId(id.to_string()),
        uid: format!("UID-{id}"),
        kind: OwnerKind::Dealer,
        display_name: format!("Dealer {id}"),
        phone: None,
        email: Some(format!("{}@dealers.example", id.to_ascii_lowercase())),
        province: "Bangkok".to_string(),
        post_limit,
    };
    let mut conn = pool.acquire().await.expect("acquire");
    owner::insert(&mut conn, &owner, fixed_now()).await.expect("insert owner");
    owner
}

pub async fn grant(pool: &DbPool, owner_id: &OwnerId, product: AddOnProduct, amount: u32) {
    let mut conn = pool.acquire().await.expect("acquire");
    ledger::credit(&mut conn, owner_id, product, amount, fixed_now()).await.expect("credit");
}

pub async fn balance_of(pool: &DbPool, owner_id: &OwnerId, product: AddOnProduct) -> u32 {
    let mut conn = pool.acquire().await.expect("acquire");
    balance::balance(&mut conn, owner_id, product).await.expect("balance")
}

pub fn attributes() -> VehicleAttributes {
    VehicleAttributes {
        brand: "Toyota".to_string(),
        model: "Camry".to_string(),
        sub_model: None,
        body_type: "sedan".to_string(),
        year: 2020,
        fuel_type: FuelType::Gasoline,
        transmission: Some("auto".to_string()),
        color: Some("white".to_string()),
        mileage_km: Some(42_000),
        province: "Bangkok".to_string(),
    }
}

pub fn changes(attachments: &[&str]) -> ListingChanges {
    ListingChanges {
        attributes: attributes(),
        pricing: Pricing::new(500_000, None).expect("pricing"),
        attachments: attachments.iter().map(|name| name.to_string()).collect(),
    }
}

/// Stores a current-version row directly, bypassing the service.
pub async fn insert_listing(
    pool: &DbPool,
    owner_id: &OwnerId,
    uid: &str,
    status: ListingStatus,
    edit: impl FnOnce(&mut Listing),
) -> Listing {
    let now = fixed_now();
    let mut row = Listing {
        id: ListingId::generate(),
        uid: uid.to_string(),
        owner_id: owner_id.clone(),
        status,
        is_current_version: true,
        is_under_revision: false,
        intents: PendingIntents::default(),
        promotion: Promotion::default(),
        timestamps: LifecycleTimestamps::default(),
        pricing: Pricing::new(500_000, None).expect("pricing"),
        attributes: attributes(),
        attachments: vec!["front.jpg".to_string()],
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    if matches!(status, ListingStatus::Published | ListingStatus::Reserved | ListingStatus::Expired) {
        row.timestamps.published_at = Some(now);
    }
    edit(&mut row);

    let mut conn = pool.acquire().await.expect("acquire");
    listing::insert(&mut conn, &row).await.expect("insert listing");
    row
}

pub async fn reload(pool: &DbPool, id: &ListingId) -> Option<Listing> {
    let mut conn = pool.acquire().await.expect("acquire");
    listing::find(&mut conn, id).await.expect("find listing")
}
