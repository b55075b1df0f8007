use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::owner::OwnerId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub String);

impl ListingId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    Draft,
    PendingApproval,
    ActionRequired,
    Published,
    PendingEditApproval,
    NeedAction,
    NotApproved,
    Reserved,
    SoldOut,
    Expired,
    Deleted,
}

impl ListingStatus {
    pub const ALL: [ListingStatus; 11] = [
        Self::Draft,
        Self::PendingApproval,
        Self::ActionRequired,
        Self::Published,
        Self::PendingEditApproval,
        Self::NeedAction,
        Self::NotApproved,
        Self::Reserved,
        Self::SoldOut,
        Self::Expired,
        Self::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::ActionRequired => "action_required",
            Self::Published => "published",
            Self::PendingEditApproval => "pending_edit_approval",
            Self::NeedAction => "need_action",
            Self::NotApproved => "not_approved",
            Self::Reserved => "reserved",
            Self::SoldOut => "sold_out",
            Self::Expired => "expired",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "pending_approval" => Some(Self::PendingApproval),
            "action_required" => Some(Self::ActionRequired),
            "published" => Some(Self::Published),
            "pending_edit_approval" => Some(Self::PendingEditApproval),
            "need_action" => Some(Self::NeedAction),
            "not_approved" => Some(Self::NotApproved),
            "reserved" => Some(Self::Reserved),
            "sold_out" => Some(Self::SoldOut),
            "expired" => Some(Self::Expired),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Statuses that occupy one of the owner's post-limit slots.
    pub const fn occupies_post_slot(&self) -> bool {
        matches!(
            self,
            Self::Published | Self::Reserved | Self::ActionRequired | Self::PendingApproval
        )
    }

    /// Statuses from which an add-on request is recorded as a prepaid intent.
    pub const fn accepts_intents(&self) -> bool {
        matches!(
            self,
            Self::Draft
                | Self::PendingApproval
                | Self::ActionRequired
                | Self::PendingEditApproval
                | Self::NeedAction
        )
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Gasoline,
    Diesel,
    Hybrid,
    Electric,
    Other,
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gasoline => "gasoline",
            Self::Diesel => "diesel",
            Self::Hybrid => "hybrid",
            Self::Electric => "electric",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gasoline" | "petrol" => Some(Self::Gasoline),
            "diesel" => Some(Self::Diesel),
            "hybrid" => Some(Self::Hybrid),
            "electric" | "ev" => Some(Self::Electric),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn code_letter(&self) -> char {
        match self {
            Self::Gasoline => 'G',
            Self::Diesel => 'D',
            Self::Hybrid => 'H',
            Self::Electric => 'E',
            Self::Other => 'O',
        }
    }
}

/// Price, optional discount and the derived total, in whole currency units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    price: i64,
    discount: Option<i64>,
    total_price: i64,
}

impl Pricing {
    pub fn new(price: i64, discount: Option<i64>) -> Result<Self, DomainError> {
        if price < 0 {
            return Err(DomainError::InvariantViolation(format!(
                "price must not be negative (got {price})"
            )));
        }
        if let Some(discount) = discount {
            if discount < 0 || discount > price {
                return Err(DomainError::InvariantViolation(format!(
                    "discount {discount} must be within 0..={price}"
                )));
            }
        }

        Ok(Self { price, discount, total_price: price - discount.unwrap_or(0) })
    }

    pub fn price(&self) -> i64 {
        self.price
    }

    pub fn discount(&self) -> Option<i64> {
        self.discount
    }

    pub fn total_price(&self) -> i64 {
        self.total_price
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleAttributes {
    pub brand: String,
    pub model: String,
    pub sub_model: Option<String>,
    pub body_type: String,
    pub year: i32,
    pub fuel_type: FuelType,
    pub transmission: Option<String>,
    pub color: Option<String>,
    pub mileage_km: Option<i64>,
    pub province: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingIntents {
    pub bump: bool,
    pub hot_deal: bool,
    pub cmu_certified: bool,
}

impl PendingIntents {
    pub fn any(&self) -> bool {
        self.bump || self.hot_deal || self.cmu_certified
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub is_bumped: bool,
    pub is_hot_dealed: bool,
    pub is_cmu_certified: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleTimestamps {
    pub submitted_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub reserved_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub dumped_at: Option<DateTime<Utc>>,
    pub sold_at: Option<DateTime<Utc>>,
    pub hot_dealed_at: Option<DateTime<Utc>>,
    pub bumped_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub uid: String,
    pub owner_id: OwnerId,
    pub status: ListingStatus,
    pub is_current_version: bool,
    pub is_under_revision: bool,
    pub intents: PendingIntents,
    pub promotion: Promotion,
    pub timestamps: LifecycleTimestamps,
    pub pricing: Pricing,
    pub attributes: VehicleAttributes,
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Mutable, owner-editable part of a listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListingChanges {
    pub attributes: VehicleAttributes,
    pub pricing: Pricing,
    pub attachments: Vec<String>,
}

impl Listing {
    pub fn has_modified_attachments(&self, attachments: &[String]) -> bool {
        let mut current = self.attachments.clone();
        let mut next = attachments.to_vec();
        current.sort();
        next.sort();
        current != next
    }

    pub fn apply_changes(&mut self, changes: ListingChanges, now: DateTime<Utc>) {
        self.attributes = changes.attributes;
        self.pricing = changes.pricing;
        self.attachments = changes.attachments;
        self.updated_at = now;
    }

    /// Builds the pending-edit copy of a published listing.
    pub fn to_shadow(&self, now: DateTime<Utc>) -> Listing {
        Listing {
            id: ListingId::generate(),
            status: ListingStatus::PendingEditApproval,
            is_current_version: false,
            is_under_revision: false,
            timestamps: LifecycleTimestamps { submitted_at: Some(now), ..self.timestamps },
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Copies the reviewed outcome of a shadow back onto this live row.
    pub fn merge_from_shadow(&mut self, shadow: &Listing, now: DateTime<Utc>) {
        self.status = shadow.status;
        self.attributes = shadow.attributes.clone();
        self.pricing = shadow.pricing;
        self.attachments = shadow.attachments.clone();
        self.intents = shadow.intents;
        self.timestamps.submitted_at = shadow.timestamps.submitted_at;
        self.timestamps.published_at = shadow.timestamps.published_at;
        self.timestamps.rejected_at = shadow.timestamps.rejected_at;
        self.timestamps.expired_at = shadow.timestamps.expired_at;

        // Promotions live on the current row while the edit is pending; sweeps
        // only clear them there. The shadow wins only for what it activated itself.
        let since = shadow.created_at;
        if activated_since(shadow.timestamps.bumped_at, since) {
            self.promotion.is_bumped = shadow.promotion.is_bumped;
            self.timestamps.bumped_at = shadow.timestamps.bumped_at;
        }
        if activated_since(shadow.timestamps.hot_dealed_at, since) {
            self.promotion.is_hot_dealed = shadow.promotion.is_hot_dealed;
            self.timestamps.hot_dealed_at = shadow.timestamps.hot_dealed_at;
        }
        self.promotion.is_cmu_certified |= shadow.promotion.is_cmu_certified;
        self.is_under_revision = false;
        self.updated_at = now;
    }
}

fn activated_since(at: Option<DateTime<Utc>>, since: DateTime<Utc>) -> bool {
    at.is_some_and(|at| at >= since)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionLink {
    pub current_id: ListingId,
    pub shadow_id: ListingId,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShadowListing {
    pub link: RevisionLink,
    pub listing: Listing,
}

/// Result of an update: either the live row itself or the pending-edit copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ListingVersion {
    Current(Listing),
    Shadow(ShadowListing),
}

impl ListingVersion {
    pub fn listing(&self) -> &Listing {
        match self {
            Self::Current(listing) => listing,
            Self::Shadow(shadow) => &shadow.listing,
        }
    }
}
