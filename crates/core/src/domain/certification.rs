use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::listing::{Listing, ListingId};
use crate::domain::owner::Owner;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CertificationRequestId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoucherId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    Activated,
    Redeemed,
    Cancelled,
}

impl VoucherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activated => "activated",
            Self::Redeemed => "redeemed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "activated" => Some(Self::Activated),
            "redeemed" => Some(Self::Redeemed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Listing and owner data frozen at voucher activation time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherSnapshot {
    pub listing_uid: String,
    pub brand: String,
    pub model: String,
    pub sub_model: Option<String>,
    pub year: i32,
    pub total_price: i64,
    pub owner_uid: String,
    pub owner_name: String,
    pub owner_phone: Option<String>,
    pub owner_email: Option<String>,
}

impl VoucherSnapshot {
    pub fn capture(listing: &Listing, owner: &Owner) -> Self {
        Self {
            listing_uid: listing.uid.clone(),
            brand: listing.attributes.brand.clone(),
            model: listing.attributes.model.clone(),
            sub_model: listing.attributes.sub_model.clone(),
            year: listing.attributes.year,
            total_price: listing.pricing.total_price(),
            owner_uid: owner.uid.clone(),
            owner_name: owner.display_name.clone(),
            owner_phone: owner.phone.clone(),
            owner_email: owner.email.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    pub code: String,
    pub status: VoucherStatus,
    pub snapshot: VoucherSnapshot,
    pub activated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationRequest {
    pub id: CertificationRequestId,
    pub listing_id: ListingId,
    pub overall_status: ReviewStatus,
    pub inspection_status: ReviewStatus,
    pub document_status: ReviewStatus,
    pub voucher_id: VoucherId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CertificationRequest {
    /// Overall status follows the sub-reviews: any rejection rejects, all approvals approve.
    pub fn recompute_overall(&mut self) {
        let subs = [self.inspection_status, self.document_status];
        self.overall_status = if subs.contains(&ReviewStatus::Rejected) {
            ReviewStatus::Rejected
        } else if subs.iter().all(|status| *status == ReviewStatus::Approved) {
            ReviewStatus::Approved
        } else {
            ReviewStatus::Pending
        };
    }
}
