use serde::{Deserialize, Serialize};

use crate::domain::listing::{Listing, PendingIntents};

/// Consumable, balance-backed promotional products.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddOnProduct {
    Bump,
    HotDeal,
    CmuCertified,
}

impl AddOnProduct {
    pub const ALL: [AddOnProduct; 3] = [Self::Bump, Self::HotDeal, Self::CmuCertified];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bump => "bump",
            Self::HotDeal => "hot_deal",
            Self::CmuCertified => "cmu_certified",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "bump" => Some(Self::Bump),
            "hot_deal" => Some(Self::HotDeal),
            "cmu_certified" => Some(Self::CmuCertified),
            _ => None,
        }
    }

    pub fn is_intended(&self, intents: &PendingIntents) -> bool {
        match self {
            Self::Bump => intents.bump,
            Self::HotDeal => intents.hot_deal,
            Self::CmuCertified => intents.cmu_certified,
        }
    }

    pub fn set_intent(&self, intents: &mut PendingIntents, value: bool) {
        match self {
            Self::Bump => intents.bump = value,
            Self::HotDeal => intents.hot_deal = value,
            Self::CmuCertified => intents.cmu_certified = value,
        }
    }

    /// Products with a pending intent on the listing, in activation order.
    pub fn intended_on(listing: &Listing) -> Vec<AddOnProduct> {
        Self::ALL.into_iter().filter(|product| product.is_intended(&listing.intents)).collect()
    }
}

impl std::fmt::Display for AddOnProduct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerBalance {
    pub product: AddOnProduct,
    pub balance: u32,
}
