use carmarket_core::domain::listing::Listing;
use carmarket_core::domain::owner::OwnerId;
use carmarket_core::errors::DomainError;
use carmarket_core::lifecycle::ActorKind;

/// Who is asking. Owners act on their own listings; reviewers on any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Actor {
    Owner(OwnerId),
    Reviewer(String),
}

impl Actor {
    pub fn kind(&self) -> ActorKind {
        match self {
            Self::Owner(_) => ActorKind::Owner,
            Self::Reviewer(_) => ActorKind::Reviewer,
        }
    }

    /// Audit label, e.g. `owner:O-1`.
    pub fn label(&self) -> String {
        match self {
            Self::Owner(owner_id) => format!("owner:{owner_id}"),
            Self::Reviewer(reviewer_id) => format!("reviewer:{reviewer_id}"),
        }
    }

    /// Foreign listings look missing to owners so their existence is not disclosed.
    pub fn ensure_can_see(&self, listing: &Listing) -> Result<(), DomainError> {
        match self {
            Self::Owner(owner_id) if *owner_id != listing.owner_id => {
                Err(DomainError::listing_not_found(&listing.id))
            }
            _ => Ok(()),
        }
    }
}
