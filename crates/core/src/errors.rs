use thiserror::Error;

use crate::domain::addon::AddOnProduct;
use crate::domain::listing::{ListingId, ListingStatus};
use crate::domain::owner::OwnerId;
use crate::lifecycle::{ActorKind, LifecycleError};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("listing {id} cannot move from {from} to {requested} as {actor}")]
    InvalidState { id: ListingId, from: ListingStatus, requested: String, actor: ActorKind },
    #[error("owner {owner_id} has insufficient {product} balance (available {available})")]
    InsufficientBalance { owner_id: OwnerId, product: AddOnProduct, available: u32 },
    #[error("owner {owner_id} reached the post limit ({active} active of {limit})")]
    LimitExceeded { owner_id: OwnerId, active: u32, limit: u32 },
    #[error("conflict on {id}: {reason}")]
    Conflict { id: String, reason: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn listing_not_found(id: &ListingId) -> Self {
        Self::NotFound { entity: "listing", id: id.0.clone() }
    }

    pub fn owner_not_found(id: &OwnerId) -> Self {
        Self::NotFound { entity: "owner", id: id.0.clone() }
    }

    pub fn from_lifecycle(id: &ListingId, error: LifecycleError) -> Self {
        match error {
            LifecycleError::TransitionRejected { from, requested, actor } => Self::InvalidState {
                id: id.clone(),
                from,
                requested: requested.as_str().to_string(),
                actor,
            },
            LifecycleError::OperationRejected { operation, from } => Self::InvalidState {
                id: id.clone(),
                from,
                requested: operation.as_str().to_string(),
                actor: operation.actor(),
            },
        }
    }
}
