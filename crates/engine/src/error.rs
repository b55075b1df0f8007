use thiserror::Error;

use carmarket_core::domain::addon::AddOnProduct;
use carmarket_core::domain::listing::ListingId;
use carmarket_core::errors::DomainError;
use carmarket_db::RepositoryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// The whole activation block was rolled back.
    #[error("activating {product} on listing {listing_id} failed: {source}")]
    Activation {
        listing_id: ListingId,
        product: AddOnProduct,
        #[source]
        source: Box<EngineError>,
    },
}

impl From<sqlx::Error> for EngineError {
    fn from(error: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::from(error))
    }
}

impl EngineError {
    pub fn activation(listing_id: &ListingId, product: AddOnProduct, source: EngineError) -> Self {
        Self::Activation { listing_id: listing_id.clone(), product, source: Box::new(source) }
    }

    /// The domain error at the root of this failure, if any.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(error) => Some(error),
            Self::Repository(_) => None,
            Self::Activation { source, .. } => source.domain(),
        }
    }
}
