pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod identifiers;
pub mod lifecycle;
pub mod ports;
pub mod similar;
pub mod sweep;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
pub use domain::addon::{AddOnProduct, OwnerBalance};
pub use domain::certification::{
    CertificationRequest, CertificationRequestId, ReviewStatus, Voucher, VoucherId,
    VoucherSnapshot, VoucherStatus,
};
pub use domain::listing::{
    FuelType, Listing, ListingChanges, ListingId, ListingStatus, ListingVersion, Pricing,
    RevisionLink, ShadowListing, VehicleAttributes,
};
pub use domain::owner::{Owner, OwnerId, OwnerKind};
pub use errors::DomainError;
pub use lifecycle::{ActorKind, DirectOperation, LifecycleEngine, LifecycleError};
pub use ports::{EmailSender, NotificationRequest, NotificationSender};
pub use sweep::{SweepKind, SweepPolicy, SweepReport};
