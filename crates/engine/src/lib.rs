pub mod activation;
pub mod actor;
pub mod error;
pub mod ledger;
pub mod matcher;
pub mod revision;
pub mod scheduler;
pub mod service;
pub mod sinks;
pub mod sweeper;
mod trail;

pub use actor::Actor;
pub use error::EngineError;
pub use matcher::SimilarListingMatcher;
pub use scheduler::{recurring_tasks, start_scheduler, RecurringTask};
pub use service::{ListingService, NewListing};
pub use sinks::{TracingAuditSink, TracingEmailSender};
pub use sweeper::Sweeper;

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the precision the store keeps.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
