//! Time-driven lifecycle sweeps: which rows each sweep touches and when.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LifecycleConfig;
use crate::domain::listing::ListingStatus;

pub const LIFECYCLE_NOTIFICATION_KIND: &str = "listing_lifecycle";
pub const PRE_EXPIRY_SUBTYPE: &str = "listing_pre_expiry";
pub const PRE_DELETION_SUBTYPE: &str = "listing_pre_deletion";

/// Statuses the expire sweep moves to EXPIRED once past the published age.
pub const EXPIRABLE_STATUSES: [ListingStatus; 4] = [
    ListingStatus::Published,
    ListingStatus::PendingEditApproval,
    ListingStatus::NeedAction,
    ListingStatus::Reserved,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SweepKind {
    Expire,
    Purge,
    Finalize,
    HotDealExpiry,
    PreExpiryWarning,
    PreDeletionWarning,
}

impl SweepKind {
    pub const ALL: [SweepKind; 6] = [
        Self::Expire,
        Self::Purge,
        Self::Finalize,
        Self::HotDealExpiry,
        Self::PreExpiryWarning,
        Self::PreDeletionWarning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expire => "expire",
            Self::Purge => "purge",
            Self::Finalize => "finalize",
            Self::HotDealExpiry => "hot-deal-expiry",
            Self::PreExpiryWarning => "pre-expiry-warning",
            Self::PreDeletionWarning => "pre-deletion-warning",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "expire" => Some(Self::Expire),
            "purge" => Some(Self::Purge),
            "finalize" => Some(Self::Finalize),
            "hot-deal-expiry" => Some(Self::HotDealExpiry),
            "pre-expiry-warning" => Some(Self::PreExpiryWarning),
            "pre-deletion-warning" => Some(Self::PreDeletionWarning),
            _ => None,
        }
    }

    /// Warning sweeps only read and notify; the others mutate rows.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::PreExpiryWarning | Self::PreDeletionWarning)
    }

    pub fn notification_subtype(&self) -> Option<&'static str> {
        match self {
            Self::PreExpiryWarning => Some(PRE_EXPIRY_SUBTYPE),
            Self::PreDeletionWarning => Some(PRE_DELETION_SUBTYPE),
            _ => None,
        }
    }
}

impl std::fmt::Display for SweepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open window `(after, until]` on a lifecycle timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WarningWindow {
    pub after: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl WarningWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at > self.after && at <= self.until
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SweepPolicy {
    pub published_age: Duration,
    pub deletion_age: Duration,
    pub finalize_age: Duration,
    pub hot_deal_age: Duration,
    pub warning_lead: Duration,
}

impl SweepPolicy {
    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self {
            published_age: Duration::days(i64::from(config.published_age_days)),
            deletion_age: Duration::days(i64::from(config.deletion_age_days)),
            finalize_age: Duration::days(i64::from(config.finalize_age_days)),
            hot_deal_age: Duration::days(i64::from(config.hot_deal_days)),
            warning_lead: Duration::days(i64::from(config.warning_lead_days)),
        }
    }

    /// Rows whose reference timestamp is at or before this instant are due.
    pub fn cutoff(&self, kind: SweepKind, now: DateTime<Utc>) -> DateTime<Utc> {
        match kind {
            SweepKind::Expire => now - self.published_age,
            SweepKind::Purge => now - self.deletion_age,
            SweepKind::Finalize => now - self.finalize_age,
            SweepKind::HotDealExpiry => now - self.hot_deal_age,
            SweepKind::PreExpiryWarning => now - (self.published_age - self.warning_lead),
            SweepKind::PreDeletionWarning => now - (self.deletion_age - self.warning_lead),
        }
    }

    pub fn warning_window(&self, kind: SweepKind, now: DateTime<Utc>) -> Option<WarningWindow> {
        match kind {
            SweepKind::PreExpiryWarning => Some(WarningWindow {
                after: now - self.published_age,
                until: self.cutoff(kind, now),
            }),
            SweepKind::PreDeletionWarning => Some(WarningWindow {
                after: now - self.deletion_age,
                until: self.cutoff(kind, now),
            }),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub kind: SweepKind,
    pub affected: u64,
    pub notified: u64,
    pub failures: u64,
    pub skipped: bool,
}

impl SweepReport {
    pub fn new(kind: SweepKind) -> Self {
        Self { kind, affected: 0, notified: 0, failures: 0, skipped: false }
    }

    pub fn skipped(kind: SweepKind) -> Self {
        Self { skipped: true, ..Self::new(kind) }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{SweepKind, SweepPolicy, SweepReport};
    use crate::config::AppConfig;

    #[test]
    fn kinds_round_trip_through_cli_names() {
        for kind in SweepKind::ALL {
            assert_eq!(SweepKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SweepKind::parse("hot_deal_expiry"), Some(SweepKind::HotDealExpiry));
        assert_eq!(SweepKind::parse("vacuum"), None);
    }

    #[test]
    fn cutoffs_follow_configured_ages() {
        let policy = SweepPolicy::from_config(&AppConfig::default().lifecycle);
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 3, 0, 0).single().expect("valid date");

        assert_eq!(policy.cutoff(SweepKind::Expire, now), now - Duration::days(60));
        assert_eq!(policy.cutoff(SweepKind::Purge, now), now - Duration::days(30));
        assert_eq!(policy.cutoff(SweepKind::HotDealExpiry, now), now - Duration::days(7));
        assert_eq!(policy.cutoff(SweepKind::PreExpiryWarning, now), now - Duration::days(53));
    }

    #[test]
    fn warning_window_excludes_rows_already_due() {
        let policy = SweepPolicy::from_config(&AppConfig::default().lifecycle);
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).single().expect("valid date");
        let window = policy
            .warning_window(SweepKind::PreExpiryWarning, now)
            .expect("warning sweeps have a window");

        assert!(window.contains(now - Duration::days(55)));
        assert!(window.contains(now - Duration::days(53)));
        assert!(!window.contains(now - Duration::days(60)));
        assert!(!window.contains(now - Duration::days(10)));
        assert!(policy.warning_window(SweepKind::Purge, now).is_none());
    }

    #[test]
    fn skipped_report_has_no_counts() {
        let report = SweepReport::skipped(SweepKind::Finalize);
        assert!(report.skipped);
        assert_eq!(report.affected + report.notified + report.failures, 0);
    }
}
