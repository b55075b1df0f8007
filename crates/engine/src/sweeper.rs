//! Time-driven bulk lifecycle updates.
//!
//! Mutating sweeps are one guarded statement each. Warning sweeps read a
//! window and notify owners, skipping rows that were already notified.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};

use carmarket_core::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use carmarket_core::config::{AppConfig, Environment};
use carmarket_core::ports::{NotificationRequest, NotificationSender};
use carmarket_core::sweep::{SweepKind, SweepPolicy, SweepReport, LIFECYCLE_NOTIFICATION_KIND};
use carmarket_db::repositories::sweep::{self, WarningCandidate};
use carmarket_db::{DbPool, SqlNotificationStore};

use crate::sinks::TracingAuditSink;
use crate::{now, EngineError};

#[derive(Clone)]
pub struct Sweeper {
    pool: DbPool,
    environment: Environment,
    policy: SweepPolicy,
    notifier: Arc<dyn NotificationSender>,
    audit: Arc<dyn AuditSink>,
}

impl Sweeper {
    pub fn new(
        pool: DbPool,
        environment: Environment,
        policy: SweepPolicy,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self { pool, environment, policy, notifier, audit: Arc::new(TracingAuditSink) }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Sweeper backed by the SQL notification store.
    pub fn from_config(pool: DbPool, config: &AppConfig) -> Self {
        let notifier = Arc::new(SqlNotificationStore::new(pool.clone()));
        Self::new(pool, config.environment, SweepPolicy::from_config(&config.lifecycle), notifier)
    }

    pub async fn run(&self, kind: SweepKind) -> Result<SweepReport, EngineError> {
        self.run_at(kind, now()).await
    }

    pub async fn run_at(&self, kind: SweepKind, now: DateTime<Utc>) -> Result<SweepReport, EngineError> {
        if !self.environment.is_production_like() {
            info!(
                event_name = "sweep.skipped",
                sweep = %kind,
                environment = self.environment.as_str(),
                "sweeps only run in staging and production"
            );
            return Ok(SweepReport::skipped(kind));
        }

        let mut report = SweepReport::new(kind);
        if kind.is_warning() {
            self.warn_owners(kind, now, &mut report).await?;
        } else {
            let mut conn = self.pool.acquire().await?;
            let cutoff = self.policy.cutoff(kind, now);
            report.affected = match kind {
                SweepKind::Expire => sweep::expire(&mut conn, cutoff, now).await?,
                SweepKind::Purge => sweep::purge(&mut conn, cutoff, now).await?,
                SweepKind::Finalize => sweep::finalize(&mut conn, cutoff, now).await?,
                SweepKind::HotDealExpiry => sweep::expire_hot_deals(&mut conn, cutoff, now).await?,
                SweepKind::PreExpiryWarning | SweepKind::PreDeletionWarning => 0,
            };
        }

        info!(
            event_name = "sweep.completed",
            sweep = %kind,
            affected = report.affected,
            notified = report.notified,
            failures = report.failures,
            "sweep completed"
        );
        self.record(&report);
        Ok(report)
    }

    /// Runs every sweep in order. A failing sweep is logged and the rest still run.
    pub async fn run_all(&self) -> Vec<Result<SweepReport, EngineError>> {
        let now = now();
        let mut reports = Vec::with_capacity(SweepKind::ALL.len());
        for kind in SweepKind::ALL {
            let result = self.run_at(kind, now).await;
            if let Err(error) = &result {
                warn!(event_name = "sweep.failed", sweep = %kind, error = %error, "sweep failed");
            }
            reports.push(result);
        }
        reports
    }

    fn record(&self, report: &SweepReport) {
        let outcome =
            if report.failures > 0 { AuditOutcome::Failed } else { AuditOutcome::Success };
        self.audit.emit(
            AuditContext::system(uuid::Uuid::new_v4().to_string())
                .event("sweep.completed", AuditCategory::Sweep, outcome)
                .with_metadata("sweep", report.kind)
                .with_metadata("affected", report.affected)
                .with_metadata("notified", report.notified)
                .with_metadata("failures", report.failures),
        );
    }

    /// The store connection is released before notifying; the notifier may
    /// draw from the same pool.
    async fn warn_owners(
        &self,
        kind: SweepKind,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> Result<(), EngineError> {
        let (Some(window), Some(subtype)) =
            (self.policy.warning_window(kind, now), kind.notification_subtype())
        else {
            return Ok(());
        };

        let candidates = {
            let mut conn = self.pool.acquire().await?;
            sweep::warning_candidates(&mut conn, kind, window).await?
        };
        report.affected = candidates.len() as u64;

        for candidate in candidates {
            match self.notify_once(&candidate, subtype).await {
                Ok(true) => report.notified += 1,
                Ok(false) => {}
                Err(reason) => {
                    report.failures += 1;
                    warn!(
                        event_name = "sweep.notification_failed",
                        sweep = %kind,
                        listing_id = %candidate.listing_id,
                        owner_id = %candidate.owner_id,
                        error = %reason,
                        "lifecycle warning not delivered"
                    );
                }
            }
        }
        Ok(())
    }

    /// Returns `false` when the owner already has this warning for the listing.
    async fn notify_once(
        &self,
        candidate: &WarningCandidate,
        subtype: &str,
    ) -> Result<bool, carmarket_core::ports::NotificationError> {
        if self.notifier.exists(&candidate.owner_id, subtype, &candidate.listing_id).await? {
            return Ok(false);
        }

        self.notifier
            .create(NotificationRequest {
                owner_id: candidate.owner_id.clone(),
                kind: LIFECYCLE_NOTIFICATION_KIND.to_string(),
                subtype: subtype.to_string(),
                listing_id: Some(candidate.listing_id.clone()),
                payload: json!({
                    "listing_id": candidate.listing_id.0,
                    "uid": candidate.uid,
                    "reference_at": candidate.reference_at.to_rfc3339(),
                }),
            })
            .await?;
        Ok(true)
    }
}
