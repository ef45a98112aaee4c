//! Multi-realm scan orchestration.
//!
//! `scan_all` launches one task per requested realm. Each task resolves
//! the realm, fetches its listings, resolves item metadata, and evaluates
//! the bargain rules, then sends exactly one message on a shared channel:
//! its report, or `None` if it failed. The orchestrator receives one
//! message per launched task and then reaps every handle, so a scan always
//! terminates and never leaves tasks behind. A failing realm only removes
//! itself from the report.

use chrono::Duration;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::fetcher::{AuctionFetcher, SnapshotFingerprint};
use super::realms::RealmDirectory;
use super::resolver::ItemResolver;
use crate::report::{sort_reports, RealmReport};
use crate::strategy::BargainEngine;
use crate::types::{MarketKind, ScanError};

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything a realm task needs, shared by all tasks of a scan.
pub struct ScanContext {
    pub directory: RealmDirectory,
    pub fetcher: AuctionFetcher,
    pub resolver: ItemResolver,
    pub engine: BargainEngine,
    /// Maximum item metadata age. `None` accepts any cached record.
    pub max_age: Option<Duration>,
    /// Wall-clock budget for one realm task.
    pub deadline: std::time::Duration,
}

impl ScanContext {
    /// resolve → fetch → evaluate for one realm.
    async fn scan_realm(&self, name: &str) -> Result<RealmReport, ScanError> {
        let scope = self.directory.resolve(name).await?;
        let book = self.fetcher.fetch(scope).await?;
        let items = self.resolver.resolve_many(book.item_ids(), self.max_age).await;
        let signals = self.engine.evaluate(name, &book, &items);

        debug!(
            realm = name,
            listings = book.len(),
            items_resolved = items.len(),
            signals = signals.len(),
            "Realm evaluated"
        );

        Ok(RealmReport {
            realm: name.to_string(),
            kind: scope.kind(),
            signals,
            fingerprint: book.fingerprint(),
        })
    }

    /// `scan_realm` under the per-task deadline, with failures logged.
    async fn scan_realm_bounded(&self, name: &str) -> Option<RealmReport> {
        let outcome = match tokio::time::timeout(self.deadline, self.scan_realm(name)).await {
            Ok(result) => result,
            Err(_) => Err(ScanError::Deadline {
                realm: name.to_string(),
                secs: self.deadline.as_secs(),
            }),
        };

        match outcome {
            Ok(report) => Some(report),
            // The directory warns the first time a name is not found.
            Err(ScanError::RealmNotFound(realm)) => {
                debug!(realm = %realm, "Realm not found, skipping");
                None
            }
            Err(e) => {
                warn!(realm = name, error = %e, "Realm scan failed, skipping");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Result of one `scan_all` pass.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Non-empty realm reports, commodities last.
    pub reports: Vec<RealmReport>,
    pub launched: usize,
    /// Channel messages received (successful or not).
    pub completed: usize,
    /// Realms that failed or produced no signals.
    pub empty: usize,
    /// Fingerprint of the commodity snapshot, if it was scanned.
    pub commodity_fingerprint: Option<SnapshotFingerprint>,
}

/// Tracks the commodity snapshot across watch-mode passes.
#[derive(Debug, Default)]
pub struct SnapshotWatch {
    last: Option<SnapshotFingerprint>,
}

impl SnapshotWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pass and say whether its report should be printed.
    ///
    /// A pass is suppressed only when its commodity fingerprint equals the
    /// last one seen. A pass without a commodity snapshot is always printed
    /// and keeps the previous fingerprint.
    pub fn observe(&mut self, summary: &ScanSummary) -> bool {
        let Some(now) = summary.commodity_fingerprint else {
            return true;
        };
        let unchanged = self.last == Some(now);
        self.last = Some(now);
        !unchanged
    }

    pub fn last(&self) -> Option<SnapshotFingerprint> {
        self.last
    }
}

/// Fans out one task per realm and fans their results back in.
pub struct ScanOrchestrator {
    ctx: Arc<ScanContext>,
}

impl ScanOrchestrator {
    pub fn new(ctx: ScanContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn context(&self) -> &ScanContext {
        &self.ctx
    }

    /// Scan every named realm concurrently.
    pub async fn scan_all(&self, names: &[String]) -> ScanSummary {
        let launched = names.len();
        info!(realms = launched, "Starting scan");

        let (tx, mut rx) = mpsc::channel::<Option<RealmReport>>(launched.max(1));
        let mut handles = Vec::with_capacity(launched);

        for name in names {
            let tx = tx.clone();
            let ctx = Arc::clone(&self.ctx);
            let name = name.clone();
            handles.push(tokio::spawn(async move {
                let outcome = ctx.scan_realm_bounded(&name).await;
                // The receiver outlives every task; a send error means the
                // orchestrator itself is gone.
                let _ = tx.send(outcome).await;
            }));
        }
        // Only task-held senders remain, so `recv` ends if a task dies unsent.
        drop(tx);

        let mut summary = ScanSummary {
            launched,
            ..ScanSummary::default()
        };

        while summary.completed < launched {
            let Some(message) = rx.recv().await else {
                break;
            };
            summary.completed += 1;

            let Some(report) = message else {
                summary.empty += 1;
                continue;
            };

            if report.kind == MarketKind::Commodity {
                summary.commodity_fingerprint = Some(report.fingerprint);
            }
            if report.signals.is_empty() {
                debug!(realm = %report.realm, "No signals");
                summary.empty += 1;
                continue;
            }
            summary.reports.push(report);
        }

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                error!(error = %e, "Realm task panicked");
            }
        }

        if summary.completed < launched {
            warn!(
                launched,
                completed = summary.completed,
                "Some realm tasks ended without reporting"
            );
        }

        sort_reports(&mut summary.reports);

        info!(
            launched,
            completed = summary.completed,
            with_signals = summary.reports.len(),
            "Scan complete"
        );
        summary
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
