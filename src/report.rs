//! Human-readable scan report.
//!
//! One section per realm with signals. Sections are ordered by market
//! kind first and realm name second, so the commodity market always comes
//! after every realm regardless of its name.

use std::fmt::Write as _;

use crate::engine::fetcher::SnapshotFingerprint;
use crate::types::{ItemRecord, MarketKind, Signal};

/// Signals found on one realm during one pass.
#[derive(Debug, Clone)]
pub struct RealmReport {
    pub realm: String,
    pub kind: MarketKind,
    pub signals: Vec<Signal>,
    pub fingerprint: SnapshotFingerprint,
}

/// Stable sort by `(kind, realm)`.
pub fn sort_reports(reports: &mut [RealmReport]) {
    reports.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.realm.cmp(&b.realm)));
}

pub struct ReportFormatter;

impl ReportFormatter {
    /// Render reports in the given order.
    pub fn render(reports: &[RealmReport]) -> String {
        let mut out = String::new();
        for report in reports {
            let _ = writeln!(out, "=== {} ({}) ===", report.realm, report.signals.len());
            for signal in &report.signals {
                let _ = writeln!(out, "  {signal}");
            }
            out.push('\n');
        }
        out
    }

    /// One line per cached item record, in the order given.
    pub fn render_cache(records: &[ItemRecord]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Item cache ({}) ===", records.len());
        for record in records {
            let _ = writeln!(out, "{record}");
        }
        out
    }
}
