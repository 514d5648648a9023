use chrono::{DateTime, Utc};
use serde::Serialize;

use super::kind::{KindCounts, RegionKind};
use super::source::SourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// Every record inserted, nothing skipped, no orphans
    Complete,
    /// Finished, but with skipped units, failed batches or orphans
    Partial,
    /// Stopped by the cancellation signal; later batches were never sent
    Cancelled,
    /// Stopped by a fatal error (store lost, bad composition). Counts cover
    /// what was stored before the stop.
    Aborted,
}

/// A bulk insert that the store rejected. The batch is atomic, so none of its
/// records were stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub kind: RegionKind,
    pub batch: usize,
    pub first_code: String,
    pub last_code: String,
    pub size: usize,
    pub message: String,
}

/// A stored region whose parent full code resolves to nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanEntity {
    pub kind: RegionKind,
    pub full_code: String,
    pub missing_parent: String,
}

/// Outcome of one generation load. Always produced, even after partial
/// failure.
///
/// Orphans do not roll the load back: partial data stays available and the
/// `orphans` list is how callers learn about the gap.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub status: LoadStatus,
    pub inserted_by_kind: KindCounts,
    pub inserted: u64,
    pub cleared: u64,
    pub skipped: usize,
    pub source_issues: Vec<SourceError>,
    pub errors: Vec<BatchFailure>,
    pub orphans: Vec<OrphanEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl LoadReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            status: LoadStatus::Complete,
            inserted_by_kind: KindCounts::default(),
            inserted: 0,
            cleared: 0,
            skipped: 0,
            source_issues: Vec::new(),
            errors: Vec::new(),
            orphans: Vec::new(),
            fatal: None,
            started_at,
            duration_ms: 0,
        }
    }

    /// Folds the reader's skip accounting into the report
    pub fn record_source_issues(&mut self, issues: Vec<SourceError>) {
        self.skipped += issues.len();
        self.source_issues.extend(issues);
        self.refresh_status();
    }

    pub fn mark_cancelled(&mut self) {
        self.status = LoadStatus::Cancelled;
    }

    pub fn mark_aborted(&mut self, reason: impl ToString) {
        self.status = LoadStatus::Aborted;
        self.fatal = Some(reason.to_string());
    }

    pub fn is_aborted(&self) -> bool {
        self.status == LoadStatus::Aborted
    }

    /// Recomputes `status` from the counters. Cancelled and aborted loads
    /// keep their status.
    pub fn refresh_status(&mut self) {
        if matches!(self.status, LoadStatus::Cancelled | LoadStatus::Aborted) {
            return;
        }
        self.status = if self.errors.is_empty() && self.orphans.is_empty() && self.skipped == 0 {
            LoadStatus::Complete
        } else {
            LoadStatus::Partial
        };
    }

    pub fn failed_records(&self) -> usize {
        self.errors.iter().map(|e| e.size).sum()
    }
}
