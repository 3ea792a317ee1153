//! Bounded deletion of aged log rows.
//!
//! The task is meant to be invoked periodically by an external scheduler.
//! Each run deletes rows older than the retention cutoff one time slice at a
//! time, oldest first, and stops early once its run-time bound is spent.
//! Every slice is its own statement, so an interrupted run loses nothing:
//! the next invocation starts again from the oldest remaining row.
//!
//! ```text
//! cutoff = now - retention
//! loop:
//!     oldest = MIN(ts) WHERE ts < cutoff      (none → done)
//!     DELETE WHERE ts < min(oldest + span, cutoff)
//!     elapsed > bound → stop, resume next run
//! ```

mod clock;
mod store;

pub use clock::{Clock, SystemClock};
pub use store::{LogStore, SqliteLogStore};

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::sql::UnsafeIdentifier;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid log table: {0}")]
    InvalidTable(UnsafeIdentifier),

    #[error("invalid timestamp column: {0}")]
    InvalidColumn(UnsafeIdentifier),

    #[error("invalid cleanup settings: {0}")]
    InvalidSettings(String),
}

pub type CleanupResult<T> = Result<T, CleanupError>;

/// How much to keep and how hard to work per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupSettings {
    /// Rows older than this many days are deleted. Zero disables the task.
    pub retention_days: u32,
    /// Width of one delete slice.
    pub batch_span: Duration,
    /// Wall-clock budget for one run.
    pub max_runtime: Duration,
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            retention_days: 30,
            batch_span: Duration::from_secs(SECONDS_PER_DAY as u64),
            max_runtime: Duration::from_secs(20 * 60),
        }
    }
}

impl CleanupSettings {
    pub fn validate(&self) -> CleanupResult<()> {
        if self.batch_span.as_secs() == 0 {
            return Err(CleanupError::InvalidSettings(
                "batch span must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CleanupReport {
    /// Delete statements issued.
    pub batches: u32,
    /// Rows removed across all batches.
    pub deleted: u64,
    /// False when the run stopped on its time bound with rows left.
    pub completed: bool,
    /// Rows with a timestamp below this were eligible. `None` when disabled.
    pub cutoff: Option<i64>,
}

/// The periodic log cleanup task.
pub struct CleanupTask<C: Clock = SystemClock> {
    settings: CleanupSettings,
    clock: C,
}

impl CleanupTask<SystemClock> {
    pub fn new(settings: CleanupSettings) -> CleanupResult<Self> {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> CleanupTask<C> {
    pub fn with_clock(settings: CleanupSettings, clock: C) -> CleanupResult<Self> {
        settings.validate()?;
        Ok(Self { settings, clock })
    }

    pub fn settings(&self) -> &CleanupSettings {
        &self.settings
    }

    /// Run once against `store`.
    ///
    /// Store errors abort the run and are returned as-is; the scheduler is
    /// expected to retry later. Batches already deleted stay deleted.
    pub fn execute(&self, store: &mut dyn LogStore) -> CleanupResult<CleanupReport> {
        if self.settings.retention_days == 0 {
            info!("log cleanup disabled (retention 0 days)");
            return Ok(CleanupReport {
                completed: true,
                ..Default::default()
            });
        }

        let started = self.clock.now();
        let cutoff = started.timestamp() - i64::from(self.settings.retention_days) * SECONDS_PER_DAY;
        let span = i64::try_from(self.settings.batch_span.as_secs()).unwrap_or(i64::MAX);
        let mut report = CleanupReport {
            cutoff: Some(cutoff),
            ..Default::default()
        };

        info!(cutoff, retention_days = self.settings.retention_days, "starting log cleanup");
        loop {
            let Some(oldest) = store.oldest_before(cutoff)? else {
                report.completed = true;
                break;
            };
            let ceiling = oldest.saturating_add(span).min(cutoff);
            let deleted = store.delete_before(ceiling)?;
            report.batches += 1;
            report.deleted += deleted as u64;
            debug!(batch = report.batches, oldest, ceiling, deleted, "deleted log slice");

            let elapsed = (self.clock.now() - started).to_std().unwrap_or_default();
            if elapsed > self.settings.max_runtime {
                info!(
                    elapsed_secs = elapsed.as_secs(),
                    "log cleanup hit its time bound, resuming next run"
                );
                break;
            }
        }

        info!(
            batches = report.batches,
            deleted = report.deleted,
            completed = report.completed,
            "log cleanup finished"
        );
        Ok(report)
    }
}
