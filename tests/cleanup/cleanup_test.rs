//! Log cleanup against a SQLite log table.

use std::cell::Cell;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reportsource::cleanup::{CleanupReport, CleanupSettings, CleanupTask, Clock, SqliteLogStore};
use reportsource::config::Settings;
use rusqlite::Connection;

const DAY: i64 = 86_400;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Advances by `step` seconds on every reading.
struct SteppingClock {
    at: DateTime<Utc>,
    step: i64,
    readings: Cell<i64>,
}

impl SteppingClock {
    fn new(at: DateTime<Utc>, step: i64) -> Self {
        Self {
            at,
            step,
            readings: Cell::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let n = self.readings.get();
        self.readings.set(n + 1);
        self.at + chrono::Duration::seconds(self.step * n)
    }
}

/// One row per day, 1 to 40 days old, each half a day short of its age.
fn store(settings: &Settings) -> SqliteLogStore {
    let table = settings.log_table();
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE {table} (id INTEGER PRIMARY KEY, timecreated INTEGER NOT NULL);"
    ))
    .unwrap();
    for age in 1..=40 {
        let ts = start().timestamp() - age * DAY + DAY / 2;
        conn.execute(
            &format!("INSERT INTO {table} (timecreated) VALUES (?1)"),
            [ts],
        )
        .unwrap();
    }
    SqliteLogStore::with_connection(conn, &table, &settings.cleanup.timestamp_column).unwrap()
}

#[test]
fn test_deletes_only_rows_past_retention() {
    let settings = Settings::default();
    let mut store = store(&settings);
    let task =
        CleanupTask::with_clock(settings.cleanup_settings(), SteppingClock::new(start(), 0)).unwrap();

    let report = task.execute(&mut store).unwrap();
    assert_eq!(
        report,
        CleanupReport {
            batches: 10,
            deleted: 10,
            completed: true,
            cutoff: Some(start().timestamp() - 30 * DAY),
        }
    );
    assert_eq!(store.count().unwrap(), 30);

    // Nothing left to do.
    let again = task.execute(&mut store).unwrap();
    assert_eq!(again.batches, 0);
    assert!(again.completed);
}

#[test]
fn test_time_bound_stops_and_next_run_resumes() {
    let settings = Settings::default();
    let mut store = store(&settings);

    // Each reading advances ten minutes, so a 20 minute bound allows three slices.
    let mut deleted = Vec::new();
    for run in 0..4 {
        let clock = SteppingClock::new(start() + chrono::Duration::hours(run), 600);
        let task = CleanupTask::with_clock(settings.cleanup_settings(), clock).unwrap();
        let report = task.execute(&mut store).unwrap();
        deleted.push((report.deleted, report.completed));
    }

    assert_eq!(
        deleted,
        [(3, false), (3, false), (3, false), (1, true)]
    );
    assert_eq!(store.count().unwrap(), 30);
}

#[test]
fn test_wide_span_deletes_in_one_slice() {
    let settings = Settings::default();
    let mut store = store(&settings);
    let cleanup = CleanupSettings {
        batch_span: Duration::from_secs(365 * DAY as u64),
        ..settings.cleanup_settings()
    };
    let task = CleanupTask::with_clock(cleanup, SteppingClock::new(start(), 0)).unwrap();

    let report = task.execute(&mut store).unwrap();
    assert_eq!(report.batches, 1);
    assert_eq!(report.deleted, 10);
}

#[test]
fn test_zero_retention_keeps_everything() {
    let settings = Settings::from_toml("[cleanup]\nretention_days = 0\n").unwrap();
    let mut store = store(&settings);
    let task =
        CleanupTask::with_clock(settings.cleanup_settings(), SteppingClock::new(start(), 0)).unwrap();

    let report = task.execute(&mut store).unwrap();
    assert!(report.completed);
    assert_eq!(report.cutoff, None);
    assert_eq!(store.count().unwrap(), 40);
}

#[test]
fn test_longer_retention_from_config() {
    let settings = Settings::from_toml(
        r#"
        [report]
        table_prefix = "moodle_"

        [cleanup]
        retention_days = 35
        log_table = "logstore_standard_log"
        "#,
    )
    .unwrap();
    let mut store = store(&settings);
    let task =
        CleanupTask::with_clock(settings.cleanup_settings(), SteppingClock::new(start(), 0)).unwrap();

    let report = task.execute(&mut store).unwrap();
    assert_eq!(report.deleted, 5);
    assert_eq!(store.count().unwrap(), 35);
}
