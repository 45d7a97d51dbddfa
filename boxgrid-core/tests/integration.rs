//! Integration tests for the boxgrid engine
//!
//! These tests exercise the full flow against a real database: activity
//! setup, transactional completion logging, analytics recompute, weekly
//! report generation, and pattern detection.

use boxgrid_core::analytics;
use boxgrid_core::config::AnalyticsConfig;
use boxgrid_core::db::Database;
use boxgrid_core::types::{Activity, PatternKind, UserPrefs, DEFAULT_GRID_SIZE};
use chrono::{Duration, NaiveDate};

fn test_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.migrate().unwrap();
    db
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Monday of the test week
fn monday() -> NaiveDate {
    date(2025, 3, 10)
}

fn create_activity(db: &Database, user_id: &str, name: &str) -> Activity {
    let activity = Activity::new(user_id, name);
    db.upsert_activity(&activity).unwrap();
    activity
}

// ============================================
// Logging flow
// ============================================

#[test]
fn test_full_logging_flow() {
    let db = test_db();
    db.upsert_user_prefs(&UserPrefs {
        user_id: "alice".to_string(),
        default_grid_size: 36,
    })
    .unwrap();
    let read = create_activity(&db, "alice", "Read");

    // First log of the day auto-creates the grid at the user's size
    let grid = db
        .log_activity("alice", &read.id, monday(), 0, "20 pages", DEFAULT_GRID_SIZE)
        .unwrap();
    assert_eq!(grid.grid_size, 36);
    assert_eq!(grid.dimensions(), (6, 6));
    assert_eq!(grid.occupied_cells(), 1);

    // Same activity can fill several cells the same day
    db.log_activity("alice", &read.id, monday(), 1, "", DEFAULT_GRID_SIZE)
        .unwrap();
    let grid = db.get_grid("alice", monday()).unwrap().unwrap();
    assert_eq!(grid.occupied_cells(), 2);
    assert!((grid.completion_percentage() - 100.0 * 2.0 / 36.0).abs() < 1e-9);

    let logs = db.query_logs("alice", Some(&read.id), None).unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].notes, "20 pages");
}

#[test]
fn test_overwrite_then_history_intact() {
    let db = test_db();
    let read = create_activity(&db, "alice", "Read");
    let run = create_activity(&db, "alice", "Run");

    db.log_activity("alice", &read.id, monday(), 3, "", DEFAULT_GRID_SIZE)
        .unwrap();
    db.log_activity("alice", &run.id, monday(), 3, "", DEFAULT_GRID_SIZE)
        .unwrap();

    // Grid view: last write wins
    let grid = db.get_grid("alice", monday()).unwrap().unwrap();
    assert_eq!(grid.activity_at(3), Some(run.id.as_str()));
    assert_eq!(grid.occupied_cells(), 1);

    // Log history: both rows survive, and analytics count both
    let logs = db.query_logs("alice", None, None).unwrap();
    assert_eq!(logs.len(), 2);

    let analytics =
        analytics::compute_user_analytics(&db, "alice", monday(), 30).unwrap();
    assert_eq!(analytics.total_activities_logged, 2);
    assert_eq!(analytics.total_days_tracked, 1);
}

// ============================================
// Analytics recompute
// ============================================

#[test]
fn test_user_analytics_recompute_and_overwrite() {
    let db = test_db();
    let read = create_activity(&db, "alice", "Read");

    // Three consecutive days ending Wednesday, plus an isolated log a week
    // earlier
    for offset in 0..3 {
        db.log_activity(
            "alice",
            &read.id,
            monday() + Duration::days(offset),
            0,
            "",
            DEFAULT_GRID_SIZE,
        )
        .unwrap();
    }
    db.log_activity("alice", &read.id, monday() - Duration::days(7), 0, "", DEFAULT_GRID_SIZE)
        .unwrap();

    let wednesday = monday() + Duration::days(2);
    let analytics = analytics::compute_user_analytics(&db, "alice", wednesday, 30).unwrap();
    assert_eq!(analytics.total_activities_logged, 4);
    assert_eq!(analytics.total_days_tracked, 4);
    assert_eq!(analytics.current_streak, 3);
    assert_eq!(analytics.longest_streak, 3);
    assert_eq!(analytics.last_activity_date, Some(wednesday));
    // Four 16-cell grids, one cell each
    assert!((analytics.average_completion_rate - 6.25).abs() < 1e-9);

    // Persist, then recompute after more data: wholesale overwrite
    db.upsert_user_analytics(&analytics).unwrap();
    db.log_activity(
        "alice",
        &read.id,
        monday() + Duration::days(3),
        1,
        "",
        DEFAULT_GRID_SIZE,
    )
    .unwrap();
    let thursday = monday() + Duration::days(3);
    let refreshed = analytics::compute_user_analytics(&db, "alice", thursday, 30).unwrap();
    db.upsert_user_analytics(&refreshed).unwrap();

    let stored = db.get_user_analytics("alice").unwrap().unwrap();
    assert_eq!(stored.total_activities_logged, 5);
    assert_eq!(stored.current_streak, 4);
}

#[test]
fn test_completion_rate_window() {
    let db = test_db();
    let read = create_activity(&db, "alice", "Read");

    // 15 days with one log each inside the window, one log outside it
    let today = monday();
    for offset in 0..15 {
        db.log_activity(
            "alice",
            &read.id,
            today - Duration::days(offset),
            0,
            "",
            DEFAULT_GRID_SIZE,
        )
        .unwrap();
    }
    db.log_activity("alice", &read.id, today - Duration::days(45), 0, "", DEFAULT_GRID_SIZE)
        .unwrap();

    let rate = analytics::activity_completion_rate(&db, "alice", &read.id, today, 30).unwrap();
    assert_eq!(rate, 50.0);

    // A different user sees nothing
    let rate = analytics::activity_completion_rate(&db, "bob", &read.id, today, 30).unwrap();
    assert_eq!(rate, 0.0);
}

// ============================================
// Weekly reports
// ============================================

#[test]
fn test_weekly_report_end_to_end() {
    let db = test_db();
    let config = AnalyticsConfig::default();
    let read = create_activity(&db, "alice", "Read");
    let run = create_activity(&db, "alice", "Run");

    // Read on Mon-Wed, Run on Mon only
    for offset in 0..3 {
        db.log_activity(
            "alice",
            &read.id,
            monday() + Duration::days(offset),
            offset as u32,
            "",
            DEFAULT_GRID_SIZE,
        )
        .unwrap();
    }
    db.log_activity("alice", &run.id, monday(), 5, "", DEFAULT_GRID_SIZE)
        .unwrap();

    let report = analytics::generate_weekly_report(&db, "alice", monday(), &config).unwrap();
    assert_eq!(report.week_end, monday() + Duration::days(6));
    assert_eq!(report.total_activities, 4);
    assert_eq!(report.insights.activity_diversity, 2);
    assert_eq!(report.insights.best_day.as_deref(), Some("Monday"));
    assert!((report.insights.consistency_score - 100.0 * 3.0 / 7.0).abs() < 1e-9);
    assert!(!report.streak_maintained);
    assert_eq!(report.top_activities[0].name, "Read");
    assert_eq!(report.top_activities[0].count, 3);
    assert_eq!(report.top_activities[1].name, "Run");

    // Persist, extend to a full week, regenerate: snapshot fully replaced
    db.upsert_weekly_report(&report).unwrap();
    for offset in 3..7 {
        db.log_activity(
            "alice",
            &read.id,
            monday() + Duration::days(offset),
            offset as u32,
            "",
            DEFAULT_GRID_SIZE,
        )
        .unwrap();
    }
    let report = analytics::generate_weekly_report(&db, "alice", monday(), &config).unwrap();
    db.upsert_weekly_report(&report).unwrap();

    let stored = db.get_weekly_report("alice", monday()).unwrap().unwrap();
    assert_eq!(stored.total_activities, 8);
    assert!(stored.streak_maintained);
    assert_eq!(stored.insights.consistency_score, 100.0);
}

#[test]
fn test_weekly_report_ignores_other_weeks_and_users() {
    let db = test_db();
    let config = AnalyticsConfig::default();
    let read = create_activity(&db, "alice", "Read");
    let other = create_activity(&db, "bob", "Read");

    db.log_activity("alice", &read.id, monday(), 0, "", DEFAULT_GRID_SIZE)
        .unwrap();
    db.log_activity("alice", &read.id, monday() - Duration::days(1), 0, "", DEFAULT_GRID_SIZE)
        .unwrap();
    db.log_activity("bob", &other.id, monday(), 0, "", DEFAULT_GRID_SIZE)
        .unwrap();

    let report = analytics::generate_weekly_report(&db, "alice", monday(), &config).unwrap();
    assert_eq!(report.total_activities, 1);
}

// ============================================
// Patterns
// ============================================

#[test]
fn test_pattern_detection_and_storage() {
    let db = test_db();
    let read = create_activity(&db, "alice", "Read");

    // Two Mondays and a Thursday
    db.log_activity("alice", &read.id, monday(), 0, "", DEFAULT_GRID_SIZE)
        .unwrap();
    db.log_activity("alice", &read.id, monday() + Duration::days(7), 0, "", DEFAULT_GRID_SIZE)
        .unwrap();
    db.log_activity("alice", &read.id, monday() + Duration::days(3), 0, "", DEFAULT_GRID_SIZE)
        .unwrap();

    let patterns = analytics::compute_activity_patterns(&db, "alice").unwrap();
    assert_eq!(patterns.len(), 1);
    let pattern = &patterns[0];
    assert_eq!(pattern.kind, PatternKind::DayOfWeek);
    assert_eq!(pattern.data["peak_day"], "Monday");
    assert!((pattern.confidence - 2.0 / 3.0).abs() < 1e-9);

    db.upsert_activity_pattern(pattern).unwrap();
    let stored = db
        .get_activity_pattern("alice", &read.id, PatternKind::DayOfWeek)
        .unwrap()
        .unwrap();
    assert!((stored.confidence - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(stored.data["counts"]["Monday"], 2);
}

// ============================================
// On-disk store
// ============================================

#[test]
fn test_reopen_on_disk_database() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("boxgrid.db");

    let read = {
        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        let read = create_activity(&db, "alice", "Read");
        db.log_activity("alice", &read.id, monday(), 0, "", DEFAULT_GRID_SIZE)
            .unwrap();
        read
    };

    // Reopen and verify both sides of the logging unit survived
    let db = Database::open(&path).unwrap();
    db.migrate().unwrap();
    let grid = db.get_grid("alice", monday()).unwrap().unwrap();
    assert_eq!(grid.activity_at(0), Some(read.id.as_str()));
    assert_eq!(db.query_logs("alice", None, None).unwrap().len(), 1);
}
