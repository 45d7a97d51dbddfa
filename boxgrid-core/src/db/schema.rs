//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: Initial schema
    r#"
    -- ============================================
    -- Canonical entities
    -- ============================================

    CREATE TABLE IF NOT EXISTS user_prefs (
        user_id           TEXT PRIMARY KEY,
        default_grid_size INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS activities (
        id           TEXT PRIMARY KEY,
        user_id      TEXT NOT NULL,
        name         TEXT NOT NULL,
        color        TEXT NOT NULL,
        icon         TEXT NOT NULL,
        frequency    TEXT NOT NULL,
        target_count INTEGER NOT NULL,
        is_active    INTEGER NOT NULL DEFAULT 1,
        created_at   DATETIME NOT NULL,

        UNIQUE(user_id, name)
    );

    CREATE TABLE IF NOT EXISTS daily_grids (
        user_id      TEXT NOT NULL,
        date         TEXT NOT NULL,
        grid_size    INTEGER NOT NULL,
        cells        JSON NOT NULL,
        notes        TEXT NOT NULL DEFAULT '',
        created_at   DATETIME NOT NULL,

        PRIMARY KEY (user_id, date)
    );

    CREATE TABLE IF NOT EXISTS activity_logs (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id       TEXT NOT NULL,
        activity_id   TEXT NOT NULL REFERENCES activities(id),
        date          TEXT NOT NULL,
        grid_position INTEGER NOT NULL,
        logged_at     DATETIME NOT NULL,
        notes         TEXT NOT NULL DEFAULT '',

        UNIQUE(user_id, activity_id, date, grid_position)
    );

    -- ============================================
    -- Derived entities (regenerable)
    -- ============================================

    CREATE TABLE IF NOT EXISTS user_analytics (
        user_id                 TEXT PRIMARY KEY,
        total_activities_logged INTEGER NOT NULL,
        total_days_tracked      INTEGER NOT NULL,
        current_streak          INTEGER NOT NULL,
        longest_streak          INTEGER NOT NULL,
        average_completion_rate REAL NOT NULL,
        last_activity_date      TEXT,
        computed_at             DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS weekly_reports (
        user_id           TEXT NOT NULL,
        week_start        TEXT NOT NULL,
        week_end          TEXT NOT NULL,
        total_activities  INTEGER NOT NULL,
        completion_rate   REAL NOT NULL,
        streak_maintained INTEGER NOT NULL,
        top_activities    JSON NOT NULL,
        best_day          TEXT,
        activity_diversity INTEGER NOT NULL,
        consistency_score REAL NOT NULL,
        generated_at      DATETIME NOT NULL,

        PRIMARY KEY (user_id, week_start)
    );

    CREATE TABLE IF NOT EXISTS activity_patterns (
        user_id      TEXT NOT NULL,
        activity_id  TEXT NOT NULL REFERENCES activities(id),
        kind         TEXT NOT NULL,
        data         JSON NOT NULL,
        confidence   REAL NOT NULL,
        computed_at  DATETIME NOT NULL,

        PRIMARY KEY (user_id, activity_id, kind)
    );

    -- ============================================
    -- Indexes
    -- ============================================

    CREATE INDEX IF NOT EXISTS idx_activities_user ON activities(user_id);
    CREATE INDEX IF NOT EXISTS idx_logs_user_date ON activity_logs(user_id, date);
    CREATE INDEX IF NOT EXISTS idx_logs_user_activity_date ON activity_logs(user_id, activity_id, date);
    CREATE INDEX IF NOT EXISTS idx_grids_user_date ON daily_grids(user_id, date);
    "#,
];

/// Run any pending migrations on the given connection.
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}
